use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Progress webhook sink (optional; events are skipped when unset)
    pub webhook_url: Option<String>,

    // Search target
    pub location: String,
    pub geo_id: String,

    // Queue shaping
    pub expand_experience_levels: bool,
    pub max_keywords: Option<usize>,

    // Per-descriptor limits
    pub max_jobs_per_keyword: usize,
    pub keyword_timeout_secs: u64,

    // Persist fan-out
    pub persist_batch_size: usize,

    // Inter-descriptor delay window (jittered)
    pub delay_min_secs: u64,
    pub delay_max_secs: u64,

    // Whole-run wall-clock budget
    pub run_budget_secs: u64,

    // Progress webhook cadence (every N descriptors)
    pub report_every: usize,

    // Daemon mode interval between runs
    pub interval_hours: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            webhook_url: env::var("WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            location: env::var("SEARCH_LOCATION").unwrap_or_else(|_| "Jaipur".to_string()),
            geo_id: env::var("SEARCH_GEO_ID").unwrap_or_else(|_| "101716408".to_string()),
            expand_experience_levels: env_flag("EXPAND_EXPERIENCE_LEVELS", false),
            max_keywords: env::var("MAX_KEYWORDS").ok().map(|v| parse_num(&v, "MAX_KEYWORDS")),
            max_jobs_per_keyword: env_num("MAX_JOBS_PER_KEYWORD", 30),
            keyword_timeout_secs: env_num("KEYWORD_TIMEOUT_SECS", 180),
            persist_batch_size: env_num("PERSIST_BATCH_SIZE", 5),
            delay_min_secs: env_num("DELAY_MIN_SECS", 10),
            delay_max_secs: env_num("DELAY_MAX_SECS", 20),
            run_budget_secs: env_num("RUN_BUDGET_SECS", 240),
            report_every: env_num("REPORT_EVERY", 5),
            interval_hours: env_num("RUN_INTERVAL_HOURS", 6),
        }
    }

    /// Log the configuration without leaking the database credentials.
    pub fn log_redacted(&self) {
        tracing::info!(
            location = self.location.as_str(),
            geo_id = self.geo_id.as_str(),
            webhook = self.webhook_url.is_some(),
            max_jobs_per_keyword = self.max_jobs_per_keyword,
            persist_batch_size = self.persist_batch_size,
            delay_window = format!("{}-{}s", self.delay_min_secs, self.delay_max_secs),
            run_budget_secs = self.run_budget_secs,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_num<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => parse_num(&v, key),
        Err(_) => default,
    }
}

fn parse_num<T: std::str::FromStr>(value: &str, key: &str) -> T {
    value
        .parse()
        .unwrap_or_else(|_| panic!("{key} must be a number"))
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}
