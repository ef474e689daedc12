use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Descriptor lifecycle ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One unit of scheduled work: a keyword's search + scrape + persist cycle.
/// Created at queue-build time and mutated in place as the driver processes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJobDescriptor {
    pub keyword: String,
    pub location: String,
    pub geo_id: String,
    pub category: String,
    pub status: JobStatus,
    pub jobs_found: u32,
    pub jobs_saved: u32,
    pub jobs_skipped: u32,
    pub jobs_failed: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SearchJobDescriptor {
    pub fn new(keyword: String, location: String, geo_id: String, category: String) -> Self {
        Self {
            keyword,
            location,
            geo_id,
            category,
            status: JobStatus::Pending,
            jobs_found: 0,
            jobs_saved: 0,
            jobs_skipped: 0,
            jobs_failed: 0,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Status only ever moves forward: pending -> processing -> {completed, failed}.
    pub fn mark_processing(&mut self, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, JobStatus::Pending);
        self.status = JobStatus::Processing;
        self.started_at = Some(now);
    }

    pub fn complete(&mut self, outcome: &KeywordOutcome, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, JobStatus::Processing);
        self.jobs_found = outcome.listings_found;
        self.jobs_saved = outcome.saved;
        self.jobs_skipped = outcome.skipped;
        self.jobs_failed = outcome.failed;
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, JobStatus::Processing);
        self.error = Some(error);
        self.status = JobStatus::Failed;
        self.completed_at = Some(now);
    }
}

// --- Scraped data ---

/// A job card extracted from one search result page. Transient: lives only
/// for the duration of one descriptor's processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    pub url: String,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub posted: Option<String>,
    pub is_remote: bool,
    pub is_easy_apply: bool,
}

/// Fields extracted from a job detail page. Every field degrades to empty
/// or None when the expected structure is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDetail {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub employment_type: Option<String>,
    pub seniority: Option<String>,
    pub salary: Option<String>,
    pub skills: Vec<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// The record handed to the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub url: String,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub source: String,
    pub search_keyword: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

/// Counts returned by one descriptor's scrape-and-store cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordOutcome {
    pub listings_found: u32,
    pub saved: u32,
    pub skipped: u32,
    pub failed: u32,
}

// --- Run lifecycle ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
            RunState::Stopped => write!(f, "stopped"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> SearchJobDescriptor {
        SearchJobDescriptor::new(
            "python".into(),
            "Jaipur".into(),
            "101716408".into(),
            "Backend".into(),
        )
    }

    #[test]
    fn descriptor_starts_pending_with_zero_counts() {
        let d = descriptor();
        assert_eq!(d.status, JobStatus::Pending);
        assert_eq!(d.jobs_found, 0);
        assert!(d.started_at.is_none());
        assert!(d.error.is_none());
    }

    #[test]
    fn descriptor_moves_forward_to_completed() {
        let mut d = descriptor();
        let now = Utc::now();
        d.mark_processing(now);
        assert_eq!(d.status, JobStatus::Processing);
        assert_eq!(d.started_at, Some(now));

        let outcome = KeywordOutcome {
            listings_found: 10,
            saved: 7,
            skipped: 2,
            failed: 1,
        };
        d.complete(&outcome, now);
        assert_eq!(d.status, JobStatus::Completed);
        assert!(d.status.is_terminal());
        assert_eq!(d.jobs_found, 10);
        assert_eq!(d.jobs_saved, 7);
        assert!(d.completed_at.is_some());
    }

    #[test]
    fn descriptor_failure_records_error() {
        let mut d = descriptor();
        let now = Utc::now();
        d.mark_processing(now);
        d.fail("connection refused".into(), now);
        assert_eq!(d.status, JobStatus::Failed);
        assert!(d.status.is_terminal());
        assert_eq!(d.error.as_deref(), Some("connection refused"));
    }
}
