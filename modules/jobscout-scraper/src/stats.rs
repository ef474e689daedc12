use serde::Serialize;

/// Per-keyword result kept for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordResult {
    pub keyword: String,
    pub listings_found: u32,
    pub saved: u32,
    pub skipped: u32,
    pub failed: u32,
    pub error: Option<String>,
}

/// Rolling totals for one run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub keywords_processed: u32,
    pub keywords_failed: u32,
    pub total_found: u32,
    pub total_saved: u32,
    pub total_skipped: u32,
    pub total_failed: u32,
    pub results: Vec<KeywordResult>,
}

impl RunStats {
    pub fn record(&mut self, result: KeywordResult) {
        self.keywords_processed += 1;
        if result.error.is_some() {
            self.keywords_failed += 1;
        }
        self.total_found += result.listings_found;
        self.total_saved += result.saved;
        self.total_skipped += result.skipped;
        self.total_failed += result.failed;
        self.results.push(result);
    }

    /// The most productive keywords by saved count, descending.
    pub fn top_keywords(&self, n: usize) -> Vec<&KeywordResult> {
        let mut productive: Vec<&KeywordResult> =
            self.results.iter().filter(|r| r.saved > 0).collect();
        productive.sort_by(|a, b| b.saved.cmp(&a.saved));
        productive.truncate(n);
        productive
    }

    pub fn failed_keywords(&self) -> Vec<&KeywordResult> {
        self.results.iter().filter(|r| r.error.is_some()).collect()
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Scrape Run Complete ===")?;
        writeln!(f, "Keywords processed: {}", self.keywords_processed)?;
        writeln!(f, "Keywords failed:    {}", self.keywords_failed)?;
        writeln!(f, "Listings found:     {}", self.total_found)?;
        writeln!(f, "Jobs saved:         {}", self.total_saved)?;
        writeln!(f, "Jobs skipped:       {}", self.total_skipped)?;
        writeln!(f, "Jobs failed:        {}", self.total_failed)?;

        let top = self.top_keywords(5);
        if !top.is_empty() {
            writeln!(f, "\nTop keywords:")?;
            for r in top {
                writeln!(f, "  {}: {} saved", r.keyword, r.saved)?;
            }
        }

        let failed = self.failed_keywords();
        if !failed.is_empty() {
            writeln!(f, "\nFailed keywords:")?;
            for r in failed {
                writeln!(
                    f,
                    "  {}: {}",
                    r.keyword,
                    r.error.as_deref().unwrap_or("unknown error")
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(keyword: &str, found: u32, saved: u32, skipped: u32) -> KeywordResult {
        KeywordResult {
            keyword: keyword.into(),
            listings_found: found,
            saved,
            skipped,
            failed: 0,
            error: None,
        }
    }

    #[test]
    fn totals_accumulate_across_keywords() {
        let mut stats = RunStats::default();
        stats.record(result("python", 5, 3, 2));
        // All react listings were duplicates.
        stats.record(result("react", 4, 0, 4));

        assert_eq!(stats.keywords_processed, 2);
        assert_eq!(stats.total_saved, 3);
        assert_eq!(stats.total_skipped, 6);
        assert_eq!(stats.total_found, 9);
        assert_eq!(stats.keywords_failed, 0);
    }

    #[test]
    fn top_keywords_sorted_by_saved_and_exclude_unproductive() {
        let mut stats = RunStats::default();
        stats.record(result("python", 10, 2, 0));
        stats.record(result("react", 10, 0, 10));
        stats.record(result("java", 10, 7, 0));

        let top = stats.top_keywords(5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].keyword, "java");
        assert_eq!(top[1].keyword, "python");
    }

    #[test]
    fn failed_keywords_carry_error_text() {
        let mut stats = RunStats::default();
        stats.record(KeywordResult {
            keyword: "devops".into(),
            listings_found: 0,
            saved: 0,
            skipped: 0,
            failed: 0,
            error: Some("network error: timed out".into()),
        });

        assert_eq!(stats.keywords_failed, 1);
        let failed = stats.failed_keywords();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error.as_deref().unwrap().contains("timed out"));
    }
}
