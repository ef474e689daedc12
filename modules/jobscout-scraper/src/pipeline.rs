//! Per-keyword scrape pipeline: fetch the search page, parse cards, drop
//! already-seen URLs, pull details for the rest and persist in small
//! batches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use jobscout_common::{
    JobDetail, JobListing, JobRecord, JobScoutError, KeywordOutcome, SearchJobDescriptor,
};

use crate::dedup::DedupCache;
use crate::fetch::PageFetcher;
use crate::pacer::{Clock, RatePacer};
use crate::parse::{parse_job_detail, parse_search_page};
use crate::queue::search_url;
use crate::store::JobStore;

const SOURCE: &str = "linkedin";
/// Gap between consecutive detail-page fetches within one keyword.
const DETAIL_GAP_MIN: Duration = Duration::from_secs(1);
const DETAIL_GAP_MAX: Duration = Duration::from_secs(3);

#[async_trait]
pub trait KeywordProcessor: Send + Sync {
    async fn process(
        &self,
        descriptor: &SearchJobDescriptor,
    ) -> Result<KeywordOutcome, JobScoutError>;
}

pub struct ScrapePipeline {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn JobStore>,
    cache: Arc<DedupCache>,
    detail_pacer: RatePacer,
    max_jobs_per_keyword: usize,
    persist_batch_size: usize,
}

impl ScrapePipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn JobStore>,
        cache: Arc<DedupCache>,
        clock: Arc<dyn Clock>,
        max_jobs_per_keyword: usize,
        persist_batch_size: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            cache,
            detail_pacer: RatePacer::new(DETAIL_GAP_MIN, DETAIL_GAP_MAX, clock),
            max_jobs_per_keyword: max_jobs_per_keyword.max(1),
            persist_batch_size: persist_batch_size.max(1),
        }
    }

    /// Fetch the detail page for one listing. A failed or unparseable
    /// detail page degrades to an empty detail; the listing is still saved.
    async fn detail_for(&self, listing: &JobListing, referer: &str) -> JobDetail {
        self.detail_pacer.wait().await;
        match self.fetcher.fetch(&listing.url, Some(referer)).await {
            Ok(html) => parse_job_detail(&html, Utc::now()),
            Err(e) => {
                warn!(url = %listing.url, error = %e, "Detail fetch failed, saving listing fields only");
                JobDetail::default()
            }
        }
    }

    fn build_record(&self, descriptor: &SearchJobDescriptor, listing: &JobListing, detail: JobDetail) -> JobRecord {
        let mut tags: Vec<String> = detail.skills;
        if let Some(employment_type) = detail.employment_type {
            tags.push(employment_type);
        }
        if let Some(seniority) = detail.seniority {
            tags.push(seniority);
        }
        if listing.is_remote {
            tags.push("remote".to_string());
        }
        if listing.is_easy_apply {
            tags.push("easy apply".to_string());
        }

        JobRecord {
            url: listing.url.clone(),
            job_id: listing.job_id.clone(),
            title: non_empty(detail.title, &listing.title),
            company: non_empty(detail.company, &listing.company),
            location: non_empty(detail.location, &listing.location),
            description: detail.description,
            category: descriptor.category.clone(),
            tags,
            source: SOURCE.to_string(),
            search_keyword: descriptor.keyword.clone(),
            posted_at: detail.posted_at,
            scraped_at: Utc::now(),
        }
    }

    /// Persist one batch concurrently. The cache is re-checked under
    /// `mark` right before each insert since a parallel record in the same
    /// run may have claimed the URL.
    async fn persist_batch(&self, batch: Vec<JobRecord>, outcome: &mut KeywordOutcome) {
        let inserts = batch.into_iter().map(|record| {
            let store = self.store.clone();
            let cache = self.cache.clone();
            async move {
                if !cache.mark(&record.url) {
                    return PersistResult::Skipped;
                }
                match store.insert(&record).await {
                    Ok(()) => PersistResult::Saved,
                    Err(JobScoutError::Conflict) => PersistResult::Skipped,
                    Err(e) => {
                        warn!(url = %record.url, error = %e, "Failed to save job");
                        PersistResult::Failed
                    }
                }
            }
        });

        for result in join_all(inserts).await {
            match result {
                PersistResult::Saved => outcome.saved += 1,
                PersistResult::Skipped => outcome.skipped += 1,
                PersistResult::Failed => outcome.failed += 1,
            }
        }
    }
}

enum PersistResult {
    Saved,
    Skipped,
    Failed,
}

#[async_trait]
impl KeywordProcessor for ScrapePipeline {
    async fn process(
        &self,
        descriptor: &SearchJobDescriptor,
    ) -> Result<KeywordOutcome, JobScoutError> {
        let url = search_url(descriptor);
        let html = self.fetcher.fetch(&url, None).await?;
        let listings = parse_search_page(&html);

        let mut outcome = KeywordOutcome {
            listings_found: listings.len() as u32,
            ..KeywordOutcome::default()
        };
        info!(
            keyword = %descriptor.keyword,
            listings = listings.len(),
            "Parsed search results"
        );

        let mut fresh = Vec::new();
        for listing in listings {
            if self.cache.seen(&listing.url) {
                outcome.skipped += 1;
            } else {
                fresh.push(listing);
            }
        }
        if fresh.len() > self.max_jobs_per_keyword {
            debug!(
                keyword = %descriptor.keyword,
                dropped = fresh.len() - self.max_jobs_per_keyword,
                "Capping listings for keyword"
            );
            fresh.truncate(self.max_jobs_per_keyword);
        }

        let mut records = Vec::with_capacity(fresh.len());
        for listing in &fresh {
            let detail = self.detail_for(listing, &url).await;
            records.push(self.build_record(descriptor, listing, detail));
        }

        for batch in records.chunks(self.persist_batch_size) {
            self.persist_batch(batch.to_vec(), &mut outcome).await;
        }

        Ok(outcome)
    }
}

fn non_empty(preferred: String, fallback: &str) -> String {
    if preferred.trim().is_empty() {
        fallback.to_string()
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFetcher, ManualClock, MemoryJobStore};

    fn descriptor() -> SearchJobDescriptor {
        SearchJobDescriptor::new(
            "python".into(),
            "Jaipur".into(),
            "101716408".into(),
            "Backend".into(),
        )
    }

    fn search_page(job_ids: &[u64]) -> String {
        let cards: String = job_ids
            .iter()
            .map(|id| {
                format!(
                    r#"<li><div class="base-card">
                         <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/role-{id}">link</a>
                         <h3 class="base-search-card__title">Role {id}</h3>
                         <h4 class="base-search-card__subtitle"><a>Acme</a></h4>
                         <span class="job-search-card__location">Jaipur</span>
                       </div></li>"#
                )
            })
            .collect();
        format!(r#"<html><body><ul class="jobs-search__results-list">{cards}</ul></body></html>"#)
    }

    const DETAIL_PAGE: &str = r#"
    <html><body>
      <h1 class="top-card-layout__title">Senior Python Developer</h1>
      <a class="topcard__org-name-link">Acme Corp</a>
      <div class="show-more-less-html__markup">Django and FastAPI services.</div>
    </body></html>
    "#;

    struct Harness {
        fetcher: Arc<FakeFetcher>,
        store: Arc<MemoryJobStore>,
        cache: Arc<DedupCache>,
        pipeline: ScrapePipeline,
    }

    fn harness(max_jobs: usize, batch_size: usize) -> Harness {
        let fetcher = Arc::new(FakeFetcher::new());
        let store = Arc::new(MemoryJobStore::new());
        let cache = Arc::new(DedupCache::default());
        let pipeline = ScrapePipeline::new(
            fetcher.clone(),
            store.clone(),
            cache.clone(),
            Arc::new(ManualClock::new()),
            max_jobs,
            batch_size,
        );
        Harness { fetcher, store, cache, pipeline }
    }

    fn listing_url(id: u64) -> String {
        format!("https://www.linkedin.com/jobs/view/role-{id}")
    }

    #[tokio::test]
    async fn saves_every_fresh_listing() {
        let h = harness(30, 5);
        let desc = descriptor();
        h.fetcher.stub(&search_url(&desc), &search_page(&[101, 102]));
        h.fetcher.stub(&listing_url(101), DETAIL_PAGE);
        h.fetcher.stub(&listing_url(102), DETAIL_PAGE);

        let outcome = h.pipeline.process(&desc).await.expect("outcome");
        assert_eq!(outcome.listings_found, 2);
        assert_eq!(outcome.saved, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.failed, 0);
        assert_eq!(h.store.len(), 2);

        let saved = h.store.jobs();
        let record = saved.iter().find(|r| r.job_id == "101").expect("record");
        assert_eq!(record.title, "Senior Python Developer");
        assert_eq!(record.category, "Backend");
        assert_eq!(record.search_keyword, "python");
        assert!(record.description.contains("FastAPI"));
    }

    #[tokio::test]
    async fn already_seen_urls_are_skipped_without_detail_fetch() {
        let h = harness(30, 5);
        let desc = descriptor();
        h.fetcher.stub(&search_url(&desc), &search_page(&[101, 102]));
        h.fetcher.stub(&listing_url(102), DETAIL_PAGE);
        h.cache.mark(&listing_url(101));

        let outcome = h.pipeline.process(&desc).await.expect("outcome");
        assert_eq!(outcome.saved, 1);
        assert_eq!(outcome.skipped, 1);
        // The duplicate's detail page was never requested.
        assert!(!h.fetcher.requests().contains(&listing_url(101)));
    }

    #[tokio::test]
    async fn failed_detail_fetch_still_saves_listing_fields() {
        let h = harness(30, 5);
        let desc = descriptor();
        h.fetcher.stub(&search_url(&desc), &search_page(&[101]));
        h.fetcher.fail(&listing_url(101));

        let outcome = h.pipeline.process(&desc).await.expect("outcome");
        assert_eq!(outcome.saved, 1);
        assert_eq!(outcome.failed, 0);

        let record = &h.store.jobs()[0];
        assert_eq!(record.title, "Role 101");
        assert_eq!(record.company, "Acme");
        assert!(record.description.is_empty());
    }

    #[tokio::test]
    async fn search_fetch_failure_fails_the_keyword() {
        let h = harness(30, 5);
        let desc = descriptor();
        h.fetcher.fail(&search_url(&desc));

        let err = h.pipeline.process(&desc).await.expect_err("error");
        assert!(matches!(err, JobScoutError::Network(_)));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn listings_beyond_the_cap_are_dropped() {
        let h = harness(2, 5);
        let desc = descriptor();
        h.fetcher.stub(&search_url(&desc), &search_page(&[1, 2, 3, 4]));
        for id in [1, 2] {
            h.fetcher.stub(&listing_url(id), DETAIL_PAGE);
        }

        let outcome = h.pipeline.process(&desc).await.expect("outcome");
        assert_eq!(outcome.listings_found, 4);
        assert_eq!(outcome.saved, 2);
        assert_eq!(h.store.len(), 2);
    }

    #[tokio::test]
    async fn store_conflict_counts_as_skipped() {
        let h = harness(30, 5);
        let desc = descriptor();
        h.fetcher.stub(&search_url(&desc), &search_page(&[101]));
        h.fetcher.stub(&listing_url(101), DETAIL_PAGE);

        // Same URL already persisted by an earlier run; the in-memory
        // cache is empty so the store constraint is the backstop.
        let first = h.pipeline.process(&desc).await.expect("outcome");
        assert_eq!(first.saved, 1);
        h.cache.clear();

        let second = h.pipeline.process(&desc).await.expect("outcome");
        assert_eq!(second.saved, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn storage_errors_count_as_failed() {
        let h = harness(30, 5);
        let desc = descriptor();
        h.fetcher.stub(&search_url(&desc), &search_page(&[101]));
        h.fetcher.stub(&listing_url(101), DETAIL_PAGE);
        h.store.fail_inserts();

        let outcome = h.pipeline.process(&desc).await.expect("outcome");
        assert_eq!(outcome.saved, 0);
        assert_eq!(outcome.failed, 1);
    }
}
