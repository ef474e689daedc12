//! Progress reporting to an external webhook sink.
//!
//! Every emission is best effort: sink failures are logged and swallowed,
//! never surfaced to the driver.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use jobscout_common::{KeywordOutcome, SearchJobDescriptor};

use crate::stats::{KeywordResult, RunStats};

const SINK_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_SOURCE: &str = "jobscout";

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: &str, payload: Value);
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    async fn emit(&self, event: &str, payload: Value) {
        (**self).emit(event, payload).await;
    }
}

/// POSTs `{event, timestamp, source, ...payload}` to a fixed webhook URL.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(SINK_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    async fn emit(&self, event: &str, payload: Value) {
        let mut body = json!({
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "source": EVENT_SOURCE,
        });
        if let (Some(body_map), Value::Object(extra)) = (body.as_object_mut(), payload) {
            body_map.extend(extra);
        }

        match self.client.post(&self.url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(event, "Webhook event delivered");
            }
            Ok(resp) => {
                warn!(event, status = %resp.status(), "Webhook sink rejected event");
            }
            Err(e) => {
                warn!(event, error = %e, "Failed to deliver webhook event");
            }
        }
    }
}

/// Sink used when no webhook URL is configured.
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn emit(&self, _event: &str, _payload: Value) {}
}

/// Accumulates per-descriptor outcomes and pushes periodic snapshots.
pub struct ProgressReporter {
    sink: Box<dyn EventSink>,
    run_id: Uuid,
    stats: RunStats,
    total: usize,
    processed: usize,
    report_every: usize,
}

impl ProgressReporter {
    pub fn new(sink: Box<dyn EventSink>, total: usize, report_every: usize) -> Self {
        Self {
            sink,
            run_id: Uuid::new_v4(),
            stats: RunStats::default(),
            total,
            processed: 0,
            report_every: report_every.max(1),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_stats(self) -> RunStats {
        self.stats
    }

    /// Stamp the run id onto the payload before handing it to the sink.
    async fn emit(&self, event: &str, mut payload: Value) {
        if let Some(map) = payload.as_object_mut() {
            map.insert("run_id".into(), json!(self.run_id));
        }
        self.sink.emit(event, payload).await;
    }

    pub async fn run_started(&self, location: &str) {
        self.emit(
            "run_started",
            json!({
                "total_keywords": self.total,
                "location": location,
            }),
        )
        .await;
    }

    pub async fn keyword_completed(&mut self, descriptor: &SearchJobDescriptor, outcome: &KeywordOutcome) {
        self.stats.record(KeywordResult {
            keyword: descriptor.keyword.clone(),
            listings_found: outcome.listings_found,
            saved: outcome.saved,
            skipped: outcome.skipped,
            failed: outcome.failed,
            error: None,
        });
        self.emit(
            "keyword_completed",
            json!({
                "keyword": descriptor.keyword,
                "success": true,
                "listings_found": outcome.listings_found,
                "saved": outcome.saved,
                "skipped": outcome.skipped,
                "failed": outcome.failed,
            }),
        )
        .await;
        self.advance().await;
    }

    pub async fn keyword_failed(&mut self, descriptor: &SearchJobDescriptor, error: &str) {
        self.stats.record(KeywordResult {
            keyword: descriptor.keyword.clone(),
            listings_found: 0,
            saved: 0,
            skipped: 0,
            failed: 0,
            error: Some(error.to_string()),
        });
        self.emit(
            "keyword_failed",
            json!({
                "keyword": descriptor.keyword,
                "success": false,
                "error": error,
            }),
        )
        .await;
        self.advance().await;
    }

    /// Emit a progress snapshot every `report_every` descriptors.
    async fn advance(&mut self) {
        self.processed += 1;
        if self.processed % self.report_every != 0 || self.processed == self.total {
            return;
        }
        self.emit(
            "progress",
            json!({
                "current": self.processed,
                "total": self.total,
                "percent": self.percent(),
                "total_found": self.stats.total_found,
                "total_saved": self.stats.total_saved,
                "total_skipped": self.stats.total_skipped,
            }),
        )
        .await;
    }

    pub async fn run_stopped(&self) {
        self.emit(
            "run_stopped",
            json!({
                "completed_keywords": self.processed,
                "total_keywords": self.total,
                "total_saved": self.stats.total_saved,
                "percent": self.percent(),
            }),
        )
        .await;
    }

    pub async fn run_completed(&self) {
        let top: Vec<_> = self
            .stats
            .top_keywords(5)
            .into_iter()
            .map(|r| json!({"keyword": r.keyword, "saved": r.saved}))
            .collect();
        let failed: Vec<_> = self
            .stats
            .failed_keywords()
            .into_iter()
            .map(|r| json!({"keyword": r.keyword, "error": r.error}))
            .collect();
        self.emit(
            "run_completed",
            json!({
                "keywords_processed": self.stats.keywords_processed,
                "total_found": self.stats.total_found,
                "total_saved": self.stats.total_saved,
                "total_skipped": self.stats.total_skipped,
                "total_failed": self.stats.total_failed,
                "top_keywords": top,
                "failed_keywords": failed,
            }),
        )
        .await;
    }

    pub async fn run_failed(&self, error: &str) {
        self.emit("run_failed", json!({ "error": error })).await;
    }

    fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.processed * 100 / self.total) as u32
    }
}
