//! Sequential crawl driver.
//!
//! Walks the descriptor queue one keyword at a time, pacing between
//! descriptors and bounding both the single keyword and the whole run.
//! A tripped stop flag or an exhausted budget leaves the remaining
//! descriptors pending so a later run can pick them up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use jobscout_common::SearchJobDescriptor;

use crate::pacer::{Clock, RatePacer};
use crate::pipeline::KeywordProcessor;
use crate::report::ProgressReporter;

/// How a run ended. Only `Fatal` means the run is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverExit {
    Completed,
    Stopped,
    BudgetExhausted,
    Fatal(String),
}

pub struct CrawlDriver {
    processor: Arc<dyn KeywordProcessor>,
    pacer: RatePacer,
    clock: Arc<dyn Clock>,
    stop: Arc<AtomicBool>,
    keyword_timeout: Duration,
    run_budget: Duration,
}

impl CrawlDriver {
    pub fn new(
        processor: Arc<dyn KeywordProcessor>,
        clock: Arc<dyn Clock>,
        stop: Arc<AtomicBool>,
        delay_min: Duration,
        delay_max: Duration,
        keyword_timeout: Duration,
        run_budget: Duration,
    ) -> Self {
        Self {
            processor,
            pacer: RatePacer::new(delay_min, delay_max, clock.clone()),
            clock,
            stop,
            keyword_timeout,
            run_budget,
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Process the queue in order. Descriptors the run never reached keep
    /// their pending status.
    pub async fn run(
        &self,
        queue: &mut [SearchJobDescriptor],
        reporter: &mut ProgressReporter,
    ) -> DriverExit {
        let started = self.clock.now();

        for descriptor in queue.iter_mut() {
            if self.stopped() {
                info!(keyword = %descriptor.keyword, "Stop requested, ending run");
                return DriverExit::Stopped;
            }

            self.pacer.wait().await;
            if self.stopped() {
                return DriverExit::Stopped;
            }
            // Budget is checked after the pacing wait so time spent waiting
            // counts against it.
            let elapsed = self.clock.now() - started;
            if elapsed >= self.run_budget {
                warn!(
                    elapsed_secs = elapsed.as_secs(),
                    "Run budget exhausted, leaving remaining keywords pending"
                );
                return DriverExit::BudgetExhausted;
            }

            descriptor.mark_processing(Utc::now());
            info!(keyword = %descriptor.keyword, "Processing keyword");

            match tokio::time::timeout(self.keyword_timeout, self.processor.process(descriptor))
                .await
            {
                Ok(Ok(outcome)) => {
                    descriptor.complete(&outcome, Utc::now());
                    reporter.keyword_completed(descriptor, &outcome).await;
                }
                Ok(Err(e)) if e.is_fatal() => {
                    let message = e.to_string();
                    descriptor.fail(message.clone(), Utc::now());
                    reporter.keyword_failed(descriptor, &message).await;
                    error!(keyword = %descriptor.keyword, error = %message, "Fatal error, aborting run");
                    return DriverExit::Fatal(message);
                }
                Ok(Err(e)) => {
                    let message = e.to_string();
                    descriptor.fail(message.clone(), Utc::now());
                    reporter.keyword_failed(descriptor, &message).await;
                    warn!(keyword = %descriptor.keyword, error = %message, "Keyword failed");
                }
                Err(_) => {
                    let message =
                        format!("keyword timed out after {}s", self.keyword_timeout.as_secs());
                    descriptor.fail(message.clone(), Utc::now());
                    reporter.keyword_failed(descriptor, &message).await;
                    warn!(keyword = %descriptor.keyword, "Keyword timed out");
                }
            }
        }

        DriverExit::Completed
    }
}
