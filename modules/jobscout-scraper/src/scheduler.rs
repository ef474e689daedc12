//! Run lifecycle. One `Scheduler` owns the stop flag and the run state
//! machine; each run gets a fresh queue, dedup cache and reporter.
//!
//! States move idle -> running -> {completed, stopped, failed}, and a new
//! run may start from any non-running state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{error, info};

use jobscout_common::{Config, JobScoutError, RunState};

use crate::dedup::DedupCache;
use crate::driver::{CrawlDriver, DriverExit};
use crate::fetch::PageFetcher;
use crate::pacer::Clock;
use crate::pipeline::ScrapePipeline;
use crate::queue::{QueueBuilder, EXPERIENCE_LEVELS, TECH_KEYWORDS};
use crate::report::{EventSink, ProgressReporter};
use crate::stats::RunStats;
use crate::store::JobStore;

pub struct Scheduler {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn JobStore>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    stop: Arc<AtomicBool>,
    state: Mutex<RunState>,
}

impl Scheduler {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn JobStore>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            fetcher,
            store,
            sink,
            clock,
            stop: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().expect("state lock")
    }

    /// Request that the current run end after the in-flight keyword.
    /// Starting a new run resets the flag.
    pub fn stop(&self) {
        info!("Stop requested");
        self.stop.store(true, Ordering::SeqCst);
    }

    fn try_begin(&self) -> Result<(), JobScoutError> {
        let mut state = self.state.lock().expect("state lock");
        if *state == RunState::Running {
            return Err(JobScoutError::Setup("a run is already in progress".into()));
        }
        *state = RunState::Running;
        Ok(())
    }

    fn finish(&self, state: RunState) {
        *self.state.lock().expect("state lock") = state;
    }

    fn build_queue(&self) -> Vec<jobscout_common::SearchJobDescriptor> {
        let mut builder =
            QueueBuilder::new(TECH_KEYWORDS, &self.config.location, &self.config.geo_id);
        if self.config.expand_experience_levels {
            builder = builder.with_experience_levels(EXPERIENCE_LEVELS);
        }
        let mut queue = builder.build();
        if let Some(max) = self.config.max_keywords {
            queue.truncate(max);
        }
        queue
    }

    /// Execute one full scrape run.
    pub async fn run_once(&self) -> Result<RunStats, JobScoutError> {
        self.try_begin()?;
        self.stop.store(false, Ordering::SeqCst);

        let mut queue = self.build_queue();
        let mut reporter =
            ProgressReporter::new(Box::new(self.sink.clone()), queue.len(), self.config.report_every);

        // Fatal setup failures are still reported through the sink.
        if let Err(e) = self.store.ping().await {
            reporter.run_failed(&e.to_string()).await;
            self.finish(RunState::Failed);
            error!(error = %e, "Store unreachable at run start");
            return Err(e);
        }

        info!(keywords = queue.len(), location = %self.config.location, "Starting scrape run");

        let cache = Arc::new(DedupCache::default());
        let pipeline = Arc::new(ScrapePipeline::new(
            self.fetcher.clone(),
            self.store.clone(),
            cache,
            self.clock.clone(),
            self.config.max_jobs_per_keyword,
            self.config.persist_batch_size,
        ));
        let driver = CrawlDriver::new(
            pipeline,
            self.clock.clone(),
            self.stop.clone(),
            Duration::from_secs(self.config.delay_min_secs),
            Duration::from_secs(self.config.delay_max_secs),
            Duration::from_secs(self.config.keyword_timeout_secs),
            Duration::from_secs(self.config.run_budget_secs),
        );

        reporter.run_started(&self.config.location).await;

        let exit = driver.run(&mut queue, &mut reporter).await;
        match exit {
            DriverExit::Completed => {
                reporter.run_completed().await;
                self.finish(RunState::Completed);
            }
            DriverExit::Stopped | DriverExit::BudgetExhausted => {
                reporter.run_stopped().await;
                self.finish(RunState::Stopped);
            }
            DriverExit::Fatal(message) => {
                reporter.run_failed(&message).await;
                self.finish(RunState::Failed);
                error!(error = %message, "Run failed");
                return Err(JobScoutError::Setup(message));
            }
        }

        let stats = reporter.into_stats();
        info!("{stats}");
        Ok(stats)
    }

    /// Run on a fixed interval until stopped. Individual run failures are
    /// logged and the loop keeps going.
    pub async fn run_forever(&self) {
        let interval = Duration::from_secs(self.config.interval_hours * 3600);
        loop {
            match self.run_once().await {
                Ok(stats) => {
                    info!(saved = stats.total_saved, "Run finished");
                }
                Err(e) => {
                    error!(error = %e, "Run failed");
                }
            }
            if self.state() == RunState::Stopped {
                info!("Scheduler stopped");
                return;
            }
            info!(next_run_hours = self.config.interval_hours, "Sleeping until next run");
            self.clock.sleep(interval).await;
            if self.stop.load(Ordering::SeqCst) {
                info!("Scheduler stopped");
                return;
            }
        }
    }
}
