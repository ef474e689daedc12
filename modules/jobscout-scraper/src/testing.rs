//! Test doubles shared across unit tests. Enabled for downstream crates
//! through the `test-support` feature.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use jobscout_common::{JobRecord, JobScoutError, KeywordOutcome, SearchJobDescriptor};

use crate::fetch::PageFetcher;
use crate::pacer::Clock;
use crate::pipeline::KeywordProcessor;
use crate::report::EventSink;
use crate::store::JobStore;

/// A clock that only moves when told to. `sleep` advances time instantly
/// and records the requested duration.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().expect("clock lock") += duration;
    }

    /// Durations passed to `sleep`, in call order.
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().expect("clock lock").clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().expect("clock lock")
    }

    async fn sleep(&self, duration: Duration) {
        self.slept.lock().expect("clock lock").push(duration);
        *self.offset.lock().expect("clock lock") += duration;
    }
}

/// In-memory `JobStore` keyed by URL, mirroring the unique constraint of
/// the real table.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
    fail_inserts: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail with a storage error.
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn jobs(&self) -> Vec<JobRecord> {
        self.jobs.lock().expect("store lock").values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().expect("store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, record: &JobRecord) -> Result<(), JobScoutError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(JobScoutError::Storage("simulated insert failure".into()));
        }
        let mut jobs = self.jobs.lock().expect("store lock");
        if jobs.contains_key(&record.url) {
            return Err(JobScoutError::Conflict);
        }
        jobs.insert(record.url.clone(), record.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), JobScoutError> {
        Ok(())
    }
}

/// Serves canned HTML bodies by URL and records every request.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stub(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .expect("fetcher lock")
            .insert(url.to_string(), body.to_string());
    }

    /// Make fetches of `url` fail with a network error.
    pub fn fail(&self, url: &str) {
        self.failing.lock().expect("fetcher lock").insert(url.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("fetcher lock").clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _referer: Option<&str>) -> Result<String, JobScoutError> {
        self.requests.lock().expect("fetcher lock").push(url.to_string());
        if self.failing.lock().expect("fetcher lock").contains(url) {
            return Err(JobScoutError::Network(format!("simulated failure for {url}")));
        }
        self.pages
            .lock()
            .expect("fetcher lock")
            .get(url)
            .cloned()
            .ok_or_else(|| JobScoutError::Network(format!("no stub for {url}")))
    }
}

/// Captures emitted events for assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().expect("sink lock").clone()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: &str, payload: Value) {
        self.events
            .lock()
            .expect("sink lock")
            .push((event.to_string(), payload));
    }
}

/// Returns scripted outcomes in order, one per processed descriptor.
/// Optionally trips a stop flag after a fixed number of calls.
pub struct ScriptedProcessor {
    outcomes: Mutex<VecDeque<Result<KeywordOutcome, JobScoutError>>>,
    calls: AtomicUsize,
    stop_after: Option<(usize, std::sync::Arc<AtomicBool>)>,
}

impl ScriptedProcessor {
    pub fn new(outcomes: Vec<Result<KeywordOutcome, JobScoutError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
            stop_after: None,
        }
    }

    /// Trip `flag` once `calls` descriptors have been processed.
    pub fn stop_after(mut self, calls: usize, flag: std::sync::Arc<AtomicBool>) -> Self {
        self.stop_after = Some((calls, flag));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeywordProcessor for ScriptedProcessor {
    async fn process(
        &self,
        _descriptor: &SearchJobDescriptor,
    ) -> Result<KeywordOutcome, JobScoutError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, flag)) = &self.stop_after {
            if call >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }
        self.outcomes
            .lock()
            .expect("processor lock")
            .pop_front()
            .unwrap_or(Ok(KeywordOutcome::default()))
    }
}
