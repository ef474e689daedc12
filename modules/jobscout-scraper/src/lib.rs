pub mod dedup;
pub mod driver;
pub mod fetch;
pub mod pacer;
pub mod parse;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod scheduler;
pub mod stats;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
