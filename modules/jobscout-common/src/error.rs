use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobScoutError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// The persistence layer rejected a record because it already exists.
    /// Counted as a skip, never as a failure.
    #[error("duplicate record")]
    Conflict,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("setup error: {0}")]
    Setup(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl JobScoutError {
    /// Whether this error should abort the whole run rather than
    /// a single descriptor.
    pub fn is_fatal(&self) -> bool {
        matches!(self, JobScoutError::Setup(_))
    }
}
