use thiserror::Error;

/// Run-level errors for the migration tool.
///
/// Record-level and page-level faults never surface here: a failed case update
/// lands in the failed-id set and a failed page fetch ends the sweep early.
/// Only problems that strike before the sweep produces any outcome — bad
/// configuration, authentication, a failed startup search — abort a run, plus
/// a worker pool that could not be drained.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Interrupted: {0}")]
    Interrupted(String),
}

pub type Result<T> = std::result::Result<T, MigrationError>;
