use crate::error::{MigrationError, Result};

/// Run parameters for a migration sweep.
///
/// Built by the runner binary from CLI flags, or from the environment via
/// [`MigrationConfig::from_env`]. Validation is fatal and happens before any
/// fetching begins.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub case_type: String,
    pub case_id: Option<i64>,
    pub dry_run: bool,
    pub page_size: usize,
    pub worker_count: usize,
    pub max_records: Option<usize>,
    pub heartbeat_every: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            case_type: String::new(),
            case_id: None,
            dry_run: false,
            page_size: 100,
            worker_count: 4,
            max_records: None,
            heartbeat_every: 100,
        }
    }
}

impl MigrationConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(case_type) = std::env::var("CASE_MIGRATION_CASE_TYPE") {
            config.case_type = case_type;
        }

        if let Ok(case_id) = std::env::var("CASE_MIGRATION_CASE_ID") {
            config.case_id = Some(case_id.parse().map_err(|e| {
                MigrationError::Configuration(format!("Invalid case_id: {e}"))
            })?);
        }

        if let Ok(dry_run) = std::env::var("CASE_MIGRATION_DRY_RUN") {
            config.dry_run = dry_run.parse().map_err(|e| {
                MigrationError::Configuration(format!("Invalid dry_run: {e}"))
            })?;
        }

        if let Ok(page_size) = std::env::var("CASE_MIGRATION_PAGE_SIZE") {
            config.page_size = page_size.parse().map_err(|e| {
                MigrationError::Configuration(format!("Invalid page_size: {e}"))
            })?;
        }

        if let Ok(workers) = std::env::var("CASE_MIGRATION_WORKERS") {
            config.worker_count = workers.parse().map_err(|e| {
                MigrationError::Configuration(format!("Invalid worker_count: {e}"))
            })?;
        }

        if let Ok(max_records) = std::env::var("CASE_MIGRATION_MAX_RECORDS") {
            config.max_records = Some(max_records.parse().map_err(|e| {
                MigrationError::Configuration(format!("Invalid max_records: {e}"))
            })?);
        }

        if let Ok(heartbeat) = std::env::var("CASE_MIGRATION_HEARTBEAT_EVERY") {
            config.heartbeat_every = heartbeat.parse().map_err(|e| {
                MigrationError::Configuration(format!("Invalid heartbeat_every: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Reject configurations that must never reach the backend.
    pub fn validate(&self) -> Result<()> {
        if self.case_type.trim().is_empty() {
            return Err(MigrationError::Configuration(
                "Provide a case type for the migration".to_string(),
            ));
        }
        if self.case_type.contains(',') {
            return Err(MigrationError::Configuration(
                "Only one case type at a time is allowed for the migration".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(MigrationError::Configuration(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(MigrationError::Configuration(
                "worker_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
