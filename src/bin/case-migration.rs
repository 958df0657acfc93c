//! # Case Migration Runner
//!
//! Command-line entry point: wires configuration, authentication, the HTTP
//! backend clients, and the selected migration campaign, then runs either the
//! single-case path or the paginated sweep and prints the completion report.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};

use case_migration_core::logging::init_structured_logging;
use case_migration_core::record::LOG_STRING;
use case_migration_core::{
    AuthProvider, CaseMigrationProcessor, DateBucketPageSource, EventMetadata, HttpAuthProvider,
    HttpRecordStore, MigrationCampaign, MigrationConfig, MigrationError, PageNumberPageSource,
    PageSource, ProcessingLimit, SearchAfterPageSource,
};

#[derive(Parser)]
#[command(name = "case-migration")]
#[command(about = "Batch migration sweep over a case-management backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Case type to migrate (exactly one)
    #[arg(long)]
    case_type: String,

    /// Migrate a single case by id instead of sweeping
    #[arg(long)]
    case_id: Option<i64>,

    /// Perform every read and transform but skip the write-back
    #[arg(long)]
    dry_run: bool,

    /// Records per search page
    #[arg(long, default_value_t = 100)]
    page_size: usize,

    /// Worker pool size
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Cap on records to process (default: backend-reported total)
    #[arg(long)]
    max_records: Option<usize>,

    /// Heartbeat log interval in dispatched records
    #[arg(long, default_value_t = 100)]
    heartbeat_every: u64,

    /// Run the general-email cleanup campaign
    #[arg(long)]
    general_email_cleanup: bool,

    /// Run the legacy hand-off flag campaign
    #[arg(long)]
    legacy_handoff_flag: bool,

    /// Walk the result set by page number instead of a resume cursor
    #[arg(long)]
    paged: bool,

    /// Walk day buckets starting from this date (inclusive, YYYY-MM-DD)
    #[arg(long)]
    date_from: Option<NaiveDate>,

    /// Last day of the bucket walk (inclusive); without --date-from the
    /// first day is resolved from the oldest case in the store
    #[arg(long)]
    date_to: Option<NaiveDate>,

    /// Base URL of the case data API
    #[arg(long, env = "CASE_DATA_URL")]
    case_data_url: String,

    /// Base URL of the identity provider
    #[arg(long, env = "IDAM_URL")]
    idam_url: String,

    #[arg(long, env = "IDAM_USERNAME")]
    username: String,

    #[arg(long, env = "IDAM_PASSWORD", hide_env_values = true)]
    password: String,
}

/// How a sweep walks the result set, resolved from the pagination flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepMode {
    Cursor,
    Paged,
    DateBuckets {
        first: Option<NaiveDate>,
        last: NaiveDate,
    },
}

fn sweep_mode(
    paged: bool,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> Result<SweepMode, MigrationError> {
    if paged && (date_from.is_some() || date_to.is_some()) {
        return Err(MigrationError::Configuration(
            "--paged cannot be combined with a date range".to_string(),
        ));
    }
    match (date_from, date_to) {
        (Some(_), None) => Err(MigrationError::Configuration(
            "--date-from requires --date-to".to_string(),
        )),
        (first, Some(last)) => Ok(SweepMode::DateBuckets { first, last }),
        (None, None) if paged => Ok(SweepMode::Paged),
        (None, None) => Ok(SweepMode::Cursor),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let config = MigrationConfig {
        case_type: cli.case_type.clone(),
        case_id: cli.case_id,
        dry_run: cli.dry_run,
        page_size: cli.page_size,
        worker_count: cli.workers,
        max_records: cli.max_records,
        heartbeat_every: cli.heartbeat_every,
    };
    config.validate().context("invalid run configuration")?;

    let campaign =
        MigrationCampaign::from_flags(cli.general_email_cleanup, cli.legacy_handoff_flag)
            .context("invalid campaign selection")?;

    let mode = sweep_mode(cli.paged, cli.date_from, cli.date_to)?;

    let auth = HttpAuthProvider::new(cli.idam_url, cli.username, cli.password);
    let token = auth
        .token()
        .await
        .map_err(|e| MigrationError::Auth(e.to_string()))
        .context("could not obtain a user token")?;

    let store = Arc::new(HttpRecordStore::new(cli.case_data_url, cli.case_type));
    let processor = CaseMigrationProcessor::new(
        store.clone(),
        campaign.strategy(),
        EventMetadata::default(),
        config.worker_count,
        config.heartbeat_every,
    );

    info!("{LOG_STRING}");
    info!("Is this a dry run: {}", config.dry_run);
    info!("Migration campaign: {campaign:?}");
    info!("{LOG_STRING}");

    let started = Instant::now();

    let result = if let Some(case_id) = config.case_id {
        info!(case_id = case_id, "data migration of single case started");
        processor
            .process_single_case(&token, case_id, config.dry_run)
            .await;
        processor.aggregator().snapshot()
    } else {
        info!("data migration of cases started");
        let mut source: Box<dyn PageSource> = match mode {
            SweepMode::Cursor => {
                Box::new(SearchAfterPageSource::new(store, campaign.search_filter()))
            }
            SweepMode::Paged => {
                Box::new(PageNumberPageSource::new(store, campaign.search_filter()))
            }
            SweepMode::DateBuckets {
                first: Some(first),
                last,
            } => Box::new(DateBucketPageSource::new(store, first, last)),
            SweepMode::DateBuckets { first: None, last } => Box::new(
                DateBucketPageSource::from_oldest_case(store, &token, last)
                    .await
                    .map_err(|e| MigrationError::Search(e.to_string()))
                    .context("could not locate the oldest case")?,
            ),
        };
        let limit = ProcessingLimit::new(config.max_records, config.page_size);
        match processor
            .run(&token, source.as_mut(), &limit, config.dry_run)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "migration run failed");
                return Err(e.into());
            }
        }
    };

    result.log_report();
    let elapsed = started.elapsed();
    info!(
        "Data migration completed in: {} minutes ({} seconds).",
        elapsed.as_secs() / 60,
        elapsed.as_secs()
    );
    info!("{LOG_STRING}");
    Ok(())
}
