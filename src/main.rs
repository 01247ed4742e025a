//! ENTSO-E energy data service entry point.
//!
//! `serve` runs the collection pipeline under the scheduler; the remaining
//! subcommands are thin wrappers over the backfill and coverage operations.
//!
//! ```sh
//! # Run with default config (~/.config/entsoe-data-service/config.toml)
//! entsoe-data-service serve
//!
//! # Validate configuration without starting
//! entsoe-data-service check
//!
//! # Coverage analysis and backfill management
//! entsoe-data-service coverage --areas DE,FR --years-back 2
//! entsoe-data-service backfill start DE actual_load 2023-01-01 2023-12-31
//! entsoe-data-service backfill resume 42
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use entsoe_data::application::services::{
    BackfillService, EntsoeDataService, MonitoringService, SchedulerService,
};
use entsoe_data::config::{default_config_path, AppConfig};
use entsoe_data::domain::area::AreaCode;
use entsoe_data::domain::repositories::RepositoryProvider;
use entsoe_data::infrastructure::database::migrator::Migrator;
use entsoe_data::infrastructure::{
    init_database, DatabaseConfig, EntsoeHttpCollector, SeaOrmRepositoryProvider,
};
use entsoe_data::shared::clock::SystemClock;
use entsoe_data::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};

/// ENTSO-E energy data collection service.
#[derive(Parser, Debug)]
#[command(
    name = "entsoe-data-service",
    version,
    about = "Mirrors ENTSO-E load, forecast and price data into TimescaleDB"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "ENTSOE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collection service (default).
    Serve,
    /// Validate the configuration file and exit.
    Check,
    /// Analyze historical data coverage.
    Coverage {
        /// Comma-separated area codes (default: DE,FR,NL).
        #[arg(long, value_delimiter = ',')]
        areas: Option<Vec<String>>,
        /// Comma-separated endpoint names (default: all).
        #[arg(long, value_delimiter = ',')]
        endpoints: Option<Vec<String>>,
        /// Years to look back (default: from config).
        #[arg(long)]
        years_back: Option<u32>,
    },
    /// Manage historical backfill operations.
    Backfill {
        #[command(subcommand)]
        action: BackfillAction,
    },
}

#[derive(Subcommand, Debug)]
enum BackfillAction {
    /// Start a new backfill for an area/endpoint over a period.
    Start {
        area: String,
        endpoint: String,
        /// Period start (YYYY-MM-DD or RFC 3339).
        period_start: String,
        /// Period end (YYYY-MM-DD or RFC 3339).
        period_end: String,
        /// Override chunk size in days.
        #[arg(long)]
        chunk_days: Option<i64>,
    },
    /// Resume an interrupted backfill.
    Resume { id: i32 },
    /// Show the status of a backfill.
    Status { id: i32 },
    /// List active backfills.
    List,
    /// Cancel an active backfill at its next chunk boundary.
    Cancel { id: i32 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!(
                "Failed to load config from {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            cfg
        }
    };

    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Check => {
            println!("Configuration is valid");
            println!("  Config file : {}", config_path.display());
            println!("  Database    : {}", config.database.connection_url());
            println!("  API URL     : {}", config.collector.api_url);
            println!("  Areas       : {}", config.collector.areas.join(", "));
            println!("  Scheduler   : {}", if config.scheduler.enabled { "enabled" } else { "disabled" });
            Ok(())
        }
        Command::Coverage {
            areas,
            endpoints,
            years_back,
        } => {
            let ctx = ServiceContext::connect(&config).await?;
            let results = ctx
                .backfill
                .analyze_coverage(areas, endpoints, years_back)
                .await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            ctx.close().await
        }
        Command::Backfill { action } => {
            let ctx = ServiceContext::connect(&config).await?;
            match action {
                BackfillAction::Start {
                    area,
                    endpoint,
                    period_start,
                    period_end,
                    chunk_days,
                } => {
                    let result = ctx
                        .backfill
                        .start_backfill(
                            &area,
                            &endpoint,
                            parse_timestamp(&period_start)?,
                            parse_timestamp(&period_end)?,
                            chunk_days,
                        )
                        .await?;
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                BackfillAction::Resume { id } => {
                    let result = ctx.backfill.resume_backfill(id).await?;
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                BackfillAction::Status { id } => {
                    let status = ctx.backfill.get_backfill_status(id).await?;
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                BackfillAction::List => {
                    let active = ctx.backfill.list_active_backfills().await?;
                    println!("{}", serde_json::to_string_pretty(&active)?);
                }
                BackfillAction::Cancel { id } => {
                    let status = ctx.backfill.cancel_backfill(id).await?;
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
            }
            ctx.close().await
        }
    }
}

/// Database-connected services for the one-shot CLI commands.
struct ServiceContext {
    db: sea_orm::DatabaseConnection,
    backfill: Arc<BackfillService>,
}

impl ServiceContext {
    async fn connect(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = init_database(&DatabaseConfig {
            url: config.database.connection_url(),
        })
        .await?;
        Migrator::up(&db, None).await?;

        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let collector = Arc::new(EntsoeHttpCollector::new(&config.collector)?);
        let clock = Arc::new(SystemClock);

        let backfill = Arc::new(BackfillService::new(
            collector,
            repos,
            clock,
            config.backfill.clone(),
        ));

        Ok(Self { db, backfill })
    }

    async fn close(self) -> Result<(), Box<dyn std::error::Error>> {
        self.db.close().await?;
        Ok(())
    }
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting ENTSO-E energy data service...");

    // ── Prometheus exporter (before any metrics calls) ─────────
    if config.metrics.exporter_enabled {
        let listen_address: std::net::SocketAddr = config.metrics.listen_address.parse()?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(listen_address)
            .install()?;
        info!("Prometheus metrics exporter listening on {listen_address}");
    }

    // ── Database ───────────────────────────────────────────────
    let db = init_database(&DatabaseConfig {
        url: config.database.connection_url(),
    })
    .await?;

    info!("Running database migrations...");
    Migrator::up(&db, None).await?;
    info!("Migrations completed");

    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
    let collector = Arc::new(EntsoeHttpCollector::new(&config.collector)?);
    let clock = Arc::new(SystemClock);

    let areas: Vec<AreaCode> = config
        .collector
        .areas
        .iter()
        .filter_map(|name| {
            let area = AreaCode::from_country_code(name);
            if area.is_none() {
                warn!(area = %name, "Unknown area in configuration, skipping");
            }
            area
        })
        .collect();

    // ── Services ───────────────────────────────────────────────
    let collection = Arc::new(EntsoeDataService::new(
        collector.clone(),
        repos.clone(),
        clock.clone(),
        areas,
    ));
    let backfill = Arc::new(BackfillService::new(
        collector,
        repos.clone(),
        clock.clone(),
        config.backfill.clone(),
    ));
    let monitoring = Arc::new(MonitoringService::new(
        repos.clone(),
        clock.clone(),
        config.monitoring.clone(),
    ));
    let scheduler = Arc::new(SchedulerService::new(
        collection,
        backfill,
        monitoring,
        db.clone(),
        repos,
        config.scheduler.clone(),
        clock,
    ));

    let start_result = scheduler.start().await?;
    if !start_result.success {
        warn!("{}", start_result.message);
        db.close().await?;
        return Ok(());
    }

    // ── Wait for shutdown ──────────────────────────────────────
    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));
    info!("Service started. Press Ctrl+C to shut down gracefully.");
    shutdown.wait().await;

    info!("Stopping scheduler...");
    scheduler.stop().await?;

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    }

    info!("ENTSO-E energy data service shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Accept `YYYY-MM-DD` (UTC midnight) or a full RFC 3339 timestamp.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Ok(date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("unrecognized timestamp {raw:?}: {e}"))
}
