use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hazard_core::arbiter::Arbiter;
use hazard_core::config::EngineConfig;
use hazard_core::db::SqliteReportStore;
use hazard_core::engine::HazardEngine;
use hazard_core::hazards::HazardType;
use hazard_core::refresh;
use hazard_core::remote::HttpAnalyzer;
use hazard_core::schema::{Coordinates, ReportSubmission};
use schemars::schema_for;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linewatch")]
#[command(about = "Power-line hazard report scoring and heatmap CLI", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report store path, overrides the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export canonical JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Score a new report and store it
    Submit(ReportArgs),
    /// Show the local score and its audit explanation without storing
    Score(ReportArgs),
    /// Score a stored report again against the current active set
    Rescore { id: String },
    /// Mark a pending report verified
    Verify { id: String },
    /// Mark a pending report rejected
    Reject { id: String },
    /// Heatmap points for the active report set
    Heatmap,
    /// Grid clusters of active reports
    Hotspots,
    /// Dashboard counters for the active report set
    Summary,
    /// Recompute the dashboard periodically until interrupted
    Watch,
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,
    /// Hazard type, e.g. line_break or power_surge
    #[arg(long = "type")]
    hazard_type: HazardType,
    #[arg(long)]
    severity: u8,
    #[arg(long)]
    description: String,
    #[arg(long)]
    location: String,
    #[arg(long)]
    reporter: Option<String>,
}

impl ReportArgs {
    fn into_submission(self) -> ReportSubmission {
        ReportSubmission {
            coordinates: Coordinates {
                lat: self.lat,
                lng: self.lng,
            },
            hazard_type: self.hazard_type,
            severity: self.severity,
            description: self.description,
            location_name: self.location,
            reporter_id: self.reporter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Schema { command } = &cli.command {
        return match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        };
    }

    let engine = build_engine(cli.config.as_deref(), cli.db)?;
    let now = OffsetDateTime::now_utc();

    match cli.command {
        Commands::Schema { .. } => Ok(()),
        Commands::Submit(args) => print_json(&engine.submit(args.into_submission(), now).await?),
        Commands::Score(args) => print_json(&engine.explain(args.into_submission(), now).await?),
        Commands::Rescore { id } => print_json(&engine.rescore(&id, now).await?),
        Commands::Verify { id } => print_json(&engine.verify(&id).await?),
        Commands::Reject { id } => print_json(&engine.reject(&id).await?),
        Commands::Heatmap => print_json(&engine.heatmap(now).await?),
        Commands::Hotspots => print_json(&engine.hotspots(now).await?),
        Commands::Summary => print_json(&engine.summary(now).await?),
        Commands::Watch => watch(engine).await,
    }
}

fn build_engine(config_path: Option<&Path>, db: Option<PathBuf>) -> Result<HazardEngine<SqliteReportStore>> {
    let mut config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(db) = db {
        config.store.path = db;
    }

    let store = Arc::new(
        SqliteReportStore::open(&config.store.path)
            .with_context(|| format!("opening report store {}", config.store.path.display()))?,
    );

    let arbiter = match &config.remote.base_url {
        Some(base_url) => {
            let analyzer = HttpAnalyzer::new(base_url.clone(), config.remote.timeout())?;
            Arbiter::new(Arc::new(analyzer), config.remote.timeout(), config.scoring.clone())
        }
        None => Arbiter::fallback_only(config.scoring.clone()),
    };

    Ok(HazardEngine::new(store, Arc::new(arbiter), config))
}

async fn watch(engine: HazardEngine<SqliteReportStore>) -> Result<()> {
    let interval = engine.config().refresh.interval();
    info!("Refreshing dashboard every {:?}", interval);
    let handle = refresh::spawn(Arc::new(engine), interval);
    let mut frames = handle.subscribe();

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(frame) = frames.borrow_and_update().as_ref() {
                    println!(
                        "{} active={} points={} hotspots={} analyzer={}",
                        frame.computed_at,
                        frame.active_reports,
                        frame.heatmap.points.len(),
                        frame.hotspots.len(),
                        if frame.analyzer_reachable { "up" } else { "down" },
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop().await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn schema_export(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    // Submission input
    let submission_schema = schema_for!(hazard_core::schema::ReportSubmission);
    fs::write(
        out_dir.join("ReportSubmission.schema.json"),
        serde_json::to_string_pretty(&submission_schema)?,
    )?;

    // Scored report handed to the dashboard
    let scored_schema = schema_for!(hazard_core::schema::ScoredReport);
    fs::write(
        out_dir.join("ScoredReport.schema.json"),
        serde_json::to_string_pretty(&scored_schema)?,
    )?;

    let heatmap_schema = schema_for!(hazard_core::heatmap::Heatmap);
    fs::write(
        out_dir.join("Heatmap.schema.json"),
        serde_json::to_string_pretty(&heatmap_schema)?,
    )?;

    let audit_schema = schema_for!(hazard_core::scoring::ScoreResult);
    fs::write(
        out_dir.join("ScoreResult.schema.json"),
        serde_json::to_string_pretty(&audit_schema)?,
    )?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
