use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_satisfaction::catalog::{available_periods, parse_period_label};
use clinic_satisfaction::config::{ConnectionMode, DashboardConfig};
use clinic_satisfaction::dashboard::{build_view, DashboardQuery};
use clinic_satisfaction::db::{self, PostgresSource};
use clinic_satisfaction::filter::{available_receptions, parse_reception_label};
use clinic_satisfaction::locale::Locale;
use clinic_satisfaction::models::{EvaluationRecord, PeriodSelector, YearMonth};
use clinic_satisfaction::report;
use clinic_satisfaction::source::{
    file_source, load_records, CachedSource, HttpJsonSource, TableSource,
};

#[derive(Parser)]
#[command(name = "satisfaction-report")]
#[command(about = "Patient satisfaction metrics for clinic reception desks", long_about = None)]
struct Cli {
    /// Dashboard configuration file
    #[arg(long, global = true, env = "SATISFACTION_CONFIG", default_value = "dashboard.toml")]
    config: PathBuf,
    /// Read evaluations from a CSV or JSON file instead of a configured branch
    #[arg(long, global = true)]
    file: Option<PathBuf>,
    /// The CSV input has no header row
    #[arg(long, global = true)]
    no_headers: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Selection {
    #[arg(long)]
    branch: Option<String>,
    /// Period label (`Março/2024`, `Atual`, `Todos`) or `all`, `current`, `YYYY-MM`
    #[arg(long)]
    period: Option<String>,
    #[arg(long)]
    reception: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample evaluations for a branch
    Seed {
        #[arg(long)]
        branch: Option<String>,
    },
    /// Import evaluations from a CSV file into the database
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Print headline metrics
    Summary {
        #[command(flatten)]
        selection: Selection,
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// List selectable periods
    Periods {
        #[arg(long)]
        branch: Option<String>,
    },
    /// List reception desks
    Receptions {
        #[arg(long)]
        branch: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Number of latest evaluations to list
        #[arg(long, default_value_t = 20)]
        latest: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic_satisfaction=info,satisfaction_report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed { branch } => {
            let key = branch_key(&config, branch.as_deref())?;
            let inserted = db::seed(&connect().await?, &key).await?;
            println!("Inserted {inserted} sample evaluations for {key}.");
        }
        Commands::Import { csv, branch } => {
            let key = branch_key(&config, branch.as_deref())?;
            let inserted = db::import_csv(&connect().await?, &key, csv, !cli.no_headers).await?;
            println!("Inserted {inserted} evaluations from {}.", csv.display());
        }
        Commands::Summary { selection, json } => {
            let (branch, records) = load(&cli, &config, selection.branch.as_deref()).await?;
            let Some(records) = records else {
                return Ok(());
            };
            let query = build_query(selection, config.locale, None)?;
            let view = build_view(&records, &query, config.locale, YearMonth::now());

            if *json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }

            let snapshot = &view.snapshot;
            println!("{branch}: {}", view.period_description);
            println!(
                "- Net Promoter Score {} ({}) across {} evaluations",
                snapshot.nps.round() as i64,
                view.category_label,
                snapshot.evaluation_count
            );
            println!(
                "- Promoters {:.1}%, neutrals {:.1}%, detractors {:.1}%",
                snapshot.promoters_pct, snapshot.neutral_pct, snapshot.detractors_pct
            );
            println!(
                "- Service average {:.1} / 10 ({} ratings)",
                snapshot.service_mean, snapshot.service_count
            );
            println!(
                "- Recommendation average {:.1} / 10 ({} ratings)",
                snapshot.recommendation_mean, snapshot.recommendation_count
            );
            println!("- {}", view.recommendation_headline);
        }
        Commands::Periods { branch } => {
            let (_, records) = load(&cli, &config, branch.as_deref()).await?;
            let records = records.unwrap_or_default();
            for label in available_periods(&records, config.locale) {
                println!("{label}");
            }
        }
        Commands::Receptions { branch } => {
            let (_, records) = load(&cli, &config, branch.as_deref()).await?;
            let records = records.unwrap_or_default();
            for label in available_receptions(&records, config.locale) {
                println!("{label}");
            }
        }
        Commands::Report {
            selection,
            out,
            latest,
        } => {
            let (branch, records) = load(&cli, &config, selection.branch.as_deref()).await?;
            let Some(records) = records else {
                return Ok(());
            };
            let query = build_query(selection, config.locale, Some(*latest))?;
            let view = build_view(&records, &query, config.locale, YearMonth::now());
            std::fs::write(out, report::build_report(&branch, &view))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<DashboardConfig> {
    let optional = cli.file.is_some()
        || matches!(
            cli.command,
            Commands::InitDb | Commands::Seed { .. } | Commands::Import { .. }
        );
    if optional && !cli.config.exists() {
        return Ok(DashboardConfig::default());
    }
    DashboardConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to use the database source")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Database key for a branch: its configured source, or the name itself
/// when no branches are configured.
fn branch_key(config: &DashboardConfig, branch: Option<&str>) -> anyhow::Result<String> {
    if config.branches.is_empty() {
        return branch
            .map(str::to_string)
            .context("--branch is required when no branches are configured");
    }
    Ok(config.branch(branch)?.source.clone())
}

async fn open_source(
    cli: &Cli,
    config: &DashboardConfig,
    branch: Option<&str>,
) -> anyhow::Result<(String, Box<dyn TableSource>)> {
    if let Some(path) = &cli.file {
        return Ok((path.display().to_string(), file_source(path, !cli.no_headers)));
    }

    let branch = config.branch(branch)?;
    let source: Box<dyn TableSource> = match config.mode {
        ConnectionMode::File => file_source(Path::new(&branch.source), !cli.no_headers),
        ConnectionMode::Http => Box::new(HttpJsonSource::new(branch.source.as_str())?),
        ConnectionMode::Database => {
            Box::new(PostgresSource::new(connect().await?, branch.source.as_str()))
        }
    };

    Ok((
        branch.name.clone(),
        Box::new(CachedSource::new(source, config.cache_ttl())),
    ))
}

/// Loads a branch. `None` means there was nothing to show; the reason has
/// already been printed.
async fn load(
    cli: &Cli,
    config: &DashboardConfig,
    branch: Option<&str>,
) -> anyhow::Result<(String, Option<Vec<EvaluationRecord>>)> {
    let (name, source) = open_source(cli, config, branch).await?;
    info!(branch = %name, source = %source.describe(), "loading evaluations");

    let outcome = load_records(&source).await;
    if let Some(warning) = &outcome.warning {
        eprintln!("Warning: {warning}");
    }
    if outcome.records.is_empty() {
        println!("No evaluations found.");
        return Ok((name, None));
    }
    Ok((name, Some(outcome.records)))
}

fn build_query(
    selection: &Selection,
    locale: Locale,
    latest_limit: Option<usize>,
) -> anyhow::Result<DashboardQuery> {
    let period = match selection.period.as_deref() {
        None => PeriodSelector::Current,
        Some(value) => match parse_period_label(value, locale) {
            Some(selector) => selector,
            None => value.parse()?,
        },
    };
    let reception = selection
        .reception
        .as_deref()
        .map(|label| parse_reception_label(label, locale))
        .unwrap_or_default();

    Ok(DashboardQuery {
        period,
        reception,
        latest_limit,
    })
}
