use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use survey_insights::analytics::{evaluation_analytics, proposal_analytics};
use survey_insights::cycles::NewCycle;
use survey_insights::db::PgRepository;
use survey_insights::http::{serve, AppState};
use survey_insights::import::import_bytes;
use survey_insights::models::{RecordFilter, SurveyKind};
use survey_insights::report::{build_evaluation_report, build_proposal_report};
use survey_insights::repository::{seed_default_cycles, Repository};

#[derive(Parser)]
#[command(name = "survey-insights")]
#[command(about = "Event survey importer and analytics service", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    #[arg(long, env = "SURVEY_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    cycle_id: Option<Uuid>,
    /// Evaluation survey only
    #[arg(long)]
    role: Option<String>,
    /// Evaluation survey only
    #[arg(long)]
    university: Option<String>,
    /// Proposal feedback only
    #[arg(long)]
    program: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> RecordFilter {
        RecordFilter {
            cycle_id: self.cycle_id,
            role: self.role,
            university: self.university,
            program: self.program,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Create the default event cycles
    Seed,
    /// Create an event cycle covering whole days
    AddCycle {
        #[arg(long)]
        name: String,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
    },
    /// Delete every cycle and response, then seed the default cycles
    Reset,
    /// Import a survey export (.xlsx or .csv)
    Import {
        #[arg(long, value_enum)]
        kind: SurveyKind,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the analytics payload as JSON
    Analytics {
        #[arg(long, value_enum)]
        kind: SurveyKind,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_enum)]
        kind: SurveyKind,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Serve the import and analytics API
    Serve {
        #[arg(long, env = "SURVEY_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
}

async fn scope_label(
    repo: &dyn Repository,
    filter: &RecordFilter,
) -> anyhow::Result<Option<String>> {
    let mut parts = Vec::new();
    if let Some(cycle_id) = filter.cycle_id {
        let cycles = repo.find_cycles_ordered().await?;
        let name = cycles
            .into_iter()
            .find(|c| c.id == cycle_id)
            .map(|c| c.name)
            .with_context(|| format!("no event cycle with id {cycle_id}"))?;
        parts.push(name);
    }
    parts.extend(
        [&filter.role, &filter.university, &filter.program]
            .into_iter()
            .flatten()
            .cloned(),
    );
    Ok((!parts.is_empty()).then(|| parts.join(", ")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let repo = PgRepository::connect(&cli.database_url, cli.max_connections)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            repo.init_db().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let created = seed_default_cycles(&repo).await?;
            println!("Created {created} event cycles.");
        }
        Commands::AddCycle { name, start, end } => {
            let cycle = NewCycle::from_days(&name, start, end)
                .context("the end date must not be before the start date")?;
            let created = repo.create_cycle(&cycle).await?;
            println!("Created cycle {} ({}).", created.name, created.id);
        }
        Commands::Reset => {
            repo.reset().await?;
            let created = seed_default_cycles(&repo).await?;
            println!("All survey data deleted; {created} default cycles recreated.");
        }
        Commands::Import { kind, file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let outcome = import_bytes(&repo, kind, &bytes).await?;
            println!(
                "Stored {} {} rows from {} ({} skipped).",
                outcome.inserted,
                kind.label(),
                file.display(),
                outcome.skipped
            );
        }
        Commands::Analytics { kind, filter } => {
            let filter = filter.into_filter();
            let json = match kind {
                SurveyKind::Evaluation => {
                    serde_json::to_string_pretty(&evaluation_analytics(&repo, &filter).await?)?
                }
                SurveyKind::Proposals => {
                    serde_json::to_string_pretty(&proposal_analytics(&repo, &filter).await?)?
                }
            };
            println!("{json}");
        }
        Commands::Report { kind, filter, out } => {
            let filter = filter.into_filter();
            let scope = scope_label(&repo, &filter).await?;
            let report = match kind {
                SurveyKind::Evaluation => build_evaluation_report(
                    scope.as_deref(),
                    &evaluation_analytics(&repo, &filter).await?,
                ),
                SurveyKind::Proposals => build_proposal_report(
                    scope.as_deref(),
                    &proposal_analytics(&repo, &filter).await?,
                ),
            };
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve { bind } => {
            info!("serving survey analytics on {}", bind);
            serve(AppState::new(Arc::new(repo)), bind).await?;
        }
    }

    Ok(())
}
