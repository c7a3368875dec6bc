use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use client::{Credentials, DeployApi, DeployConfig, HttpDeployClient, UDM_ENVIRONMENT};
use depsync::{Orchestrator, ReconcileOptions, Reconciler};

#[derive(Parser)]
#[command(name = "depsync")]
#[command(about = "Reconcile deployed applications across environments and drive deployments")]
struct Cli {
    /// Server base URL
    #[arg(long, env = "DEPSYNC_URL", default_value = "http://localhost:4516")]
    url: String,

    /// Basic-auth username
    #[arg(long, env = "DEPSYNC_USERNAME")]
    username: String,

    /// Basic-auth password
    #[arg(long, env = "DEPSYNC_PASSWORD", hide_env_values = true)]
    password: String,

    /// Per-call timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Skip TLS certificate validation
    #[arg(long)]
    insecure: bool,

    /// Page size for repository queries
    #[arg(long, default_value = "1000")]
    page_size: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match deployed applications between two environment trees
    Reconcile {
        /// Ancestor of the source environments
        #[arg(long)]
        old: String,
        /// Ancestor of the candidate environments
        #[arg(long)]
        new: String,
        /// Minimum similarity score for a match (0.0 to 1.0)
        #[arg(long, default_value = "0.8")]
        threshold: f64,
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,
    },
    /// Deploy an application version to an environment for the first time
    Deploy {
        /// Application version ref (e.g. Applications/app1/1.0)
        #[arg(long)]
        version: String,
        /// Target environment ref
        #[arg(long)]
        environment: String,
    },
    /// Update an existing deployed application to a new version
    Update {
        /// Application version ref
        #[arg(long)]
        version: String,
        /// Environment holding the deployed application
        #[arg(long)]
        environment: String,
    },
    /// List environments under an ancestor
    Environments {
        #[arg(long)]
        ancestor: String,
        /// Optional name pattern filter
        #[arg(long)]
        name_pattern: Option<String>,
    },
    /// Check whether a repository entry exists
    Exists { reference: String },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Comma-joined report rows
    #[default]
    Csv,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = DeployConfig::new()
        .with_base_url(cli.url)
        .with_credentials(Credentials::new(cli.username, cli.password))
        .with_timeout(Duration::from_secs(cli.timeout_secs))
        .with_verify_tls(!cli.insecure)
        .with_page_size(cli.page_size);
    let client = HttpDeployClient::new(config)?;

    match cli.command {
        Commands::Reconcile {
            old,
            new,
            threshold,
            output,
            format,
        } => {
            let options = ReconcileOptions {
                threshold,
                page_size: cli.page_size,
            };
            let report = Reconciler::new(&client, options).reconcile(&old, &new).await?;

            let text = match format {
                OutputFormat::Csv => report.to_csv(),
                OutputFormat::Json => serde_json::to_string_pretty(&report.rows)?,
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    info!("Report written to {}", path.display());
                }
                None => println!("{}", text),
            }
        }
        Commands::Deploy {
            version,
            environment,
        } => {
            let mut orchestrator = Orchestrator::new();
            let summary = orchestrator
                .run_initial(&client, &version, &environment)
                .await?;
            println!(
                "Deployed {} to {} (task {})",
                version, environment, summary.task_id
            );
        }
        Commands::Update {
            version,
            environment,
        } => {
            let mut orchestrator = Orchestrator::new();
            let summary = orchestrator
                .run_update(&client, &version, &environment)
                .await?;
            println!("Updated {} (task {})", environment, summary.task_id);
        }
        Commands::Environments {
            ancestor,
            name_pattern,
        } => {
            let refs = client
                .query_children(
                    &ancestor,
                    UDM_ENVIRONMENT,
                    name_pattern.as_deref(),
                    cli.page_size,
                )
                .await?;
            for reference in refs {
                println!("{}", reference);
            }
        }
        Commands::Exists { reference } => {
            let present = client.exists(&reference).await?;
            println!("{}", present);
        }
    }

    Ok(())
}
