// src/cli.rs
use crate::core::{ConfigManager, Database};
use crate::pipeline::PipelineOrchestrator;
use crate::store::{RequestStore, SqliteRequestStore};
use crate::types::RequestStatus;
use crate::utils::validate_linkedin_jobs_url;
use crate::web::start_web_server;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "LinkedIn job search enrichment pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API (default)
    Serve,
    /// Run one scrape in the foreground and print the final request as JSON
    Run {
        url: String,
        /// Resume text file stored with the request
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// Print a stored request as JSON
    Status { id: String },
    /// List stored requests, newest first unless filtered by status
    List {
        #[arg(long)]
        status: Option<RequestStatus>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

async fn open_store(config: &ConfigManager) -> Result<Arc<SqliteRequestStore>> {
    let database = Database::new(&config.environment.database_path).await?;
    Ok(Arc::new(SqliteRequestStore::new(&database)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = ConfigManager::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            config.ensure_directories().await?;
            start_web_server(config).await
        }

        Command::Run { url, resume } => {
            validate_linkedin_jobs_url(&url)?;
            let resume_text = match resume {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read resume: {}", path.display()))?,
                ),
                None => None,
            };

            let store = open_store(&config).await?;
            let orchestrator = PipelineOrchestrator::from_config(&config, store.clone())?;
            let request = store.create(&url, resume_text).await?;
            let id = request.id.clone();
            info!("Running scrape request {} for {}", id, url);

            let finished = tokio::select! {
                finished = orchestrator.run(request) => finished?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, cancelling {}", id);
                    orchestrator.cancel(&id).await?;
                    store
                        .get(&id)
                        .await?
                        .with_context(|| format!("Scrape request not found: {}", id))?
                }
            };
            print_json(&finished)
        }

        Command::Status { id } => {
            let store = open_store(&config).await?;
            match store.get(&id).await? {
                Some(request) => print_json(&request),
                None => anyhow::bail!("Scrape request not found: {}", id),
            }
        }

        Command::List { status, limit } => {
            let store = open_store(&config).await?;
            let requests = match status {
                Some(status) => store
                    .list_by_status(status)
                    .await?
                    .into_iter()
                    .take(limit)
                    .collect(),
                None => store.list_recent(limit).await?,
            };
            for request in requests {
                println!(
                    "{}  {:<10}  {}  {}",
                    request.id,
                    request.status,
                    request.created_at.format("%Y-%m-%d %H:%M:%S"),
                    request.source_url
                );
            }
            Ok(())
        }
    }
}
