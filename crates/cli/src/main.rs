//! filequeue CLI - durable, resumable file distribution queue
//!
//! Exit codes: 0 on success, 1 on any surfaced error.

mod config;
mod logging;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::info;

use filequeue_core::application::worker::constants::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_ATTEMPTS,
    DEFAULT_RETRY_MAX_BACKOFF,
};
use filequeue_core::application::{
    shutdown_channel, AddFileRequest, Distributor, QueueService, QueueStore, RetryConfig,
};
use filequeue_core::domain::{DomainError, FileQueue, QueueConfig, RemoveCriterion, DEFAULT_MAX_SIZE};
use filequeue_core::port::id_provider::UuidProvider;
use filequeue_core::port::time_provider::SystemTimeProvider;
use filequeue_infra_fs::{CopyTransfer, LocalFileSystem};
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "filequeue")]
#[command(about = "Durable, resumable file distribution queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Queue state file
    #[arg(long, global = true, env = "FILEQUEUE_STATE", default_value = config::DEFAULT_STATE_PATH)]
    state: String,

    /// Console log format
    #[arg(long, global = true, env = "FILEQUEUE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true, env = "FILEQUEUE_LOG_FILE")]
    log_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty queue state file
    Init {
        /// Queue name
        #[arg(short, long)]
        name: String,

        /// Capacity (-1 = unbounded)
        #[arg(long, default_value_t = DEFAULT_MAX_SIZE, allow_hyphen_values = true)]
        max_size: i64,

        /// Session ID (random if omitted)
        #[arg(long)]
        session: Option<String>,

        /// Replace an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Queue one or more files
    Add {
        /// Source files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Destination directory (each file keeps its name)
        #[arg(short, long)]
        target_dir: Option<PathBuf>,

        /// Queue files even if they do not exist yet
        #[arg(long)]
        no_validate: bool,

        /// Metadata as key=value (repeatable)
        #[arg(long = "meta")]
        meta: Vec<String>,
    },

    /// List queued items in processing order
    List,

    /// Show queue counters
    Status,

    /// Remove items from the queue
    #[command(group(ArgGroup::new("criterion").required(true).args(["path", "session", "all"])))]
    Remove {
        /// Exact source path
        #[arg(long)]
        path: Option<PathBuf>,

        /// Session ID
        #[arg(long)]
        session: Option<String>,

        /// Everything
        #[arg(long)]
        all: bool,
    },

    /// Transfer queued files (Ctrl+C stops processing and saves what is left)
    Process {
        /// Destination for items without a target path
        #[arg(short, long)]
        dest_dir: Option<PathBuf>,

        /// Initial backoff in seconds
        #[arg(long, default_value_t = DEFAULT_RETRY_BASE_DELAY.as_secs())]
        base_delay_secs: u64,

        /// Attempts per file (0 = unlimited)
        #[arg(long, default_value_t = DEFAULT_RETRY_MAX_ATTEMPTS)]
        max_attempts: u32,

        /// Backoff cap in seconds
        #[arg(long, default_value_t = DEFAULT_RETRY_MAX_BACKOFF.as_secs())]
        max_backoff_secs: u64,

        /// Save state after this many items (0 = only at the end)
        #[arg(long, default_value_t = DEFAULT_CHECKPOINT_EVERY)]
        checkpoint_every: usize,
    },
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    index: usize,
    source: String,
    target: String,
    size: String,
    attempts: u32,
    queued_at: String,
    session: String,
}

#[derive(Tabled)]
struct FailureRow {
    source: String,
    attempts: u32,
    error: String,
}

/// Wired dependencies (Composition Root)
struct App {
    fs: Arc<LocalFileSystem>,
    service: QueueService,
    store: Arc<QueueStore>,
    state_path: PathBuf,
}

impl App {
    fn new(state_path: PathBuf) -> Self {
        let fs = Arc::new(LocalFileSystem::new());
        let time_provider = Arc::new(SystemTimeProvider);
        let id_provider = Arc::new(UuidProvider);

        let service = QueueService::new(fs.clone(), id_provider.clone(), time_provider.clone());
        let store = Arc::new(QueueStore::new(fs.clone(), time_provider, id_provider));

        Self {
            fs,
            service,
            store,
            state_path,
        }
    }

    async fn load(&self) -> Result<FileQueue> {
        match self.store.restore(&self.state_path).await? {
            Some(queue) => Ok(queue),
            None => bail!(
                "No queue at {}; run `filequeue init` first",
                self.state_path.display()
            ),
        }
    }

    async fn save(&self, queue: &FileQueue) -> Result<()> {
        self.store
            .save(queue, Some(&self.state_path), true)
            .await
            .context("Failed to save queue state")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = cli.log_file.as_deref().map(config::expand_path);
    let _log_guard = match logging::init(cli.log_format, log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::new(config::expand_path(&cli.state));
    info!(state = %app.state_path.display(), "filequeue v{}", filequeue_core::VERSION);

    match cli.command {
        Commands::Init {
            name,
            max_size,
            session,
            force,
        } => {
            let config = QueueConfig::new(name)
                .with_max_size(max_size)
                .with_state_path(&app.state_path);
            let queue = app.service.create(config, session)?;
            app.store
                .save(&queue, None, force)
                .await
                .context("Failed to write new queue (use --force to replace)")?;

            println!("{}", "✓ Queue created".green().bold());
            print_status(&queue, &app.state_path);
        }

        Commands::Add {
            paths,
            target_dir,
            no_validate,
            meta,
        } => {
            let metadata = config::parse_metadata(&meta)?;
            let mut queue = app.load().await?;
            let mut added = 0usize;
            let mut rejected = 0usize;

            for path in &paths {
                let mut req = AddFileRequest::new(path).with_metadata(metadata.clone());
                if let (Some(dir), Some(name)) = (&target_dir, path.file_name()) {
                    req = req.with_target(dir.join(name));
                }
                if no_validate {
                    req = req.without_validation();
                }

                match app.service.add_file(&mut queue, req).await {
                    Ok(()) => added += 1,
                    Err(e @ DomainError::QueueFull { .. }) => {
                        println!("  {} {}", "✗".red(), e);
                        rejected += paths.len() - added - rejected;
                        break;
                    }
                    Err(e) => {
                        println!("  {} {}", "✗".red(), e);
                        rejected += 1;
                    }
                }
            }

            app.save(&queue).await?;
            println!(
                "{} {} file(s) queued, {} pending",
                "✓".green(),
                added,
                queue.len()
            );
            if rejected > 0 {
                bail!("{} file(s) not queued", rejected);
            }
        }

        Commands::List => {
            let queue = app.load().await?;
            if queue.is_empty() {
                println!("{}", "Queue is empty".yellow());
                return Ok(());
            }

            let rows: Vec<ItemRow> = queue
                .iter()
                .enumerate()
                .map(|(i, item)| ItemRow {
                    index: i + 1,
                    source: item.source_path().display().to_string(),
                    target: item
                        .target_path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    size: item
                        .size_bytes
                        .map(|b| b.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                    attempts: item.attempts(),
                    queued_at: item.queued_at_utc.format("%Y-%m-%d %H:%M:%S").to_string(),
                    session: item.session_id.chars().take(8).collect(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }

        Commands::Status => {
            let queue = app.load().await?;
            print_status(&queue, &app.state_path);
        }

        Commands::Remove { path, session, all } => {
            let mut queue = app.load().await?;
            let criterion = match (&path, &session, all) {
                (Some(path), _, _) => RemoveCriterion::SourcePath(path),
                (_, Some(session), _) => RemoveCriterion::Session(session),
                _ => RemoveCriterion::All,
            };

            let removed = queue.remove_items(criterion);
            app.save(&queue).await?;
            println!(
                "{} {} item(s) removed, {} pending",
                "✓".green(),
                removed,
                queue.len()
            );
        }

        Commands::Process {
            dest_dir,
            base_delay_secs,
            max_attempts,
            max_backoff_secs,
            checkpoint_every,
        } => {
            let mut queue = app.load().await?;
            queue.set_state_path(&app.state_path);

            let retry = RetryConfig {
                base_delay: Duration::from_secs(base_delay_secs),
                max_attempts,
                max_backoff: Duration::from_secs(max_backoff_secs),
            };

            let (shutdown_tx, shutdown_rx) = shutdown_channel();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received, finishing current item");
                    shutdown_tx.shutdown();
                }
            });

            let transfer = Arc::new(CopyTransfer::new(app.fs.clone(), dest_dir));
            let distributor =
                Distributor::new(transfer, retry).with_checkpoint(app.store.clone(), checkpoint_every);
            let summary = distributor.run(&mut queue, shutdown_rx).await?;

            println!("{}", "Distribution summary".cyan().bold());
            println!("  {} {}", "Processed:".bold(), summary.processed);
            println!("  {} {}", "Failed:".bold(), summary.failed);
            println!("  {} {}", "Remaining:".bold(), queue.len());
            if summary.interrupted {
                println!("  {}", "Interrupted; remaining items were saved".yellow());
            }

            if !summary.failures.is_empty() {
                let rows: Vec<FailureRow> = summary
                    .failures
                    .iter()
                    .map(|f| FailureRow {
                        source: f.source_path.display().to_string(),
                        attempts: f.attempts,
                        error: f.error.clone(),
                    })
                    .collect();
                println!();
                println!("{}", Table::new(rows));
                bail!("{} transfer(s) failed", summary.failed);
            }
        }
    }

    Ok(())
}

fn print_status(queue: &FileQueue, state_path: &Path) {
    let capacity = match queue.capacity().as_max_size() {
        -1 => "unbounded".to_string(),
        n => n.to_string(),
    };
    println!("  {} {}", "Name:".bold(), queue.name());
    println!("  {} {}", "State file:".bold(), state_path.display());
    println!("  {} {}", "Session:".bold(), queue.session_id());
    println!("  {} {}", "Created:".bold(), queue.created_utc().to_rfc3339());
    println!("  {} {} / {}", "Pending:".bold(), queue.len(), capacity);
    println!("  {} {}", "Processed:".bold(), queue.processed_count);
    println!("  {} {}", "Failed:".bold(), queue.failed_count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_parses_target_dir() {
        let cli = Cli::try_parse_from([
            "filequeue",
            "add",
            "a.txt",
            "b.txt",
            "--target-dir",
            "/out",
            "--meta",
            "owner=ops",
        ])
        .unwrap();

        match cli.command {
            Commands::Add {
                paths,
                target_dir,
                no_validate,
                meta,
            } => {
                assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
                assert_eq!(target_dir, Some(PathBuf::from("/out")));
                assert!(!no_validate);
                assert_eq!(meta, vec!["owner=ops".to_string()]);
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_init_accepts_unbounded_max_size() {
        let cli = Cli::try_parse_from(["filequeue", "init", "--name", "q", "--max-size", "-1"]).unwrap();

        assert!(matches!(cli.command, Commands::Init { max_size: -1, .. }));
    }
}
