//! ch-datasets CLI - load and dump ClickHouse datasets.

mod output;

use ch_datasets::{
    ClickHouseClient, ClientCommand, Config, DatasetCatalog, DatasetError, DatasetTransfer,
    DumpOptions, LoadOptions, Progress, TransferSummary,
};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{info, Level};

/// Configuration file read when `--config` is not given.
const DEFAULT_CONFIG: &str = "ch-datasets.yaml";

/// Exit code of a transfer that finished with failed operations.
const EXIT_OPERATIONS_FAILED: u8 = 6;

#[derive(Parser)]
#[command(name = "ch-datasets")]
#[command(about = "Load and dump ClickHouse datasets")]
struct Cli {
    /// Path to YAML configuration file [default: ch-datasets.yaml, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Write logs to this file
    #[arg(short = 'L', long, default_value = "ch-datasets.log")]
    log_file: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Manage dataset repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Dump, load and search for datasets
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// List dataset repositories
    List,
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Search for datasets
    Search {
        /// Dataset name (all datasets when omitted)
        name: Option<String>,

        /// Search only this repository directory
        #[arg(short, long)]
        repo_path: Option<PathBuf>,

        /// Show full description
        #[arg(long)]
        full: bool,
    },

    /// Load a dataset from files to database
    Load {
        /// Dataset name
        name: String,

        /// Datasets repository (defaults to all configured repositories)
        #[arg(short, long)]
        repo_path: Option<PathBuf>,

        /// Server host
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Database (defaults to dataset name)
        #[arg(short, long)]
        database: Option<String>,

        /// Number of client processes to run in parallel
        #[arg(short = 'P', long)]
        parallel: Option<usize>,

        /// Drop the existing database first
        #[arg(short = 'C', long)]
        clean: bool,

        /// Print commands only
        #[arg(short = 'D', long)]
        dry_run: bool,
    },

    /// Dump a live dataset from database to files
    Dump {
        /// Dataset name
        name: String,

        /// Datasets repository
        #[arg(short, long, default_value = ".")]
        repo_path: PathBuf,

        /// Server host
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Database (defaults to dataset name)
        #[arg(short, long)]
        database: Option<String>,

        /// Table selector regex (defaults to all tables)
        #[arg(short, long)]
        tables: Option<String>,

        /// Number of client processes to run in parallel
        #[arg(short = 'P', long)]
        parallel: Option<usize>,

        /// Write into an existing dataset directory
        #[arg(short, long)]
        overwrite: bool,

        /// Compress data files
        #[arg(short, long)]
        compress: bool,

        /// Print commands only
        #[arg(short = 'D', long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, DatasetError> {
    let cli = Cli::parse();

    // Version needs neither logging nor configuration
    if let Commands::Version = cli.command {
        println!("ch-datasets {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    setup_logging(cli.verbose, &cli.log_file, &cli.log_format)?;

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Version => unreachable!(), // Handled above
        Commands::Repo {
            command: RepoCommands::List,
        } => {
            let records: Vec<Vec<String>> = config
                .repos
                .iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        r.description.clone(),
                        r.path.display().to_string(),
                    ]
                })
                .collect();
            print!(
                "{}",
                output::format_vertical(&["name", "description", "path"], &records)
            );
        }

        Commands::Dataset {
            command: DatasetCommands::Search {
                name,
                repo_path,
                full,
            },
        } => {
            let catalog = DatasetCatalog::new(config.repos.clone());
            let datasets = catalog.search(name.as_deref(), repo_path.as_deref())?;

            if cli.output_json {
                let names: Vec<_> = datasets.iter().map(|d| &d.name).collect();
                println!("{}", serde_json::to_string_pretty(&names)?);
                return Ok(ExitCode::SUCCESS);
            }

            let columns = [
                "name",
                "title",
                "description",
                "size",
                "sources",
                "notes",
                "repo",
                "path",
            ];
            let records: Vec<Vec<String>> = datasets
                .iter()
                .map(|d| {
                    columns
                        .iter()
                        .map(|c| {
                            let value = d.field(c).unwrap_or_default();
                            if *c == "description" && !full {
                                output::truncate(&value, output::SHORT_DESCRIPTION)
                            } else {
                                value
                            }
                        })
                        .collect()
                })
                .collect();
            print!("{}", output::format_vertical(&columns, &records));
        }

        Commands::Dataset {
            command:
                DatasetCommands::Load {
                    name,
                    repo_path,
                    host,
                    database,
                    parallel,
                    clean,
                    dry_run,
                },
        } => {
            if let Some(h) = host {
                config.server.host = h;
            }
            let options = LoadOptions {
                repo_path,
                database,
                parallel: check_parallel(parallel)?,
                clean,
                dry_run,
            };
            let transfer = build_transfer(&config, cli.output_json);
            let summary = transfer.load(&name, &options).await?;
            return report(&summary, cli.output_json);
        }

        Commands::Dataset {
            command:
                DatasetCommands::Dump {
                    name,
                    repo_path,
                    host,
                    database,
                    tables,
                    parallel,
                    overwrite,
                    compress,
                    dry_run,
                },
        } => {
            if let Some(h) = host {
                config.server.host = h;
            }
            let options = DumpOptions {
                repo_path,
                database,
                table_filter: tables,
                parallel: check_parallel(parallel)?,
                overwrite,
                compress,
                dry_run,
            };
            let transfer = build_transfer(&config, cli.output_json);
            let summary = transfer.dump(&name, &options).await?;
            return report(&summary, cli.output_json);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the explicit config file, or the default one when it exists.
fn load_config(path: Option<&Path>) -> Result<Config, DatasetError> {
    let config = match path {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            let config = Config::load(DEFAULT_CONFIG)?;
            info!("Loaded configuration from {}", DEFAULT_CONFIG);
            config
        }
        None => Config::default(),
    };
    Ok(config)
}

fn check_parallel(parallel: Option<usize>) -> Result<Option<usize>, DatasetError> {
    match parallel {
        Some(0) => Err(DatasetError::Config(
            "--parallel must be at least 1".to_string(),
        )),
        other => Ok(other),
    }
}

fn build_transfer(config: &Config, output_json: bool) -> DatasetTransfer<ClickHouseClient> {
    let client = ClientCommand::from_server(&config.server);
    // Keep stdout parseable when the summary is printed as JSON
    let progress = if output_json {
        Progress::new(|message| eprintln!("{}", message))
    } else {
        Progress::new(|message| println!("{}", message))
    };
    DatasetTransfer::new(
        ClickHouseClient::new(client.clone()),
        client,
        DatasetCatalog::new(config.repos.clone()),
        config.transfer.clone(),
    )
    .with_progress(progress)
}

fn report(summary: &TransferSummary, output_json: bool) -> Result<ExitCode, DatasetError> {
    if output_json {
        println!("{}", summary.to_json()?);
    } else if !summary.failures.is_empty() {
        println!("\nFailed operations:");
        for failure in &summary.failures {
            println!("  {}", failure);
        }
    }

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_OPERATIONS_FAILED))
    }
}

fn setup_logging(verbose: bool, log_file: &Path, format: &str) -> Result<(), DatasetError> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    if format != "text" && format != "json" {
        return Err(DatasetError::Config(format!(
            "Unknown log format '{}', expected text or json",
            format
        )));
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
