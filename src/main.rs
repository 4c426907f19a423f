use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::runtime::Handle;

use plugin_updater::config::{
    DEV_INDICATOR, JsonFileConfig, UpdaterConfig, config_path, data_dir, staging_dir,
};
use plugin_updater::logging::{LOG_FILE, init_logging};
use plugin_updater::updater::runner::TokioRunner;
use plugin_updater::updater::throttle::SystemClock;
use plugin_updater::updater::{Recipient, StagingTarget, Updater};
use plugin_updater::version::client::HttpSourceClient;
use plugin_updater::version::handler::UpdateSourceHandler;
use plugin_updater::version::semver::Version;

#[derive(Parser)]
#[command(name = "plugin-updater")]
#[command(version, about = "Checks for and stages plugin updates")]
struct Cli {
    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving downloaded artifacts
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// File name of the artifact inside the staging directory
    #[arg(long, default_value = "plugin.jar")]
    file_name: String,

    /// Installed version, the baseline for comparisons
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    current_version: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search once and print whether an update is available
    Check,
    /// Download the newest version into the staging directory
    Update,
    /// Search periodically, installing right away in automatic mode
    Watch {
        /// Seconds between searches
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
}

struct Console;

impl Recipient for Console {
    fn id(&self) -> &str {
        "console"
    }

    fn send_message(&self, message: &str) {
        println!("{}", message);
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _logging = init_logging(&data_dir(), LOG_FILE)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let runner = Arc::new(TokioRunner::new(Handle::current()));
    let updater = build_updater(
        cli.config.unwrap_or_else(config_path),
        StagingTarget {
            directory: cli.staging_dir.unwrap_or_else(staging_dir),
            file_name: cli.file_name,
        },
        &cli.current_version,
        runner.clone(),
    )?;

    match cli.command {
        Command::Check => {
            updater.search();
            runner.wait_idle().await;
            match updater.get_update_version() {
                Some(version) => println!("Update available: {}", version),
                None => println!("No update available"),
            }
        }
        Command::Update => return Ok(run_update(&updater, &Console).await),
        Command::Watch { interval } => {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval));
            loop {
                tokio::select! {
                    _ = ticker.tick() => search_and_notify(&updater, &runner, &Console).await,
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            runner.wait_idle().await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn build_updater(
    config: PathBuf,
    staging: StagingTarget,
    current_version: &str,
    runner: Arc<TokioRunner>,
) -> anyhow::Result<Updater> {
    Ok(Updater::new(
        UpdaterConfig::new(
            Arc::new(JsonFileConfig::new(config)),
            Version::parse(current_version)?,
            DEV_INDICATOR,
        ),
        UpdateSourceHandler::new(Arc::new(HttpSourceClient::new()?)),
        runner,
        Arc::new(SystemClock),
        staging,
    ))
}

/// Failures reach the console through the recipient only.
async fn run_update(updater: &Updater, console: &dyn Recipient) -> ExitCode {
    match updater.perform_update(Some(console)).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

/// One watch tick. The notification waits for the search it just started.
async fn search_and_notify(updater: &Updater, runner: &TokioRunner, recipient: &dyn Recipient) {
    updater.search();
    runner.wait_idle().await;
    updater.send_update_notification(recipient);
}
