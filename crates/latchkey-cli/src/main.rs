//! Latchkey - single-door access controller
//!
//! Reads decoded reader frames (`<bits> <value>` per line) from standard input,
//! authorizes them against the keys table and drives the door lines.

use anyhow::Context;
use clap::{Parser, Subcommand};
use latchkey_controller::{AccessController, AuthorizationConfig, Authenticator, ControllerConfig};
use latchkey_core::Credential;
use latchkey_hardware::mock::MockOutput;
use latchkey_hardware::stream::StreamReader;
use latchkey_hardware::sysfs::SysfsOutput;
use latchkey_hardware::{AnyOutputDevice, AnyReaderDevice, ReaderManager};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration file read when `--config` is not given, if it exists.
const DEFAULT_CONFIG_PATH: &str = "/etc/latchkey/config.json";

/// Latchkey - single-door access controller
#[derive(Parser)]
#[command(name = "latchkey")]
#[command(about = "Keypad and badge access controller for a single door")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the JSON configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Use this CSV keys file instead of the configured authorization source
    #[arg(long, global = true)]
    keys: Option<PathBuf>,

    /// Log level for latchkey crates (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Drive in-memory lines instead of sysfs GPIO
    #[arg(long, global = true)]
    simulate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller until interrupted (default)
    Run,

    /// Look up one credential in the authorization table and exit
    Check {
        /// Numeric credential, as typed on the keypad or read from a badge
        credential: Credential,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = load_config(cli.config.as_deref(), cli.keys)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            run(config, cli.simulate).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { credential } => check(&config.authorization, credential).await,
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(format!("latchkey={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "latchkey=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<&Path>, keys: Option<PathBuf>) -> anyhow::Result<ControllerConfig> {
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    let mut config = match path {
        Some(path) => ControllerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if default_path.exists() => ControllerConfig::load(default_path)
            .with_context(|| format!("Failed to load config from {DEFAULT_CONFIG_PATH}"))?,
        None => ControllerConfig::default(),
    };

    if let Some(path) = keys {
        config.authorization = AuthorizationConfig::Csv { path };
    }
    config.validate()?;
    Ok(config)
}

async fn run(config: ControllerConfig, simulate: bool) -> anyhow::Result<()> {
    info!("Starting Latchkey v{}", env!("CARGO_PKG_VERSION"));

    let output = if simulate {
        info!("Simulating output lines");
        let (output, _lines) = MockOutput::new();
        AnyOutputDevice::Mock(output)
    } else {
        let output = SysfsOutput::open(&config.gpio_path, config.pins)
            .await
            .with_context(|| format!("Failed to open GPIO at {}", config.gpio_path.display()))?;
        AnyOutputDevice::Sysfs(output)
    };

    let source = config.authorization.open()?;
    let controller = AccessController::new(config, output, source)?;

    let mut manager = ReaderManager::default();
    manager.register_reader(AnyReaderDevice::Stream(
        StreamReader::stdin().context("Failed to open standard input")?,
    ));
    let mut readers = manager.start();

    controller
        .start()
        .await
        .context("Failed to initialize output lines")?;

    let mut door = controller.door_state();
    let door_log = tokio::spawn(async move {
        while door.changed().await.is_ok() {
            let state = *door.borrow_and_update();
            info!("Door {:?}", state);
        }
    });

    let result = tokio::select! {
        result = controller.run(&mut readers) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };
    if let Err(e) = &result {
        error!("Controller stopped: {}", e);
    }

    controller.shutdown(readers).await?;
    door_log.abort();
    info!("Latchkey stopped");

    result.map_err(Into::into)
}

async fn check(
    authorization: &AuthorizationConfig,
    credential: Credential,
) -> anyhow::Result<ExitCode> {
    let authenticator = Authenticator::new(authorization.open()?);

    let record = authenticator
        .check(credential)
        .await
        .with_context(|| format!("Cannot read {}", authenticator.describe()))?;

    Ok(match record {
        Some(record) => {
            println!("Access granted for {}", record);
            ExitCode::SUCCESS
        }
        None => {
            println!("Access denied for {}", credential);
            ExitCode::FAILURE
        }
    })
}
