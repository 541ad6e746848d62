//! FlashBlade Share Driver
//!
//! Runs the share driver against one FlashBlade array, either as a REST
//! service for the share orchestrator or as one-shot checks from the shell.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flashblade_share_driver::domain::ports::ShareDriver;
use flashblade_share_driver::{
    ApiServer, ApiServerConfig, ArrayFactory, DriverConfig, FlashBladeShareDriver,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// FlashBlade Share Driver - file shares on a FlashBlade array
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, short, env = "FLASHBLADE_CONFIG")]
    config: Option<PathBuf>,

    /// Array management VIP (overrides the config file)
    #[arg(long, env = "FLASHBLADE_MGMT_VIP")]
    mgmt_vip: Option<String>,

    /// Array data VIP (overrides the config file)
    #[arg(long, env = "FLASHBLADE_DATA_VIP")]
    data_vip: Option<String>,

    /// Array API token (overrides the config file)
    #[arg(long, env = "FLASHBLADE_API", hide_env_values = true)]
    api_token: Option<String>,

    /// Eradicate filesystems and snapshots on delete
    #[arg(long, env = "FLASHBLADE_ERADICATE")]
    eradicate: bool,

    /// Use a simulated in-memory array
    #[arg(long, env = "FLASHBLADE_SIMULATE")]
    simulate: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the driver REST API
    Serve {
        /// REST API bind address
        #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
        api_addr: String,
    },
    /// Print backend stats as JSON
    Stats,
    /// Validate configuration and log into the array
    Check,
}

impl Args {
    /// Config file contents with command line overrides applied
    fn driver_config(&self) -> anyhow::Result<DriverConfig> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => DriverConfig::default(),
        };

        if let Some(vip) = &self.mgmt_vip {
            config.flashblade_mgmt_vip = Some(vip.clone());
        }
        if let Some(vip) = &self.data_vip {
            config.flashblade_data_vip = Some(vip.clone());
        }
        if let Some(token) = &self.api_token {
            config.flashblade_api = Some(token.clone());
        }
        config.flashblade_eradicate |= self.eradicate;

        Ok(config)
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    let settings = args.driver_config()?.settings()?;

    info!("Starting FlashBlade Share Driver");
    info!("  Version: {}", flashblade_share_driver::VERSION);
    info!("  Backend: {}", settings.backend_name);
    info!("  Management VIP: {}", settings.management_address);
    info!("  Data VIP: {}", settings.data_address);
    info!("  Eradicate on delete: {}", settings.eradicate);

    let array = ArrayFactory::create(&settings, args.simulate)?;
    let driver = Arc::new(
        FlashBladeShareDriver::setup(settings, array)
            .await
            .context("driver setup failed")?,
    );

    match args.command {
        Command::Serve { api_addr } => {
            let api_config = ApiServerConfig {
                rest_addr: api_addr
                    .parse()
                    .with_context(|| format!("invalid REST API address {}", api_addr))?,
            };
            ApiServer::new(api_config, driver).run().await?;
            info!("Driver shutdown complete");
        }
        Command::Stats => {
            let stats = driver.update_share_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Check => {
            info!(
                "Array session ok, API generation {}",
                driver.generation()
            );
            println!("ok");
        }
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("tower_http=info".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
