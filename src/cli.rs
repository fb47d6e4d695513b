//! Command-line entrypoint for the account console.
//!
//! There are no subcommands; the binary starts the interactive session
//! directly. Flags only select the gateway endpoint and ambient plumbing.

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::advisor::{AdvisorClient, AdvisoryService};
use crate::broker::GatewayClient;
use crate::config::{AdvisorConfig, GatewayConfig};
use crate::data_paths::{DataPaths, DEFAULT_DATA_DIR};
use crate::logging::{self, LoggingConfig};
use crate::session::{self, StdConsole};

pub const DEFAULT_GATEWAY_HOST: &str = "127.0.0.1";
pub const DEFAULT_GATEWAY_PORT: u16 = 11111;

#[derive(Parser)]
#[command(name = "portview")]
#[command(version)]
#[command(about = "Interactive console for brokerage accounts and positions", long_about = None)]
pub struct Cli {
    /// Broker gateway host
    #[arg(long, default_value = DEFAULT_GATEWAY_HOST)]
    pub host: String,

    /// Broker gateway port
    #[arg(long, default_value_t = DEFAULT_GATEWAY_PORT)]
    pub port: u16,

    /// Data directory path (default: ./data)
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Wires configuration, logging and both collaborators, then hands
    /// control to the session loop.
    pub async fn execute(self) -> Result<()> {
        let data_paths = DataPaths::new(&self.data_dir);
        data_paths.ensure_directories()?;
        logging::init_logging(&LoggingConfig::new(data_paths.clone()), self.verbose)?;

        let advisor_config = AdvisorConfig::from_env();
        if advisor_config.is_none() {
            tracing::info!("Advisory credentials not set; AI assistant disabled");
        }

        let gateway_config = GatewayConfig::new(self.host, self.port);
        let endpoint = format!("{}:{}", gateway_config.host, gateway_config.port);
        println!("Connecting to the broker gateway at {}...", endpoint.cyan());
        let gateway = GatewayClient::connect(&gateway_config)
            .await
            .context("Failed to connect to the broker gateway")?;

        let advisor_client = advisor_config.map(AdvisorClient::new);
        let advisor = advisor_client
            .as_ref()
            .map(|client| client as &dyn AdvisoryService);

        let mut console = StdConsole;
        session::run_with_cleanup(&gateway, advisor, &mut console).await
    }
}
