use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use panel_relay::{Credentials, PanelConfig, RelayConfig, Retention, load_descriptor_params};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "panel-relay")]
#[command(about = "Session-authenticated relay for provisioning panel clients")]
struct Cli {
    #[command(flatten)]
    panel: PanelArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PanelArgs {
    /// Panel base address, e.g. https://panel.example.com:2053
    #[arg(long, env = "TARGET_SERVER", global = true)]
    panel_url: Option<String>,
    #[arg(long, env = "USERNAME", global = true)]
    username: Option<String>,
    #[arg(long, env = "PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,
    /// Inbound every new client is attached to
    #[arg(long, env = "INBOUND_ID", default_value_t = 1, global = true)]
    inbound_id: u32,
    /// Flow tag written into each client entry
    #[arg(long, env = "CLIENT_FLOW", default_value = "xtls-rprx-vision", global = true)]
    flow: String,
    /// Timeout for each panel call, in seconds
    #[arg(long, env = "PANEL_TIMEOUT_SECS", default_value_t = 10, global = true)]
    timeout_secs: u64,
    /// Accept self-signed or otherwise invalid panel certificates
    #[arg(long, env = "PANEL_INSECURE_TLS", default_value_t = false, global = true)]
    insecure_tls: bool,
    /// JSON file overriding connection descriptor parameters (defaults to ./relay.json)
    #[arg(long, env = "RELAY_DESCRIPTOR_CONFIG", global = true)]
    descriptor_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server
    Server {
        /// Bind address, e.g. 0.0.0.0:22548
        #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0:22548")]
        bind: String,
    },
    /// Provision a single client and print its connection descriptor
    AddClient {
        email: String,
        /// Use the 1-day test retention instead of 30 days
        #[arg(long, default_value_t = false)]
        test: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("panel_relay=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(cli.panel)?.shared();

    match cli.command {
        Commands::Server { bind } => {
            info!("Starting relay for panel {}", config.panel.base_url);
            panel_relay::serve(config, &bind).await?;
        }
        Commands::AddClient { email, test } => {
            let retention = if test {
                Retention::Test
            } else {
                Retention::Standard
            };
            info!(
                "Provisioning client '{}' with {:?} retention",
                email, retention
            );

            let descriptor = panel_relay::add_client(config, &email, retention).await?;
            println!("{}", descriptor);
        }
    }

    Ok(())
}

/// Build the immutable relay configuration; missing credentials are fatal.
fn build_config(args: PanelArgs) -> Result<RelayConfig> {
    let panel_url = args
        .panel_url
        .ok_or_else(|| anyhow::anyhow!("TARGET_SERVER (or --panel-url) must be set"))?;
    let credentials = Credentials::new(
        args.username.unwrap_or_default(),
        args.password.unwrap_or_default(),
    )?;

    let mut panel = PanelConfig::new(&panel_url, credentials)?;
    panel.inbound_id = args.inbound_id;
    panel.flow = args.flow;
    panel.timeout = Duration::from_secs(args.timeout_secs);
    panel.accept_invalid_certs = args.insecure_tls;

    if panel.accept_invalid_certs {
        warn!("TLS certificate validation for the panel is disabled");
    }

    let descriptor = load_descriptor_params(args.descriptor_config)?;
    info!(
        "Descriptor target {}:{} ({}/{})",
        descriptor.host, descriptor.port, descriptor.transport, descriptor.security
    );

    Ok(RelayConfig::new(panel, descriptor))
}
