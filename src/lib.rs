// Core modules
mod config;
mod descriptor;
mod error;
mod relay;
pub mod api;
pub mod panel;

// Re-export key types and functions
pub use config::{
    Credentials, DescriptorParams, PanelConfig, RelayConfig, SharedConfig,
    load_descriptor_params,
};
pub use descriptor::{ClientEmail, ConnectionDescriptor, validate_email};
pub use error::{PanelStage, RelayError, RelayResult};
pub use panel::{PanelClient, Retention, Session};
pub use relay::add_client;

use anyhow::Result;

/// Bind `addr` and serve the relay API until the process is stopped.
pub async fn serve(config: SharedConfig, addr: &str) -> Result<()> {
    let app = api::create_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Relay listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
