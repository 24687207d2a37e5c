//! One authenticate-then-provision flow per inbound request.

use tracing::{Instrument, debug, info_span};

use crate::config::SharedConfig;
use crate::descriptor::{ConnectionDescriptor, validate_email};
use crate::error::{RelayError, RelayResult};
use crate::panel::{PanelClient, Retention};

/// Validate the email, then log in to the panel and provision a client.
///
/// The panel calls run on their own task: once started, a flow runs to
/// completion even if the caller goes away, so a client is never left half
/// provisioned by a dropped connection. Nothing is retried.
pub async fn add_client(
    config: SharedConfig,
    email: &str,
    retention: Retention,
) -> RelayResult<ConnectionDescriptor> {
    let email = validate_email(email)?;
    let span = info_span!("relay", email = %email, retention = ?retention);

    let flow = async move {
        let client = PanelClient::connect(&config)?;

        debug!("authenticating");
        let session = client.authenticate().await?;

        debug!("authenticated, provisioning");
        client.provision(&session, &email, retention).await
    };

    tokio::spawn(flow.instrument(span))
        .await
        .map_err(|e| RelayError::Internal(format!("relay task failed: {}", e)))?
}
