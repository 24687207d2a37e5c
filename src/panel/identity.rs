//! Per-request client identity and the `addClient` payload built from it.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::descriptor::ClientEmail;

/// Expiry policy for a provisioned client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// 30 days, served by `/proxy/add-client`.
    Standard,
    /// 1 day, served by `/proxy/add-test-client`.
    Test,
}

impl Retention {
    pub fn window(self) -> Duration {
        match self {
            Self::Standard => Duration::days(30),
            Self::Test => Duration::days(1),
        }
    }

    /// Expiry in epoch milliseconds, the unit the panel stores.
    pub fn expiry_millis(self, now: DateTime<Utc>) -> i64 {
        (now + self.window()).timestamp_millis()
    }
}

/// One client entry as the panel expects it inside `settings.clients`.
///
/// The id comes from a fresh v4 UUID per call; duplicates are left to the
/// panel, which refuses a client id it already holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClientIdentity {
    pub id: Uuid,
    pub email: ClientEmail,
    pub flow: String,
    pub enable: bool,
    pub expiry_time: i64,
}

impl ClientIdentity {
    pub fn generate(
        email: &ClientEmail,
        flow: &str,
        retention: Retention,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.clone(),
            flow: flow.to_string(),
            enable: true,
            expiry_time: retention.expiry_millis(now),
        }
    }
}

#[derive(Serialize)]
struct ClientSettings<'a> {
    clients: [&'a ClientIdentity; 1],
}

/// Form body for `addClient`: the inbound id paired with JSON-encoded settings.
pub(crate) fn add_client_form(
    inbound_id: u32,
    identity: &ClientIdentity,
) -> serde_json::Result<String> {
    let settings = serde_json::to_string(&ClientSettings {
        clients: [identity],
    })?;

    Ok(url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id", &inbound_id.to_string())
        .append_pair("settings", &settings)
        .finish())
}
