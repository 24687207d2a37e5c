//! Connection descriptor rendering and caller email validation.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::config::DescriptorParams;
use crate::error::{RelayError, RelayResult};

/// Longest email accepted as a client label.
pub const MAX_EMAIL_LEN: usize = 254;

/// Characters that would split the descriptor URI or be decoded inside its label.
const FORBIDDEN_EMAIL_CHARS: &[char] = &['#', '&', '?', '/', '"', '%'];

/// A caller email that passed [`validate_email`]; safe to place in a descriptor label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClientEmail(String);

impl ClientEmail {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a caller-supplied email before it reaches the panel payload or a descriptor label.
///
/// Surrounding whitespace is trimmed; the trimmed value is otherwise used verbatim,
/// so only printable ASCII is accepted.
pub fn validate_email(raw: &str) -> RelayResult<ClientEmail> {
    let email = raw.trim();

    if email.is_empty() {
        return Err(RelayError::InvalidEmail("must not be empty".to_string()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(RelayError::InvalidEmail(format!(
            "must be at most {} bytes",
            MAX_EMAIL_LEN
        )));
    }
    if let Some(c) = email
        .chars()
        .find(|c| !c.is_ascii_graphic() || FORBIDDEN_EMAIL_CHARS.contains(c))
    {
        return Err(RelayError::InvalidEmail(format!(
            "contains forbidden character {:?}",
            c
        )));
    }

    Ok(ClientEmail(email.to_string()))
}

/// Shareable `vless://` URI for a provisioned client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConnectionDescriptor(String);

impl ConnectionDescriptor {
    pub fn render(client_id: &Uuid, email: &ClientEmail, params: &DescriptorParams) -> Self {
        Self(format!(
            "vless://{id}@{host}:{port}?type={transport}&security={security}&\
             pbk={pbk}&fp={fp}&sni={sni}&sid={sid}&spx={spx}&flow={flow}#{prefix}{email}",
            id = client_id,
            host = params.host,
            port = params.port,
            transport = params.transport,
            security = params.security,
            pbk = params.pbk,
            fp = params.fp,
            sni = params.sni,
            sid = params.sid,
            spx = params.spx,
            flow = params.flow,
            prefix = params.label_prefix,
            email = email,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
