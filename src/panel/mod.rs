//! Outbound side of the relay: talking to the remote panel.
//!
//! A request drives the panel in two steps over one [`PanelClient`]:
//!
//! - **Authenticate**: form-encoded `POST {base}/login`, yielding a [`Session`]
//! - **Provision**: form-encoded `POST {base}/panel/inbound/addClient`, replaying
//!   the session cookie and returning a [`ConnectionDescriptor`](crate::ConnectionDescriptor)
//!
//! The session is an explicit value handed from the first step to the second
//! rather than state hidden inside a cookie jar. Both the client and the
//! session are dropped when the request finishes.
//!
//! ## Usage
//!
//! ```ignore
//! let client = PanelClient::connect(&config)?;
//! let session = client.authenticate().await?;
//! let descriptor = client.provision(&session, &email, Retention::Standard).await?;
//! ```

mod client;
mod identity;
mod session;

pub use client::PanelClient;
pub use identity::Retention;
pub use session::Session;
