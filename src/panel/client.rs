//! Per-request HTTP connection to the panel.

use chrono::Utc;
use http::header::{ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, SET_COOKIE};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::descriptor::{ClientEmail, ConnectionDescriptor};
use crate::error::{PanelStage, RelayError, RelayResult};
use crate::panel::identity::{ClientIdentity, Retention, add_client_form};
use crate::panel::session::Session;

/// User agent sent on every panel call.
const USER_AGENT: &str = "curl/7.88.1";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const ACCEPT_VALUE: &str = "application/json, text/plain, */*";

/// Outbound connection to the panel for exactly one relay request.
///
/// Owns its own `reqwest::Client` so nothing (connections, sessions) outlives
/// the request that created it.
pub struct PanelClient<'a> {
    config: &'a RelayConfig,
    http: reqwest::Client,
}

impl<'a> PanelClient<'a> {
    /// Build the outbound client with the configured timeout and TLS policy.
    ///
    /// Redirects are not followed: a 3xx from the panel is a rejection, and a
    /// session cookie on a redirecting login response must not be dropped.
    pub fn connect(config: &'a RelayConfig) -> RelayResult<Self> {
        let panel = &config.panel;
        if panel.accept_invalid_certs {
            debug!("TLS certificate validation disabled for {}", panel.base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(panel.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(panel.accept_invalid_certs)
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    fn post_form(&self, url: String, body: String) -> reqwest::RequestBuilder {
        let panel = &self.config.panel;
        self.http
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(ACCEPT, ACCEPT_VALUE)
            .header(REFERER, panel.referer())
            .header(ORIGIN, panel.base_url.as_str())
            .body(body)
    }

    /// Log in with the static credentials and return the resulting session.
    ///
    /// A success status without a `3x-ui` cookie is `AuthenticationRejected`,
    /// distinct from a non-success status, which is a `PanelRejection`.
    pub async fn authenticate(&self) -> RelayResult<Session> {
        let panel = &self.config.panel;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", panel.credentials.username())
            .append_pair("password", panel.credentials.password())
            .finish();

        debug!(
            url = %panel.login_url(),
            username = %panel.credentials.username(),
            "Sending panel login request"
        );

        let response = self
            .post_form(panel.login_url(), body)
            .send()
            .await
            .map_err(|e| RelayError::transport(PanelStage::Login, e))?;

        let status = response.status();
        let session = Session::from_set_cookie(response.headers().get_all(SET_COOKIE));
        let text = response
            .text()
            .await
            .map_err(|e| RelayError::transport(PanelStage::Login, e))?;

        debug!(
            status = status.as_u16(),
            body = %text,
            session = ?session,
            "Panel login response"
        );

        if !status.is_success() {
            return Err(RelayError::PanelRejection {
                stage: PanelStage::Login,
                status: status.as_u16(),
                body: text,
            });
        }

        session.ok_or_else(|| {
            warn!("Panel accepted login but issued no session cookie");
            RelayError::AuthenticationRejected
        })
    }

    /// Add one client to the configured inbound and render its descriptor.
    pub async fn provision(
        &self,
        session: &Session,
        email: &ClientEmail,
        retention: Retention,
    ) -> RelayResult<ConnectionDescriptor> {
        let panel = &self.config.panel;
        let identity = ClientIdentity::generate(email, &panel.flow, retention, Utc::now());
        let body = add_client_form(panel.inbound_id, &identity)
            .map_err(|e| RelayError::Internal(format!("Failed to encode settings: {}", e)))?;

        debug!(
            url = %panel.add_client_url(),
            inbound_id = panel.inbound_id,
            client_id = %identity.id,
            expiry_time = identity.expiry_time,
            session = ?session,
            "Sending addClient request"
        );

        let response = self
            .post_form(panel.add_client_url(), body)
            .header(COOKIE, session.cookie_header())
            .send()
            .await
            .map_err(|e| RelayError::transport(PanelStage::AddClient, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RelayError::transport(PanelStage::AddClient, e))?;

        debug!(status = status.as_u16(), body = %text, "Panel addClient response");

        if !status.is_success() {
            return Err(RelayError::PanelRejection {
                stage: PanelStage::AddClient,
                status: status.as_u16(),
                body: text,
            });
        }

        info!(
            client_id = %identity.id,
            email = %email,
            retention = ?retention,
            "Provisioned panel client"
        );

        Ok(ConnectionDescriptor::render(
            &identity.id,
            email,
            &self.config.descriptor,
        ))
    }
}
