use serde::Deserialize;
use std::{env, fmt, fs, path::PathBuf, sync::Arc, time::Duration};

/// Name of the session cookie issued by the panel on a successful login.
pub const SESSION_COOKIE_NAME: &str = "3x-ui";

/// Default outbound timeout for each panel call.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

pub const DEFAULT_INBOUND_ID: u32 = 1;
pub const DEFAULT_FLOW: &str = "xtls-rprx-vision";

/// Static panel login pair. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> anyhow::Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.trim().is_empty() || password.is_empty() {
            return Err(anyhow::anyhow!(
                "USERNAME and PASSWORD must be set to non-empty values"
            ));
        }

        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to reach and drive the remote panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Base address without a trailing slash, e.g. `https://panel.example.com:2053`.
    pub base_url: String,
    pub credentials: Credentials,
    /// Inbound every provisioned client is attached to.
    pub inbound_id: u32,
    /// Flow tag written into each client entry.
    pub flow: String,
    pub timeout: Duration,
    /// Skip TLS certificate validation (self-signed panels). Off unless asked for.
    pub accept_invalid_certs: bool,
}

impl PanelConfig {
    pub fn new(base_url: &str, credentials: Credentials) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        Ok(Self {
            base_url,
            credentials,
            inbound_id: DEFAULT_INBOUND_ID,
            flow: DEFAULT_FLOW.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            accept_invalid_certs: false,
        })
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url)
    }

    pub fn add_client_url(&self) -> String {
        format!("{}/panel/inbound/addClient", self.base_url)
    }

    /// Value for the `Referer` header.
    pub fn referer(&self) -> String {
        format!("{}/", self.base_url)
    }
}

fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("Invalid panel url `{}`: {}", raw, e))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow::anyhow!(
            "Panel url `{}` must use http or https",
            raw
        ));
    }

    Ok(trimmed.to_string())
}

/// Fixed transport and security parameters rendered into every descriptor.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DescriptorParams {
    pub host: String,
    pub port: String,
    #[serde(rename = "type")]
    pub transport: String,
    pub security: String,
    pub pbk: String,
    pub fp: String,
    pub sni: String,
    pub sid: String,
    /// Already percent-encoded; copied into the URI as-is.
    pub spx: String,
    pub flow: String,
    pub label_prefix: String,
}

impl Default for DescriptorParams {
    fn default() -> Self {
        Self {
            host: "example.com".to_string(),
            port: "443".to_string(),
            transport: "tcp".to_string(),
            security: "reality".to_string(),
            pbk: "98VanBnRnzoHAN7AiD0_32Fp691pBSUQ4JFaSEtfsGI".to_string(),
            fp: "chrome".to_string(),
            sni: "yahoo.com".to_string(),
            sid: "8d8a5508".to_string(),
            spx: "%2F".to_string(),
            flow: DEFAULT_FLOW.to_string(),
            label_prefix: "McMare-VLESS-".to_string(),
        }
    }
}

/// Process-wide configuration, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub panel: PanelConfig,
    pub descriptor: DescriptorParams,
}

pub type SharedConfig = Arc<RelayConfig>;

impl RelayConfig {
    pub fn new(panel: PanelConfig, descriptor: DescriptorParams) -> Self {
        Self { panel, descriptor }
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(self)
    }
}

/// Locate the optional descriptor file: explicit path first, then `./relay.json`.
pub fn resolve_descriptor_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p);
    }

    let candidate = PathBuf::from("relay.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

/// Load descriptor parameters, falling back to the built-in defaults when no file exists.
pub fn load_descriptor_params(explicit: Option<PathBuf>) -> anyhow::Result<DescriptorParams> {
    let Some(path) = resolve_descriptor_path(explicit) else {
        return Ok(DescriptorParams::default());
    };

    let raw = fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {}", path.display(), e))?;
    let params: DescriptorParams = serde_json::from_str(&raw)?;

    Ok(expand_params(params))
}

/// Replace `${NAME}` with the value of `NAME`; unset or unterminated references stay literal.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let Some(end) = rest.find('}') else {
            break;
        };
        match env::var(&rest[2..end]) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[..=end]),
        }
        rest = &rest[end + 1..];
    }

    out.push_str(rest);
    out
}

fn expand_params(params: DescriptorParams) -> DescriptorParams {
    let mut params = params;

    for field in [
        &mut params.host,
        &mut params.port,
        &mut params.transport,
        &mut params.security,
        &mut params.pbk,
        &mut params.fp,
        &mut params.sni,
        &mut params.sid,
        &mut params.spx,
        &mut params.flow,
        &mut params.label_prefix,
    ] {
        *field = expand_env_vars(field);
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_credentials_reject_empty() {
        assert!(Credentials::new("", "secret").is_err());
        assert!(Credentials::new("admin", "").is_err());
        assert!(Credentials::new("   ", "secret").is_err());
        assert!(Credentials::new("admin", "secret").is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2").unwrap();
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_panel_urls_strip_trailing_slash() {
        let creds = Credentials::new("admin", "secret").unwrap();
        let panel = PanelConfig::new("https://panel.local:2053/", creds).unwrap();

        assert_eq!(panel.base_url, "https://panel.local:2053");
        assert_eq!(panel.login_url(), "https://panel.local:2053/login");
        assert_eq!(
            panel.add_client_url(),
            "https://panel.local:2053/panel/inbound/addClient"
        );
        assert_eq!(panel.referer(), "https://panel.local:2053/");
        assert!(!panel.accept_invalid_certs);
    }

    #[test]
    fn test_panel_url_requires_http_scheme() {
        let creds = Credentials::new("admin", "secret").unwrap();
        assert!(PanelConfig::new("ftp://panel.local", creds.clone()).is_err());
        assert!(PanelConfig::new("not a url", creds).is_err());
    }

    #[test]
    fn test_descriptor_file_overrides_subset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"host": "vpn.example.org", "port": "8443", "type": "grpc"}}"#
        )
        .unwrap();

        let params = load_descriptor_params(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(params.host, "vpn.example.org");
        assert_eq!(params.port, "8443");
        assert_eq!(params.transport, "grpc");
        assert_eq!(params.security, "reality");
        assert_eq!(params.spx, "%2F");
    }

    #[test]
    fn test_descriptor_missing_file_is_an_error() {
        let result = load_descriptor_params(Some(PathBuf::from("/nonexistent/relay.json")));
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-local variable name, not read elsewhere.
        unsafe { env::set_var("PANEL_RELAY_TEST_PBK", "abc123") };
        assert_eq!(expand_env_vars("${PANEL_RELAY_TEST_PBK}"), "abc123");
        assert_eq!(
            expand_env_vars("x-${PANEL_RELAY_TEST_UNSET_VAR}"),
            "x-${PANEL_RELAY_TEST_UNSET_VAR}"
        );
        assert_eq!(expand_env_vars("plain"), "plain");
        assert_eq!(
            expand_env_vars("a-${PANEL_RELAY_TEST_PBK}-b-${unterminated"),
            "a-abc123-b-${unterminated"
        );
    }
}
