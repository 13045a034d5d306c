use std::net::SocketAddr;
use std::time::Duration;

use radport_auth::idp::IdpConfig;
use radport_auth::middleware::SessionCookieConfig;
use radport_imaging::ImagingConfig;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Application session lifetime and cookie attributes
    #[serde(default)]
    pub session: SessionConfig,
    /// Identity provider connection and credentials
    #[serde(default)]
    pub idp: IdpSettings,
    /// Imaging backend connection
    #[serde(default)]
    pub imaging: ImagingSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Session validations
        if self.session.ttl_days == 0 {
            return Err("session.ttl_days must be > 0".into());
        }
        // Identity provider validations
        if let Err(e) = Url::parse(&self.idp.base_url) {
            return Err(format!("idp.base_url is not a valid URL: {e}"));
        }
        if self.idp.realm.is_empty() {
            return Err("idp.realm must not be empty".into());
        }
        if self.idp.client_id.is_empty() {
            return Err("idp.client_id must not be empty".into());
        }
        if self.idp.client_secret.is_empty() {
            return Err("idp.client_secret must be set".into());
        }
        if self.idp.admin_username.is_empty() {
            return Err("idp.admin_username must be set".into());
        }
        if self.idp.admin_password.is_empty() {
            return Err("idp.admin_password must be set".into());
        }
        if self.idp.request_timeout_ms == 0 {
            return Err("idp.request_timeout_ms must be > 0".into());
        }
        // Imaging backend validations
        if let Err(e) = Url::parse(&self.imaging.base_url) {
            return Err(format!("imaging.base_url is not a valid URL: {e}"));
        }
        if self.imaging.request_timeout_ms == 0 {
            return Err("imaging.request_timeout_ms must be > 0".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Application session lifetime, also used as the cookie Max-Age.
    pub fn session_ttl(&self) -> time::Duration {
        time::Duration::days(i64::from(self.session.ttl_days))
    }

    /// Builds the identity provider client configuration.
    pub fn idp_config(&self) -> Result<IdpConfig, String> {
        let base_url = Url::parse(&self.idp.base_url)
            .map_err(|e| format!("idp.base_url is not a valid URL: {e}"))?;
        Ok(IdpConfig::new(
            base_url,
            self.idp.realm.as_str(),
            self.idp.client_id.as_str(),
            self.idp.client_secret.as_str(),
        )
        .with_admin_credentials(
            self.idp.admin_username.as_str(),
            self.idp.admin_password.as_str(),
        )
        .with_request_timeout(Duration::from_millis(self.idp.request_timeout_ms)))
    }

    /// Builds the imaging backend client configuration.
    pub fn imaging_config(&self) -> Result<ImagingConfig, String> {
        let base_url = Url::parse(&self.imaging.base_url)
            .map_err(|e| format!("imaging.base_url is not a valid URL: {e}"))?;
        Ok(ImagingConfig::new(base_url)
            .with_request_timeout(Duration::from_millis(self.imaging.request_timeout_ms)))
    }

    /// Builds the session cookie configuration.
    pub fn cookie_config(&self) -> SessionCookieConfig {
        SessionCookieConfig {
            secure: self.session.cookie_secure,
            ttl: self.session_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days.
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: u32,

    /// Whether the session cookie is marked `Secure`.
    /// Disable only for local development over plain HTTP.
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
}

fn default_session_ttl_days() -> u32 {
    30
}
fn default_cookie_secure() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            cookie_secure: default_cookie_secure(),
        }
    }
}

/// Identity provider connection settings.
///
/// The client secret and the admin service account have no usable defaults;
/// set them in `radport.toml` or via `RADPORT__IDP__CLIENT_SECRET` style
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpSettings {
    /// Base URL of the provider, without a realm path.
    #[serde(default = "default_idp_base_url")]
    pub base_url: String,

    /// Realm that holds the dashboard users.
    #[serde(default = "default_idp_realm")]
    pub realm: String,

    /// OAuth2 client id registered for the dashboard.
    #[serde(default = "default_idp_client_id")]
    pub client_id: String,

    /// OAuth2 client secret.
    #[serde(default)]
    pub client_secret: String,

    /// Service account username used for admin API calls.
    #[serde(default)]
    pub admin_username: String,

    /// Service account password.
    #[serde(default)]
    pub admin_password: String,

    /// Timeout for individual provider requests, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_idp_base_url() -> String {
    "http://localhost:8081".into()
}
fn default_idp_realm() -> String {
    "radport".into()
}
fn default_idp_client_id() -> String {
    "radport-dashboard".into()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for IdpSettings {
    fn default() -> Self {
        Self {
            base_url: default_idp_base_url(),
            realm: default_idp_realm(),
            client_id: default_idp_client_id(),
            client_secret: String::new(),
            admin_username: String::new(),
            admin_password: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Imaging backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingSettings {
    /// Base URL of the imaging gateway.
    #[serde(default = "default_imaging_base_url")]
    pub base_url: String,

    /// Timeout for individual imaging requests, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_imaging_base_url() -> String {
    "http://localhost:8000".into()
}

impl Default for ImagingSettings {
    fn default() -> Self {
        Self {
            base_url: default_imaging_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("radport.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., RADPORT__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("RADPORT")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}
