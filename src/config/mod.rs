use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest request body accepted by the upload endpoints, in bytes.
    /// Must exceed `upload.max_file_size` so oversize files reach admission
    /// and get a proper rejection message.
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_request_size: default_max_request_size(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_request_size() -> usize {
    128 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// AWS region of the user pool
    #[serde(default = "default_region")]
    pub region: String,
    /// User pool id; when set, the token issuer must match it
    #[serde(default)]
    pub user_pool_id: Option<String>,
    /// App client id used for USER_PASSWORD_AUTH
    #[serde(default)]
    pub client_id: String,
    /// Override of the identity provider endpoint (local stacks, tests)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Claim that carries group membership in the id token
    #[serde(default = "default_groups_claim")]
    pub groups_claim: String,
    /// Group granting admin capability
    #[serde(default = "default_admin_group")]
    pub admin_group: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            user_pool_id: None,
            client_id: String::new(),
            endpoint: None,
            groups_claim: default_groups_claim(),
            admin_group: default_admin_group(),
        }
    }
}

impl IdentityConfig {
    /// Endpoint of the identity provider JSON API.
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com/", self.region))
    }

    /// Expected `iss` claim, when a user pool is configured.
    pub fn issuer(&self) -> Option<String> {
        self.user_pool_id.as_ref().map(|pool| {
            format!("https://cognito-idp.{}.amazonaws.com/{}", self.region, pool)
        })
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_groups_claim() -> String {
    "cognito:groups".to_string()
}

fn default_admin_group() -> String {
    "Admin".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the gallery REST API
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub cookie_domain: Option<String>,
    #[serde(default)]
    pub secure_cookie: bool,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
    /// How often expired sessions and their staged uploads are dropped
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_domain: None,
            secure_cookie: false,
            login_path: default_login_path(),
            admin_prefix: default_admin_prefix(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_cookie_name() -> String {
    "authToken".to_string()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes (default: 10 MiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            accepted_types: default_accepted_types(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_accepted_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// Overlay values supplied through the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup("CURATOR_AWS_REGION") {
            self.identity.region = region;
        }
        if let Some(pool) = lookup("CURATOR_USER_POOL_ID") {
            self.identity.user_pool_id = Some(pool);
        }
        if let Some(client_id) = lookup("CURATOR_USER_POOL_CLIENT_ID") {
            self.identity.client_id = client_id;
        }
        if let Some(endpoint) = lookup("CURATOR_IDENTITY_ENDPOINT") {
            self.identity.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup("CURATOR_API_ENDPOINT") {
            self.api.endpoint = endpoint;
        }
        if let Some(domain) = lookup("CURATOR_COOKIE_DOMAIN") {
            self.session.cookie_domain = Some(domain);
        }
        if let Some(secure) = lookup("CURATOR_COOKIE_SECURE") {
            self.session.secure_cookie = matches!(secure.as_str(), "1" | "true" | "yes");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            bail!("api.endpoint is required (or set CURATOR_API_ENDPOINT)");
        }
        if !self.api.endpoint.starts_with("http://") && !self.api.endpoint.starts_with("https://") {
            bail!("api.endpoint must be an http(s) URL");
        }
        if self.identity.client_id.trim().is_empty() {
            bail!("identity.client_id is required (or set CURATOR_USER_POOL_CLIENT_ID)");
        }
        if !self.session.admin_prefix.starts_with('/') {
            bail!("session.admin_prefix must start with '/'");
        }
        if self.session.login_path.starts_with(&self.session.admin_prefix) {
            bail!("session.login_path must not live under the admin prefix");
        }
        if self.session.sweep_interval_secs == 0 {
            bail!("session.sweep_interval_secs must be greater than zero");
        }
        if self.server.max_request_size as u64 <= self.upload.max_file_size {
            bail!("server.max_request_size must exceed upload.max_file_size");
        }
        Ok(())
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            identity: IdentityConfig::default(),
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            upload: UploadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> Config {
        let mut config = Config::default();
        config.api.endpoint = "https://api.example.com".to_string();
        config.identity.client_id = "client".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.cookie_name, "authToken");
        assert_eq!(config.session.login_path, "/auth/login");
        assert_eq!(config.session.admin_prefix, "/admin");
        assert_eq!(config.session.sweep_interval_secs, 60);
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.upload.accepted_types.len(), 3);
        assert_eq!(config.identity.groups_claim, "cognito:groups");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [api]
            endpoint = "https://api.example.com"

            [identity]
            region = "eu-west-1"
            client_id = "abc"
            user_pool_id = "eu-west-1_pool"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.identity.region, "eu-west-1");
        assert_eq!(
            config.identity.issuer().as_deref(),
            Some("https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_pool")
        );
        assert_eq!(
            config.identity.endpoint_url(),
            "https://cognito-idp.eu-west-1.amazonaws.com/"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_file_parses() {
        let config = Config::from_toml(include_str!("../../curator.example.toml")).unwrap();
        assert_eq!(config.session.cookie_name, "authToken");
        assert!(config.session.secure_cookie);
        assert_eq!(config.upload.accepted_types.len(), 3);
        // the example ships without a client id
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CURATOR_AWS_REGION", "ap-south-1"),
            ("CURATOR_USER_POOL_CLIENT_ID", "from-env"),
            ("CURATOR_API_ENDPOINT", "https://env.example.com"),
            ("CURATOR_COOKIE_DOMAIN", "example.com"),
            ("CURATOR_COOKIE_SECURE", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.identity.region, "ap-south-1");
        assert_eq!(config.identity.client_id, "from-env");
        assert_eq!(config.api.endpoint, "https://env.example.com");
        assert_eq!(config.session.cookie_domain.as_deref(), Some("example.com"));
        assert!(config.session.secure_cookie);
    }

    #[test]
    fn test_validate_rejects_missing_endpoint() {
        let mut config = valid();
        config.api.endpoint = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_client_id() {
        let mut config = valid();
        config.identity.client_id = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_login_under_admin_prefix() {
        let mut config = valid();
        config.session.login_path = "/admin/login".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sweep_interval() {
        let mut config = valid();
        config.session.sweep_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_request_size_must_exceed_file_size() {
        let mut config = valid();
        config.server.max_request_size = 1024;
        assert!(config.validate().is_err());
    }
}
