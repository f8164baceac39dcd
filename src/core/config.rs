use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

/// Default ClearNode endpoint
pub const CLEARNODE_URL: &str = "wss://clearnet.yellow.com/ws";
/// Application identifier announced during the auth handshake
pub const DEFAULT_APPLICATION: &str = "brocrunch";
/// Scope announced during the auth handshake
pub const DEFAULT_SCOPE: &str = "console";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ClearNodeConfig {
    pub node_url: String,
    pub private_key: Secret<String>,
    pub application_address: String,
    pub application: String,
    pub scope: String,
    pub session_ttl_secs: u64,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub fail_pending_on_close: bool,
}

// Custom Serialize implementation - never expose the private key
impl Serialize for ClearNodeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClearNodeConfig", 9)?;
        state.serialize_field("node_url", &self.node_url)?;
        state.serialize_field("private_key", "[REDACTED]")?;
        state.serialize_field("application_address", &self.application_address)?;
        state.serialize_field("application", &self.application)?;
        state.serialize_field("scope", &self.scope)?;
        state.serialize_field("session_ttl_secs", &self.session_ttl_secs)?;
        state.serialize_field("request_timeout_ms", &self.request_timeout_ms)?;
        state.serialize_field("connect_timeout_ms", &self.connect_timeout_ms)?;
        state.serialize_field("fail_pending_on_close", &self.fail_pending_on_close)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ClearNodeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ClearNodeConfigHelper {
            #[serde(default = "default_node_url")]
            node_url: String,
            private_key: String,
            #[serde(default)]
            application_address: String,
            #[serde(default = "default_application")]
            application: String,
            #[serde(default = "default_scope")]
            scope: String,
            #[serde(default = "default_session_ttl")]
            session_ttl_secs: u64,
            #[serde(default = "default_request_timeout")]
            request_timeout_ms: u64,
            #[serde(default = "default_connect_timeout")]
            connect_timeout_ms: u64,
            #[serde(default)]
            fail_pending_on_close: bool,
        }

        let helper = ClearNodeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            node_url: helper.node_url,
            private_key: Secret::new(helper.private_key),
            application_address: helper.application_address,
            application: helper.application,
            scope: helper.scope,
            session_ttl_secs: helper.session_ttl_secs,
            request_timeout_ms: helper.request_timeout_ms,
            connect_timeout_ms: helper.connect_timeout_ms,
            fail_pending_on_close: helper.fail_pending_on_close,
        })
    }
}

fn default_node_url() -> String {
    CLEARNODE_URL.to_string()
}

fn default_application() -> String {
    DEFAULT_APPLICATION.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

const fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

const fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl ClearNodeConfig {
    /// Create a configuration for the default node with the given signing key
    #[must_use]
    pub fn new(private_key: String) -> Self {
        Self {
            node_url: default_node_url(),
            private_key: Secret::new(private_key),
            application_address: String::new(),
            application: default_application(),
            scope: default_scope(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            fail_pending_on_close: false,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_PRIVATE_KEY` (e.g., `CLEARNODE_PRIVATE_KEY`)
    /// - `{PREFIX}_NODE_URL` (optional)
    /// - `{PREFIX}_APPLICATION_ADDRESS` (optional)
    /// - `{PREFIX}_APPLICATION` (optional)
    /// - `{PREFIX}_SCOPE` (optional)
    /// - `{PREFIX}_REQUEST_TIMEOUT_MS` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let key_var = format!("{}_PRIVATE_KEY", prefix);

        let private_key =
            env::var(&key_var).map_err(|_| ConfigError::MissingEnvironmentVariable(key_var))?;

        let mut config = Self::new(private_key);

        if let Ok(url) = env::var(format!("{}_NODE_URL", prefix)) {
            config.node_url = url;
        }
        if let Ok(address) = env::var(format!("{}_APPLICATION_ADDRESS", prefix)) {
            config.application_address = address;
        }
        if let Ok(application) = env::var(format!("{}_APPLICATION", prefix)) {
            config.application = application;
        }
        if let Ok(scope) = env::var(format!("{}_SCOPE", prefix)) {
            config.scope = scope;
        }

        let timeout_var = format!("{}_REQUEST_TIMEOUT_MS", prefix);
        if let Ok(raw) = env::var(&timeout_var) {
            config.request_timeout_ms = raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!("{}: {}", timeout_var, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no file is fine, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Reject configurations that can never produce a working session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.node_url.starts_with("ws://") || self.node_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "node_url must be a ws:// or wss:// URL, got '{}'",
                self.node_url
            )));
        }
        if !self.has_credentials() {
            return Err(ConfigError::InvalidConfiguration(
                "private_key is empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.private_key.expose_secret().trim().is_empty()
    }

    #[must_use]
    pub fn node_url(mut self, node_url: impl Into<String>) -> Self {
        self.node_url = node_url.into();
        self
    }

    #[must_use]
    pub fn application_address(mut self, address: impl Into<String>) -> Self {
        self.application_address = address.into();
        self
    }

    #[must_use]
    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub const fn session_ttl_secs(mut self, secs: u64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    #[must_use]
    pub const fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn fail_pending_on_close(mut self, enabled: bool) -> Self {
        self.fail_pending_on_close = enabled;
        self
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Get the private key (use carefully - exposes secret)
    pub fn private_key(&self) -> &str {
        self.private_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_defaults() {
        let config = ClearNodeConfig::new(KEY.to_string());
        assert_eq!(config.node_url, CLEARNODE_URL);
        assert_eq!(config.application, DEFAULT_APPLICATION);
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.request_timeout(), Duration::from_millis(15_000));
        assert!(!config.fail_pending_on_close);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_redacts_private_key() {
        let config = ClearNodeConfig::new(KEY.to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("ac0974bec39a"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ClearNodeConfig =
            serde_json::from_str(&format!(r#"{{"private_key":"{}"}}"#, KEY)).unwrap();
        assert_eq!(config.private_key(), KEY);
        assert_eq!(config.node_url, CLEARNODE_URL);
        assert_eq!(config.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
    }

    #[test]
    fn test_validate_rejects_bad_url_and_empty_key() {
        let config = ClearNodeConfig::new(KEY.to_string()).node_url("https://example.com");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfiguration(_))
        ));

        let config = ClearNodeConfig::new("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_missing_key() {
        let result = ClearNodeConfig::from_env("CLEARNODE_TEST_MISSING_PREFIX");
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvironmentVariable(var))
                if var == "CLEARNODE_TEST_MISSING_PREFIX_PRIVATE_KEY"
        ));
    }
}
