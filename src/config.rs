use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::webhook::DestinationField;

/// Main configuration for the sibyl service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub webhook: WebhookConfig,
    pub fees: FeeConfig,
    pub account_info: AccountInfoConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used for onboarding redirect targets.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Inbound webhook verification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Shared signing secret; never serialized or logged.
    #[serde(skip, default = "default_secret")]
    pub secret: SecretString,
    /// Maximum accepted age of a signed timestamp, in seconds.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: u64,
    /// Which charge field is authoritative for the payee account.
    #[serde(default)]
    pub destination_field: DestinationField,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeeConfig {
    /// Platform cut in basis points of 10000 (1000 = 10%).
    #[serde(default = "default_fee_bps")]
    pub platform_rate_bps: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountInfoConfig {
    /// Base URL of the account-information API.
    #[serde(default = "default_account_info_url")]
    pub base_url: String,
    /// Per-lookup timeout in milliseconds.
    #[serde(default = "default_account_info_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Connection URL; when absent the in-memory ledger backend is used.
    pub url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            webhook: WebhookConfig::default(),
            fees: FeeConfig::default(),
            account_info: AccountInfoConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            tolerance_secs: default_tolerance_secs(),
            destination_field: DestinationField::default(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            platform_rate_bps: default_fee_bps(),
        }
    }
}

impl Default for AccountInfoConfig {
    fn default() -> Self {
        Self {
            base_url: default_account_info_url(),
            timeout_ms: default_account_info_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_tolerance_secs() -> u64 {
    300
}

fn default_fee_bps() -> u32 {
    1_000
}

fn default_account_info_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_account_info_timeout_ms() -> u64 {
    3_000
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Read `SIBYL_<name>` from the environment.
fn get_env(name: &str) -> Option<String> {
    std::env::var(format!("SIBYL_{}", name)).ok()
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.public_url = url.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.config.webhook.secret = secret.into();
        self
    }

    pub fn with_webhook_tolerance_secs(mut self, secs: u64) -> Self {
        self.config.webhook.tolerance_secs = secs;
        self
    }

    pub fn with_destination_field(mut self, field: DestinationField) -> Self {
        self.config.webhook.destination_field = field;
        self
    }

    pub fn with_platform_rate_bps(mut self, bps: u32) -> Self {
        self.config.fees.platform_rate_bps = bps;
        self
    }

    pub fn with_account_info_url(mut self, url: impl Into<String>) -> Self {
        self.config.account_info.base_url = url.into();
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database.url = Some(url.into());
        self
    }

    /// Overlay settings from `SIBYL_*` environment variables.
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env("HOST") {
            self.config.server.host = host;
        }
        // Check SIBYL_PORT first, fall back to PORT (for PaaS compatibility)
        if let Some(port) = get_env("PORT").or_else(|| std::env::var("PORT").ok()) {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(public_url) = get_env("PUBLIC_URL") {
            self.config.server.public_url = public_url;
        }
        if let Some(level) = get_env("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(secret) = get_env("WEBHOOK_SECRET")
            .or_else(|| std::env::var("STRIPE_WEBHOOK_SECRET").ok())
        {
            self.config.webhook.secret = secret.into();
        }
        if let Some(tolerance) = get_env("WEBHOOK_TOLERANCE_SECS") {
            if let Ok(secs) = tolerance.parse() {
                self.config.webhook.tolerance_secs = secs;
            }
        }
        if let Some(field) = get_env("DESTINATION_FIELD") {
            if let Some(parsed) = DestinationField::parse(&field) {
                self.config.webhook.destination_field = parsed;
            } else {
                tracing::warn!(value = %field, "Unrecognized SIBYL_DESTINATION_FIELD, keeping default");
            }
        }
        if let Some(bps) = get_env("PLATFORM_FEE_BPS") {
            if let Ok(rate) = bps.parse() {
                self.config.fees.platform_rate_bps = rate;
            }
        }
        if let Some(url) = get_env("ACCOUNT_INFO_URL") {
            self.config.account_info.base_url = url;
        }
        if let Some(timeout) = get_env("ACCOUNT_INFO_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.config.account_info.timeout_ms = ms;
            }
        }
        if let Some(url) = get_env("DATABASE_URL").or_else(|| std::env::var("DATABASE_URL").ok()) {
            self.config.database.url = Some(url);
        }
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.webhook.tolerance_secs, 300);
        assert_eq!(config.fees.platform_rate_bps, 1_000);
        assert_eq!(
            config.webhook.destination_field,
            DestinationField::DestinationAccount
        );
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .with_host("127.0.0.1")
            .with_port(9100)
            .with_webhook_secret("whsec_test".to_string())
            .with_platform_rate_bps(250)
            .with_destination_field(DestinationField::OnBehalfOf)
            .with_database_url("sqlite::memory:")
            .build();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.fees.platform_rate_bps, 250);
        assert_eq!(config.webhook.destination_field, DestinationField::OnBehalfOf);
        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn test_server_addr() {
        let config = ConfigBuilder::new().with_host("127.0.0.1").with_port(8081).build();
        let addr = config.server.addr().unwrap();
        assert_eq!(addr.port(), 8081);
    }
}
