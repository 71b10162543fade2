//! API configuration

use serde::Deserialize;

use domain_ledger::PostingPolicy;

/// API configuration
///
/// Every field can be overridden by a `LEDGER_`-prefixed environment
/// variable, e.g. `LEDGER_PORT=9000` or `LEDGER_REQUIRE_PERIOD=false`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// PostgreSQL URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Maximum pool connections
    pub database_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Refuse postings whose date no period covers
    pub require_period: bool,
    /// Refuse postings to inactive accounts
    pub reject_inactive_accounts: bool,
    /// Post standalone entries only after approval
    pub require_entry_approval: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: None,
            database_max_connections: 10,
            log_level: "info".to_string(),
            json_logs: false,
            require_period: true,
            reject_inactive_accounts: true,
            require_entry_approval: false,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn posting_policy(&self) -> PostingPolicy {
        PostingPolicy {
            require_period: self.require_period,
            reject_inactive_accounts: self.reject_inactive_accounts,
            require_entry_approval: self.require_entry_approval,
        }
    }
}
