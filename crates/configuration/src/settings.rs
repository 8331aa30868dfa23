use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::{FetchMode, TargetRatios};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerSettings,
    /// Target share per category, in percent. Defaults to the jewelry mix.
    #[serde(default)]
    pub target_ratios: TargetRatios,
    #[serde(default)]
    pub shopify: ShopifyConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Parameters for a single tracking run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub fetch_mode: FetchMode,
    /// The creation date to query the catalog for. Defaults to the run date.
    pub target_date: Option<NaiveDate>,
    /// Allowed distance, in percentage points, between a category's share and its target.
    pub tolerance: Decimal,
    /// Root folder for the per-run snapshot exports.
    pub report_dir: PathBuf,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            fetch_mode: FetchMode::default(),
            target_date: None,
            tolerance: dec!(5.0),
            report_dir: PathBuf::from("reports"),
        }
    }
}

/// Connection details for the Shopify Admin REST API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShopifyConfig {
    /// The shop domain, e.g. "my-shop.myshopify.com".
    pub store: String,
    pub access_token: String,
    pub api_version: String,
    /// Products requested per page. Shopify caps this at 250.
    pub page_limit: u32,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            store: String::new(),
            access_token: String::new(),
            api_version: "2024-10".to_string(),
            page_limit: 250,
        }
    }
}

impl ShopifyConfig {
    /// Fails when the store domain or access token is missing.
    pub fn ensure_credentials(&self) -> Result<(), ConfigError> {
        if self.store.trim().is_empty() || self.access_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Missing Shopify store or access token (set SHOPIFY_STORE and SHOPIFY_ACCESS_TOKEN).".to_string(),
            ));
        }
        Ok(())
    }
}

/// Credentials for the Telegram alert channel. Empty values disable alerting.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Falls back to the `DATABASE_URL` environment variable when unset.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub log_dir: PathBuf,
    pub file_name: String,
    /// Also write a per-run log file under `log_dir`.
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            file_name: "inventory_pacer.log".to_string(),
            file_output: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

impl Config {
    /// Checks the settings that every command relies on.
    ///
    /// Hard failures are returned as errors. A target-ratio table that does not add up
    /// to 100 is only a warning: it is logged and returned, and analysis still runs
    /// with the configured values as-is.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        if self.target_ratios.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one target ratio must be configured.".to_string(),
            ));
        }
        if let Some((category, ratio)) = self.target_ratios.iter().find(|(_, r)| r.is_sign_negative()) {
            return Err(ConfigError::ValidationError(format!(
                "Target ratio for '{category}' must not be negative (got {ratio})."
            )));
        }
        if self.tracker.tolerance < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "Tolerance must not be negative (got {}).",
                self.tracker.tolerance
            )));
        }

        let mut warnings = Vec::new();
        if !self.target_ratios.sums_to_hundred() {
            let message = format!("Target ratios sum to {}%, not 100%", self.target_ratios.sum());
            tracing::warn!("{}", message);
            warnings.push(message);
        }
        Ok(warnings)
    }
}
