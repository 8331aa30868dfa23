use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    Config, DatabaseConfig, LoggingConfig, ServerConfig, ShopifyConfig, TelegramConfig,
    TrackerSettings,
};

/// Environment variables that feed secrets into the configuration, keyed by config path.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("shopify.store", "SHOPIFY_STORE"),
    ("shopify.access_token", "SHOPIFY_ACCESS_TOKEN"),
    ("telegram.token", "TELEGRAM_BOT_TOKEN"),
    ("telegram.chat_id", "TELEGRAM_CHAT_ID"),
    ("database.url", "DATABASE_URL"),
];

/// Loads the application configuration from a TOML file.
///
/// Values are layered, later sources winning: the file itself, then any `PACER_*`
/// environment variables (`PACER_TRACKER__FETCH_MODE=ACTIVE_ONLY`), then the plain
/// secret variables listed in `ENV_OVERRIDES`. A `.env` file in the working directory
/// is loaded first if present.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let mut builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("PACER")
                .prefix_separator("_")
                .separator("__"),
        );

    for (key, var) in ENV_OVERRIDES {
        let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(*key, value)?;
    }

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.build()?.try_deserialize::<Config>()?;

    Ok(config)
}
