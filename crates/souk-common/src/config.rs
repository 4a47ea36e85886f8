//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`] or [`install`].
pub fn get() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call souk_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let app_config: AppConfig = builder()?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (SOUK_SERVER__PORT, SOUK_DATABASE__URL, etc.)
        .add_source(
            config::Environment::with_prefix("SOUK")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    Ok(CONFIG.get_or_init(|| app_config))
}

/// Install an already-built configuration as the global one.
///
/// The first installed config wins; later calls return the existing value.
pub fn install(cfg: AppConfig) -> &'static AppConfig {
    CONFIG.get_or_init(|| cfg)
}

/// Configuration built from defaults only, with the given database URL and JWT secret.
pub fn defaults(database_url: &str, jwt_secret: &str) -> Result<AppConfig, config::ConfigError> {
    builder()?
        .set_override("database.url", database_url)?
        .set_override("auth.jwt_secret", jwt_secret)?
        .build()?
        .try_deserialize()
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.gateway_port", 8081)?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 1)?
        .set_default("auth.access_token_ttl_secs", 3600)?
        .set_default("auth.refresh_token_ttl_secs", 2_592_000)? // 30 days
        .set_default("pricing.service_fee_bps", 500)? // 5%
        .set_default("pricing.delivery_fee", 150_000)? // NGN 1,500 in kobo
        .set_default("notifications.recent_offline_mins", 30)?
        .set_default("notifications.long_offline_hours", 24)?
        .set_default("notifications.presence_ttl_secs", 120)?
        .set_default("notifications.urgent_online_delay_mins", 5)?
        .set_default("notifications.high_online_delay_mins", 15)?
        .set_default("notifications.high_recent_delay_mins", 5)?
        .set_default("notifications.normal_recent_delay_mins", 30)?
        .set_default("notifications.normal_away_delay_mins", 10)?
        .set_default("notifications.low_long_delay_mins", 60)?
        .set_default("email.provider", "log")?
        .set_default("email.from_address", "Souk <no-reply@souk.local>")?
        .set_default("email.max_attempts", 5)?
        .set_default("email.retry_base_secs", 30)?
        .set_default("payments.webhook_secret", "")?
        .set_default("limits.max_list_items", 100)?
        .set_default("limits.max_page_size", 100)?
        .set_default("limits.max_message_length", 2000)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub pricing: PricingConfig,
    pub notifications: NotificationConfig,
    pub email: EmailConfig,
    pub payments: PaymentsConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Port of the WebSocket gateway that delivers push notifications.
    pub gateway_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `postgres://…` in production, `sqlite://…` for lite mode
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    /// Redis connection URL. Optional; presence falls back to an in-process map.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (HS256), should be 256+ bits of entropy
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    /// Service fee in basis points of the order subtotal.
    pub service_fee_bps: i64,
    /// Flat delivery fee in kobo.
    pub delivery_fee: i64,
}

/// Thresholds and delays for the email side of notification routing.
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Offline for less than this many minutes counts as "recently seen".
    pub recent_offline_mins: i64,
    /// Offline for at least this many hours counts as "long gone".
    pub long_offline_hours: i64,
    /// How long a presence heartbeat keeps a user online.
    pub presence_ttl_secs: u64,
    pub urgent_online_delay_mins: i64,
    pub high_online_delay_mins: i64,
    pub high_recent_delay_mins: i64,
    pub normal_recent_delay_mins: i64,
    pub normal_away_delay_mins: i64,
    pub low_long_delay_mins: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// `log` writes emails to the tracing log, `http` posts them to `api_url`.
    pub provider: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from_address: String,
    pub max_attempts: u32,
    pub retry_base_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    /// HMAC-SHA256 secret for `POST /payments/webhook`. Empty disables the webhook.
    pub webhook_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_list_items: u32,
    pub max_page_size: u32,
    pub max_message_length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_section() {
        let cfg = defaults("sqlite::memory:", "secret").unwrap();
        assert_eq!(cfg.database.url, "sqlite::memory:");
        assert_eq!(cfg.auth.jwt_secret, "secret");
        assert_eq!(cfg.pricing.service_fee_bps, 500);
        assert_eq!(cfg.notifications.recent_offline_mins, 30);
        assert_eq!(cfg.email.provider, "log");
        assert!(cfg.redis.url.is_none());
        assert!(cfg.email.api_url.is_none());
    }
}
