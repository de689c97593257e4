use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Simulated shipping time before a purchased bundle reaches the reseller.
    pub warehouse_listing_delay_seconds: u64,
    pub delivery_delay_seconds: u64,
    pub payment_latency_ms: u64,
    #[serde(default = "default_outbox_attempts")]
    pub trust_outbox_max_attempts: i32,
    #[serde(default = "default_outbox_poll")]
    pub trust_outbox_poll_seconds: u64,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_seconds: u64,
}

fn default_outbox_attempts() -> i32 { 5 }
fn default_outbox_poll() -> u64 { 5 }
fn default_reconcile_interval() -> u64 { 60 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            warehouse_listing_delay_seconds: 180,
            delivery_delay_seconds: 180,
            payment_latency_ms: 500,
            trust_outbox_max_attempts: default_outbox_attempts(),
            trust_outbox_poll_seconds: default_outbox_poll(),
            reconcile_interval_seconds: default_reconcile_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `REVIVE__SERVER__PORT=9000` sets `server.port`
            .add_source(config::Environment::with_prefix("REVIVE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rules_fill_optional_knobs() {
        let rules: BusinessRules = config::Config::builder()
            .set_override("warehouse_listing_delay_seconds", 60)
            .unwrap()
            .set_override("delivery_delay_seconds", 120)
            .unwrap()
            .set_override("payment_latency_ms", 0)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(rules.warehouse_listing_delay_seconds, 60);
        assert_eq!(rules.trust_outbox_max_attempts, 5);
        assert_eq!(rules.reconcile_interval_seconds, 60);
    }
}
