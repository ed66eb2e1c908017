use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub promo: PromoSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    /// `production` makes a missing integrity secret fatal.
    pub environment: String,
    pub cors_origins: Vec<String>,
}

impl AppSettings {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromoSettings {
    pub integrity_secret: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_attempts: u32,
    pub max_batch_size: u32,
    pub generation_retries: u32,
    pub transaction_retries: u32,
}

impl Default for PromoSettings {
    fn default() -> Self {
        Self {
            integrity_secret: None,
            rate_limit_window_secs: 15 * 60,
            rate_limit_max_attempts: 5,
            max_batch_size: 100,
            generation_retries: 5,
            transaction_retries: 3,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("PROMOKIT"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.environment", "development")?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017/?replicaSet=rs0")?
            .set_default("database.name", "promokit")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.issuer", "promokit")?
            .set_default("promo.rate_limit_window_secs", 900)?
            .set_default("promo.rate_limit_max_attempts", 5)?
            .set_default("promo.max_batch_size", 100)?
            .set_default("promo.generation_retries", 5)?
            .set_default("promo.transaction_retries", 3)?
            .build()?;

        config.try_deserialize()
    }
}
