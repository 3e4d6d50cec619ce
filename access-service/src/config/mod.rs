use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub store: StoreConfig,
    pub analyzer: AnalyzerConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// When false the mock analyzer is used.
    pub enabled: bool,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl AnalyzerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// HS256 secret for bearer tokens. Unset means every caller is anonymous.
    pub jwt_secret: Option<String>,
}

impl AccessConfig {
    pub fn load() -> Result<Self, AppError> {
        let mut common_config = core_config::Config::load()?;
        if common_config.otlp_endpoint.is_none() {
            common_config.otlp_endpoint = env::var("OTLP_ENDPOINT").ok();
        }
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let backend: StoreBackend = get_env("ACCESS_STORE_BACKEND", Some("mongo"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let mongodb = match backend {
            StoreBackend::Mongo => Some(MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("access_db"), is_prod)?,
            }),
            StoreBackend::Memory => None,
        };

        Ok(AccessConfig {
            common: common_config,
            store: StoreConfig { backend, mongodb },
            analyzer: AnalyzerConfig {
                enabled: parse_env("ANALYZER_ENABLED", false)?,
                url: get_env("ANALYZER_URL", Some("http://localhost:11434"), false)?,
                model: get_env("ANALYZER_MODEL", Some("llama2"), false)?,
                timeout_secs: parse_env("ANALYZER_TIMEOUT_SECS", 5)?,
            },
            identity: IdentityConfig {
                jwt_secret: env::var("IDENTITY_JWT_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty()),
            },
        })
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}
