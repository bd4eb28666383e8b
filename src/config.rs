use std::env;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expires_hours: i64,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Runtime configuration, read once at startup and shared with handlers
/// through `web::Data`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtSettings,
    pub client_origins: Vec<String>,
    pub gemini: GeminiSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port_raw = var("PORT").unwrap_or_else(|| "5000".to_string());
        let port = port_raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            key: "PORT",
            value: port_raw.clone(),
        })?;

        let database_url = var("MONGO_URI")
            .or_else(|| var("DATABASE_URL"))
            .ok_or(ConfigError::Missing("MONGO_URI"))?;

        let secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                log::warn!("⚠️  JWT_SECRET not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let expires_raw = var("JWT_EXPIRES_HOURS").unwrap_or_else(|| "24".to_string());
        let expires_hours = expires_raw
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or(ConfigError::Invalid {
                key: "JWT_EXPIRES_HOURS",
                value: expires_raw.clone(),
            })?;

        let client_origins = parse_origins(
            &var("CLIENT_ORIGINS")
                .unwrap_or_else(|| "http://localhost:5173,http://localhost:3000".to_string()),
        );

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url,
            jwt: JwtSettings { secret, expires_hours },
            client_origins,
            gemini: GeminiSettings {
                api_key: var("GEMINI_API_KEY"),
                model: var("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
                base_url: var("GEMINI_API_BASE").unwrap_or_else(|| {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }),
            },
        })
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 5000,
        database_url: "mongodb://localhost:27017/travel_diary_test".to_string(),
        jwt: JwtSettings {
            secret: "test-secret".to_string(),
            expires_hours: 1,
        },
        client_origins: vec!["http://localhost:5173".to_string()],
        gemini: GeminiSettings {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "http://localhost:0".to_string(),
        },
    }
}
