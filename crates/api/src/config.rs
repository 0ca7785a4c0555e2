use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub api_key: String,
    pub bind: String,
    pub body_limit_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("PACKWISE_DATABASE_URL")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            api_key: env::var("PACKWISE_API_KEY").unwrap_or_else(|_| "dev-packwise-key".to_string()),
            bind: env::var("PACKWISE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            body_limit_bytes: env::var("PACKWISE_BODY_LIMIT_BYTES")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(256 * 1024),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            api_key: "dev-packwise-key".to_string(),
            bind: "0.0.0.0:8080".to_string(),
            body_limit_bytes: 256 * 1024,
        }
    }
}
