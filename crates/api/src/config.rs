use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development except
/// the external-service credentials, which must be provided. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `90`, above the polling ceiling).
    pub request_timeout_secs: u64,
    /// JWT validation configuration (secret).
    pub jwt: JwtConfig,
    /// HMAC secret for the payment webhook. `None` means misconfigured: the
    /// handler answers 500 rather than accepting unsigned events.
    pub payment_webhook_secret: Option<String>,
    /// HMAC secret for the identity webhook.
    pub identity_webhook_secret: Option<String>,
    /// Inference provider settings.
    pub inference: InferenceConfig,
    /// Fast-store settings (rate limiter + free-credit marker). `None`
    /// disables admission control (fail-open) and the free pool.
    pub fast_store: Option<FastStoreConfig>,
}

/// Connection settings for the restoration inference provider.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base HTTP URL of the provider API.
    pub api_url: String,
    /// Bearer token for the provider account.
    pub api_token: String,
    /// Pinned restoration model version identifier.
    pub model_version: String,
}

/// Connection settings for the Redis-over-HTTP fast store.
#[derive(Debug, Clone)]
pub struct FastStoreConfig {
    pub url: String,
    pub token: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default     |
    /// |----------------------------|-------------|
    /// | `HOST`                     | `0.0.0.0`   |
    /// | `PORT`                     | `3000`      |
    /// | `CORS_ORIGINS`             | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`     | `90`        |
    /// | `JWT_SECRET`               | required    |
    /// | `PAYMENT_WEBHOOK_SECRET`   | unset       |
    /// | `IDENTITY_WEBHOOK_SECRET`  | unset       |
    /// | `INFERENCE_API_URL`        | required    |
    /// | `INFERENCE_API_TOKEN`      | required    |
    /// | `INFERENCE_MODEL_VERSION`  | required    |
    /// | `FAST_STORE_URL`           | unset       |
    /// | `FAST_STORE_TOKEN`         | unset       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "90".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let inference = InferenceConfig {
            api_url: std::env::var("INFERENCE_API_URL")
                .expect("INFERENCE_API_URL must be set in the environment"),
            api_token: std::env::var("INFERENCE_API_TOKEN")
                .expect("INFERENCE_API_TOKEN must be set in the environment"),
            model_version: std::env::var("INFERENCE_MODEL_VERSION")
                .expect("INFERENCE_MODEL_VERSION must be set in the environment"),
        };

        let fast_store = match (
            std::env::var("FAST_STORE_URL"),
            std::env::var("FAST_STORE_TOKEN"),
        ) {
            (Ok(url), Ok(token)) => Some(FastStoreConfig { url, token }),
            _ => None,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            payment_webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").ok(),
            identity_webhook_secret: std::env::var("IDENTITY_WEBHOOK_SECRET").ok(),
            inference,
            fast_store,
        }
    }
}
