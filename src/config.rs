// Server configuration, read from environment variables with development
// defaults. The JWT fallback secret exists so a dev checkout runs without
// setup; production deployments must set CANVASS_JWT_SECRET.

/// Runtime configuration for the server and CLI.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite database path
    pub db_path: String,
    /// Bind address, e.g. "0.0.0.0:3000"
    pub bind_addr: String,
    /// Shared secret for signing session tokens
    pub jwt_secret: String,
    /// Session token lifetime in seconds
    pub token_ttl_secs: i64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: env_or("CANVASS_DB", "canvass.db"),
            bind_addr: env_or("CANVASS_ADDR", "0.0.0.0:3000"),
            jwt_secret: env_or("CANVASS_JWT_SECRET", "fallback-secret-do-not-use-in-production"),
            token_ttl_secs: env_or("CANVASS_TOKEN_TTL", "86400")
                .parse()
                .unwrap_or(86400),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "canvass.db".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: "fallback-secret-do-not-use-in-production".to_string(),
            token_ttl_secs: 86400,
        }
    }
}
