use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_days: i64,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub client_base_url: String,
    /// Base used when building public avatar URLs
    pub public_base_url: String,
    pub storage_dir: String,
    pub avatar_max_bytes: usize,
    pub bcrypt_cost: u32,
    pub context_cache_ttl_seconds: u64,
    pub require_email_confirmation: bool,
    pub auth_rate_limit_max_requests: u32,
    pub auth_rate_limit_window_seconds: i64,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        let host = var_or("HOST", "127.0.0.1");
        let port: u16 = parsed_or("PORT", 8080);

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite:./shiftscheduler.db"),
            jwt_secret: var_or(
                "JWT_SECRET",
                "your-super-secret-jwt-key-change-this-in-production-12345",
            ),
            jwt_expiration_days: parsed_or("JWT_EXPIRATION_DAYS", 7),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://{}:{}", host, port)),
            host,
            port,
            environment: var_or("ENVIRONMENT", "development"),
            client_base_url: var_or("CLIENT_BASE_URL", "http://localhost:3000"),
            storage_dir: var_or("STORAGE_DIR", "./storage"),
            avatar_max_bytes: parsed_or("AVATAR_MAX_BYTES", 2 * 1024 * 1024),
            bcrypt_cost: parsed_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            context_cache_ttl_seconds: parsed_or("CONTEXT_CACHE_TTL_SECONDS", 300),
            require_email_confirmation: parsed_or("REQUIRE_EMAIL_CONFIRMATION", false),
            auth_rate_limit_max_requests: parsed_or("AUTH_RATE_LIMIT_MAX_REQUESTS", 10),
            auth_rate_limit_window_seconds: parsed_or("AUTH_RATE_LIMIT_WINDOW_SECONDS", 300),
        })
    }

    /// Settings for tests: cheap password hashing and a throwaway store
    pub fn test_config(database_url: &str, storage_dir: &str) -> Self {
        Config {
            database_url: database_url.to_string(),
            jwt_secret: "test-jwt-secret-key-that-is-long-enough".to_string(),
            jwt_expiration_days: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            client_base_url: "http://localhost:3000".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            storage_dir: storage_dir.to_string(),
            avatar_max_bytes: 64 * 1024,
            bcrypt_cost: 4,
            context_cache_ttl_seconds: 60,
            require_email_confirmation: false,
            auth_rate_limit_max_requests: 1000,
            auth_rate_limit_window_seconds: 60,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
