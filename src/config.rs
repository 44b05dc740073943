use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_path: String,

    // HTTP
    pub port: u16,

    // Security
    pub token_secret: String,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Storage
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "language_links.db".to_string()),

            // HTTP
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            // Security - secret backing the anti-forgery tokens
            token_secret: std::env::var("TOKEN_SECRET").context("TOKEN_SECRET not set")?,
            api_key: std::env::var("API_KEY").ok().filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("DATABASE_PATH");
        std::env::remove_var("PORT");
        std::env::remove_var("TOKEN_SECRET");
        std::env::remove_var("API_KEY");
    }

    #[test]
    #[serial]
    fn test_from_env_requires_token_secret() {
        clear_env();

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("TOKEN_SECRET not set"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("TOKEN_SECRET", "test-secret");

        let config = Config::from_env().expect("config");
        assert_eq!(config.database_path, "language_links.db");
        assert_eq!(config.port, 8080);
        assert!(config.api_key.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("TOKEN_SECRET", "test-secret");
        std::env::set_var("DATABASE_PATH", "/tmp/links.db");
        std::env::set_var("PORT", "9090");
        std::env::set_var("API_KEY", "admin-key");

        let config = Config::from_env().expect("config");
        assert_eq!(config.database_path, "/tmp/links.db");
        assert_eq!(config.port, 9090);
        assert_eq!(config.api_key.as_deref(), Some("admin-key"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port_falls_back() {
        clear_env();
        std::env::set_var("TOKEN_SECRET", "test-secret");
        std::env::set_var("PORT", "not-a-number");

        let config = Config::from_env().expect("config");
        assert_eq!(config.port, 8080);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_blank_api_key_is_none() {
        clear_env();
        std::env::set_var("TOKEN_SECRET", "test-secret");
        std::env::set_var("API_KEY", "");

        let config = Config::from_env().expect("config");
        assert!(config.api_key.is_none());

        clear_env();
    }
}
