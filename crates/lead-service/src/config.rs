//! Configuration management for the Lead Service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use axum::http::HeaderName;
use leads_common::Identity;
use std::env;

/// Default header carrying the verified caller identity
pub const DEFAULT_IDENTITY_HEADER: &str = "x-caller-identity";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL; in-memory storage when absent
    pub redis_url: Option<String>,

    /// Identities granted the admin role at startup
    pub admins: Vec<Identity>,

    /// Header set by the upstream identity layer
    pub identity_header: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            host: lookup("LEADS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: lookup("LEADS_PORT")
                .unwrap_or_else(|| "8090".to_string())
                .parse()
                .context("Invalid LEADS_PORT")?,

            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),

            admins: lookup("LEADS_ADMINS")
                .map(|list| parse_identities(&list))
                .unwrap_or_default(),

            identity_header: lookup("IDENTITY_HEADER")
                .unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_string())
                .to_ascii_lowercase(),
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("LEADS_PORT must be greater than 0");
        }

        self.identity_header_name()?;

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed identity header
    pub fn identity_header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.identity_header.as_bytes())
            .with_context(|| format!("Invalid IDENTITY_HEADER: {}", self.identity_header))
    }
}

fn parse_identities(list: &str) -> Vec<Identity> {
    list.split(',')
        .map(Identity::new)
        .filter(|identity| !identity.is_anonymous())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).expect("Failed to load config");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8090);
        assert_eq!(config.redis_url, None);
        assert!(config.admins.is_empty());
        assert_eq!(config.identity_header, DEFAULT_IDENTITY_HEADER);
    }

    #[test]
    fn test_api_address() {
        let config = load(&[("LEADS_HOST", "127.0.0.1"), ("LEADS_PORT", "9000")]).unwrap();
        assert_eq!(config.api_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_admin_list_parsing() {
        let config = load(&[("LEADS_ADMINS", "alice, bob,,2vxsx-fae")]).unwrap();
        assert_eq!(
            config.admins,
            vec![Identity::from("alice"), Identity::from("bob")]
        );
    }

    #[test]
    fn test_blank_redis_url_means_memory() {
        let config = load(&[("REDIS_URL", " ")]).unwrap();
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn test_validate_invalid_port() {
        let result = load(&[("LEADS_PORT", "0")]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("LEADS_PORT must be greater than 0"));

        assert!(load(&[("LEADS_PORT", "http")]).is_err());
    }

    #[test]
    fn test_validate_invalid_header() {
        assert!(load(&[("IDENTITY_HEADER", "not a header")]).is_err());
        let config = load(&[("IDENTITY_HEADER", "X-Principal")]).unwrap();
        assert_eq!(
            config.identity_header_name().unwrap(),
            HeaderName::from_static("x-principal")
        );
    }
}
