//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

use rust_decimal::Decimal;

/// Longest accepted idempotency TTL (one year)
const MAX_IDEMPOTENCY_TTL_SECS: i64 = 365 * 24 * 60 * 60;

const DEFAULT_SEED_ACCOUNTS: &str = "ACC001:Main Account:10000,ACC002:Savings Account:5000";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Account opened at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAccount {
    pub id: String,
    pub name: String,
    pub balance: Decimal,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,

    /// Accepted bearer tokens as (holder id, token)
    pub auth_tokens: Vec<(String, String)>,

    pub seed_accounts: Vec<SeedAccount>,

    /// How long a completed idempotency key is remembered
    pub idempotency_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(_) => return Err(ConfigError::InvalidValue("LOG_FORMAT")),
        };

        let auth_tokens = match lookup("AUTH_TOKENS") {
            Some(raw) => parse_auth_tokens(&raw)?,
            None if environment == "production" => return Err(ConfigError::MissingEnv("AUTH_TOKENS")),
            None => vec![("dev-holder".to_string(), "dev-token".to_string())],
        };
        if auth_tokens.is_empty() {
            return Err(ConfigError::InvalidValue("AUTH_TOKENS"));
        }

        let seed_accounts = parse_seed_accounts(
            lookup("SEED_ACCOUNTS")
                .as_deref()
                .unwrap_or(DEFAULT_SEED_ACCOUNTS),
        )?;

        let idempotency_ttl_secs = lookup("IDEMPOTENCY_TTL_SECS")
            .unwrap_or_else(|| "86400".to_string())
            .parse::<i64>()
            .ok()
            .filter(|secs| (1..=MAX_IDEMPOTENCY_TTL_SECS).contains(secs))
            .ok_or(ConfigError::InvalidValue("IDEMPOTENCY_TTL_SECS"))?;

        Ok(Self {
            host,
            port,
            environment,
            log_format,
            auth_tokens,
            seed_accounts,
            idempotency_ttl_secs,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// `holder=token,holder=token`
fn parse_auth_tokens(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((holder, token)) if !holder.is_empty() && !token.is_empty() => {
                Ok((holder.to_string(), token.to_string()))
            }
            _ => Err(ConfigError::InvalidValue("AUTH_TOKENS")),
        })
        .collect()
}

/// `id:name:balance,id:name:balance`
fn parse_seed_accounts(raw: &str) -> Result<Vec<SeedAccount>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(id), Some(name), Some(balance)) if !id.is_empty() => Ok(SeedAccount {
                    id: id.to_string(),
                    name: name.to_string(),
                    balance: balance
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SEED_ACCOUNTS"))?,
                }),
                _ => Err(ConfigError::InvalidValue("SEED_ACCOUNTS")),
            }
        })
        .collect()
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.is_production());
        assert_eq!(config.auth_tokens.len(), 1);
        assert_eq!(config.idempotency_ttl_secs, 86400);
        assert_eq!(
            config.seed_accounts,
            vec![
                SeedAccount {
                    id: "ACC001".into(),
                    name: "Main Account".into(),
                    balance: dec!(10000)
                },
                SeedAccount {
                    id: "ACC002".into(),
                    name: "Savings Account".into(),
                    balance: dec!(5000)
                },
            ]
        );
    }

    #[test]
    fn test_production_requires_tokens() {
        let err = config_from(&[("ENVIRONMENT", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("AUTH_TOKENS")));

        let config = config_from(&[("ENVIRONMENT", "production"), ("AUTH_TOKENS", "ops=s3cret")]).unwrap();
        assert!(config.is_production());
        assert_eq!(config.auth_tokens, vec![("ops".to_string(), "s3cret".to_string())]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(config_from(&[("PORT", "abc")]), Err(ConfigError::InvalidValue("PORT"))));
        assert!(matches!(
            config_from(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidValue("LOG_FORMAT"))
        ));
        assert!(matches!(
            config_from(&[("AUTH_TOKENS", "no-separator")]),
            Err(ConfigError::InvalidValue("AUTH_TOKENS"))
        ));
        assert!(matches!(
            config_from(&[("AUTH_TOKENS", " , ")]),
            Err(ConfigError::InvalidValue("AUTH_TOKENS"))
        ));
        assert!(matches!(
            config_from(&[("SEED_ACCOUNTS", "ACC1:Name:lots")]),
            Err(ConfigError::InvalidValue("SEED_ACCOUNTS"))
        ));
    }

    #[test]
    fn test_idempotency_ttl_bounds() {
        for value in ["0", "-5", "31536001", "9300000000000000", "soon"] {
            assert!(
                matches!(
                    config_from(&[("IDEMPOTENCY_TTL_SECS", value)]),
                    Err(ConfigError::InvalidValue("IDEMPOTENCY_TTL_SECS"))
                ),
                "{value}"
            );
        }

        let config = config_from(&[("IDEMPOTENCY_TTL_SECS", "31536000")]).unwrap();
        assert_eq!(config.idempotency_ttl_secs, MAX_IDEMPOTENCY_TTL_SECS);
        let config = config_from(&[("IDEMPOTENCY_TTL_SECS", "1")]).unwrap();
        assert_eq!(config.idempotency_ttl_secs, 1);
    }

    #[test]
    fn test_seed_names_may_contain_spaces() {
        let config = config_from(&[("SEED_ACCOUNTS", "A:Joint Account:12.50, B::0")]).unwrap();
        assert_eq!(config.seed_accounts[0].name, "Joint Account");
        assert_eq!(config.seed_accounts[0].balance, dec!(12.50));
        assert_eq!(config.seed_accounts[1].name, "");
        assert_eq!(config.log_format, LogFormat::Text);
    }
}
