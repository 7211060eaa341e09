use std::{env, net::SocketAddr};

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_JWT_ISSUER: &str = "todo-notes-backend";
const DEFAULT_JWT_AUDIENCE: &str = "todo-notes-frontend";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub tls_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    /// Origin the emailed links point at.
    pub base_url: String,
    pub bind_addr: SocketAddr,
    pub auth_cookie_secure: bool,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub smtp: SmtpSettings,
    pub log_format: LogFormat,
    pub rate_limit_auth_seconds: u64,
    pub rate_limit_auth_burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = required("DATABASE_URL")?;
        let frontend_origin = required("FRONTEND_ORIGIN")?;
        let base_url = optional("BASE_URL").unwrap_or_else(|| frontend_origin.clone());

        let bind_addr = parse_or("BIND_ADDR", optional("BIND_ADDR"), || {
            DEFAULT_BIND_ADDR.parse().ok()
        })?;

        let smtp = SmtpSettings {
            host: required("SMTP_HOST")?,
            port: parse_or("SMTP_PORT", optional("SMTP_PORT"), || Some(587))?,
            username: optional("SMTP_USERNAME"),
            password: optional("SMTP_PASSWORD"),
            from: required("SMTP_FROM")?,
            tls_disabled: flag(optional("SMTP_TLS_DISABLED"), false),
        };

        let log_format = match optional("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            database_url,
            frontend_origin,
            base_url,
            bind_addr,
            auth_cookie_secure: flag(optional("AUTH_COOKIE_SECURE"), true),
            jwt_issuer: optional("JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.into()),
            jwt_audience: optional("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.into()),
            smtp,
            log_format,
            rate_limit_auth_seconds: parse_or(
                "RATE_LIMITER_AUTH_SECONDS",
                optional("RATE_LIMITER_AUTH_SECONDS"),
                || Some(1),
            )?,
            rate_limit_auth_burst: parse_or(
                "RATE_LIMITER_AUTH_BURST",
                optional("RATE_LIMITER_AUTH_BURST"),
                || Some(10),
            )?,
        })
    }
}

fn parse_or<T, D>(key: &'static str, value: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    D: FnOnce() -> Option<T>,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
        }),
        None => default().ok_or(ConfigError::Missing(key)),
    }
}

fn flag(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/notes"),
            ("FRONTEND_ORIGIN", "http://localhost:5173"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM", "noreply@example.com"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn applies_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.base_url, "http://localhost:5173");
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.smtp.port, 587);
        assert!(!config.smtp.tls_disabled);
        assert!(config.auth_cookie_secure);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.rate_limit_auth_burst, 10);
    }

    #[test]
    fn reads_overrides() {
        let mut vars = base_env();
        vars.insert("BASE_URL", "https://notes.example.com");
        vars.insert("SMTP_PORT", "2525");
        vars.insert("SMTP_TLS_DISABLED", "TRUE");
        vars.insert("AUTH_COOKIE_SECURE", "false");
        vars.insert("LOG_FORMAT", "json");
        vars.insert("BIND_ADDR", "0.0.0.0:8080");

        let config = load(&vars).unwrap();
        assert_eq!(config.base_url, "https://notes.example.com");
        assert_eq!(config.smtp.port, 2525);
        assert!(config.smtp.tls_disabled);
        assert!(!config.auth_cookie_secure);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn missing_database_url_is_reported() {
        let mut vars = base_env();
        vars.remove("DATABASE_URL");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn invalid_port_is_reported() {
        let mut vars = base_env();
        vars.insert("SMTP_PORT", "not-a-port");
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid { key: "SMTP_PORT", .. }
        ));
    }
}
