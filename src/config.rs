use std::time::Duration;

use crate::batch::DEFAULT_MAX_WORKERS;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_workers: usize,
    pub fetch_timeout: Duration,
    pub insecure_ssl: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = get("HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = number(&get, "PORT")?.unwrap_or(DEFAULT_PORT);
        let max_workers = number(&get, "LOGO_EXTRACTOR_MAX_WORKERS")?
            .unwrap_or(DEFAULT_MAX_WORKERS)
            .max(1);
        let timeout_secs = number(&get, "LOGO_EXTRACTOR_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let insecure_ssl = get("LOGO_EXTRACTOR_INSECURE_SSL").as_deref() == Some("1");

        Ok(Self {
            host,
            port,
            max_workers,
            fetch_timeout: Duration::from_secs(timeout_secs),
            insecure_ssl,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn number<F, T>(get: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
        assert_eq!(cfg.max_workers, 5);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(10));
        assert!(!cfg.insecure_ssl);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOGO_EXTRACTOR_MAX_WORKERS", "12"),
            ("LOGO_EXTRACTOR_TIMEOUT_SECS", "3"),
            ("LOGO_EXTRACTOR_INSECURE_SSL", "1"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.max_workers, 12);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(3));
        assert!(cfg.insecure_ssl);
    }

    #[test]
    fn zero_workers_clamped() {
        let cfg = config(&[("LOGO_EXTRACTOR_MAX_WORKERS", "0")]).unwrap();
        assert_eq!(cfg.max_workers, 1);
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config(&[("LOGO_EXTRACTOR_MAX_WORKERS", "-2")]).is_err());
    }
}
