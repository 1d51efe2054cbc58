use std::env;
use std::time::Duration;

use crate::logger::LogFormat;

/// Runtime settings, read from the environment (and `.env` via dotenv in `main`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_connections: usize,
    pub rate_limit_per_sec: usize,
    pub compute_workers: usize,
    pub generate_workers: usize,
    /// Largest dimension the compute endpoint will accept.
    pub max_dimension: usize,
    pub max_table_rows: usize,
    /// Idle clients are dropped after this long without sending their request.
    pub read_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            max_connections: 64,
            rate_limit_per_sec: 200,
            compute_workers: 4,
            generate_workers: 2,
            max_dimension: 2000,
            max_table_rows: 100_000,
            read_timeout: Duration::from_secs(10),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Unset or unparseable values keep their defaults; worker counts must be positive.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let parse_var = |name: &str, default: usize| {
            lookup(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        let parse_workers = |name: &str, default: usize| {
            Some(parse_var(name, default)).filter(|v| *v > 0).unwrap_or(default)
        };

        Self {
            bind_addr: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_addr),
            max_connections: parse_var("MAX_CONNECTIONS", defaults.max_connections),
            rate_limit_per_sec: parse_var("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            compute_workers: parse_workers("WORKERS_COMPUTE", defaults.compute_workers),
            generate_workers: parse_workers("WORKERS_GENERATE", defaults.generate_workers),
            max_dimension: parse_var("MAX_DIMENSION", defaults.max_dimension),
            max_table_rows: parse_var("MAX_TABLE_ROWS", defaults.max_table_rows),
            read_timeout: lookup("READ_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.max_connections, 64);
        assert_eq!(cfg.compute_workers, 4);
        assert_eq!(cfg.max_dimension, 2000);
        assert_eq!(cfg.read_timeout, Duration::from_secs(10));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config_from(&[
            ("BIND_ADDRESS", "0.0.0.0:9000"),
            ("MAX_DIMENSION", "512"),
            ("WORKERS_GENERATE", "8"),
            ("READ_TIMEOUT_SECS", "3"),
            ("LOG_FORMAT", "json"),
        ]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.max_dimension, 512);
        assert_eq!(cfg.generate_workers, 8);
        assert_eq!(cfg.read_timeout, Duration::from_secs(3));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn garbage_falls_back() {
        let cfg = config_from(&[
            ("MAX_CONNECTIONS", "lots"),
            ("WORKERS_COMPUTE", "0"),
            ("READ_TIMEOUT_SECS", "0"),
            ("LOG_FORMAT", "xml"),
        ]);
        assert_eq!(cfg.max_connections, 64);
        assert_eq!(cfg.compute_workers, 4);
        assert_eq!(cfg.read_timeout, Duration::from_secs(10));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }
}
