use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::{AppError, Result};

/// Two weeks, in seconds.
const DEFAULT_SESSION_TTL_SECS: u64 = 14 * 24 * 60 * 60;

const DEFAULT_ABOUT_MESSAGE: &str = "This tutorial has been put together by Ruairidh Macgregor.";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    /// Name of the cookie carrying the session id.
    pub session_cookie: String,
    /// How long an unsaved session is kept.
    pub session_ttl: Duration,
    pub about_message: String,
    /// Populate the object store with demo categories and pages on startup.
    pub seed: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, falling back to
    /// defaults for anything unset.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("PORT").unwrap_or_else(|| "8000".to_string());
        let port = port
            .parse::<u16>()
            .map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let session_cookie = var("SESSION_COOKIE").unwrap_or_else(|| "sessionid".to_string());
        if session_cookie.is_empty() || session_cookie.contains([';', '=', ' ']) {
            return Err(AppError::ConfigError(format!(
                "Invalid session cookie name: {:?}",
                session_cookie
            )));
        }

        let session_ttl = match var("SESSION_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                AppError::ConfigError(format!("Invalid SESSION_TTL_SECS: {}", e))
            })?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let about_message = var("ABOUT_MESSAGE").unwrap_or_else(|| {
            info!("ABOUT_MESSAGE not set, using default");
            DEFAULT_ABOUT_MESSAGE.to_string()
        });

        let seed = match var("RANGO_SEED").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(AppError::ConfigError(format!(
                    "Invalid RANGO_SEED value: {}",
                    other
                )));
            }
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            session_cookie,
            session_ttl: Duration::from_secs(session_ttl),
            about_message,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.session_cookie, "sessionid");
        assert_eq!(config.session_ttl, Duration::from_secs(1_209_600));
        assert_eq!(config.about_message, DEFAULT_ABOUT_MESSAGE);
        assert!(!config.seed);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9090"),
            ("SESSION_COOKIE", "rango_sid"),
            ("RANGO_SEED", "1"),
            ("SESSION_TTL_SECS", "300"),
        ])
        .unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(300));
        assert_eq!(config.server_addr, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(config.session_cookie, "rango_sid");
        assert!(config.seed);
    }

    #[test]
    fn rejects_bad_port_and_host() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            config_from(&[("HOST", "localhost:1")]),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_bad_session_ttl() {
        assert!(matches!(
            config_from(&[("SESSION_TTL_SECS", "-5")]),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_unusable_cookie_name() {
        assert!(config_from(&[("SESSION_COOKIE", "a=b")]).is_err());
        assert!(config_from(&[("SESSION_COOKIE", "")]).is_err());
    }
}
