use std::fmt;
use std::time::Duration;

use docmigrate_common::{Error, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_DATABASE: &str = "autobot";
pub const DEFAULT_USER: &str = "autobot_app";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 30;

/// Connection parameters for the target MySQL server.
///
/// Every field except the password has a non-sensitive default. A missing
/// `DB_PASSWORD` is a startup error rather than a silent fallback.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Env: `DB_HOST`
    pub host: String,
    /// Env: `DB_PORT`
    pub port: u16,
    /// Env: `DB_NAME`. Also the schema used to filter catalog queries.
    pub database: String,
    /// Env: `DB_USER`
    pub user: String,
    /// Env: `DB_PASSWORD` (required)
    pub password: String,
    /// Env: `DB_CONNECT_TIMEOUT` (seconds)
    pub connect_timeout: Duration,
    /// Env: `DB_READ_TIMEOUT` (seconds)
    pub read_timeout: Duration,
    /// Env: `DB_WRITE_TIMEOUT` (seconds)
    pub write_timeout: Duration,
}

impl DatabaseConfig {
    /// Build a config with defaults for everything but the password.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: password.into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
        }
    }

    /// Load from the process environment, after merging a `.env` file from
    /// the working directory if one exists. Variables already set win.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("failed to read .env: {e}"))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let password = get("DB_PASSWORD")
            .ok_or_else(|| Error::Config("DB_PASSWORD is not set".into()))?;
        let mut config = Self::with_password(password);

        if let Some(host) = get("DB_HOST") {
            config.host = host.trim().to_string();
        }
        if let Some(port) = get("DB_PORT") {
            config.port = parse_port(&port)?;
        }
        if let Some(database) = get("DB_NAME") {
            config.database = database.trim().to_string();
        }
        if let Some(user) = get("DB_USER") {
            config.user = user.trim().to_string();
        }
        if let Some(secs) = get("DB_CONNECT_TIMEOUT") {
            config.connect_timeout = parse_timeout("DB_CONNECT_TIMEOUT", &secs)?;
        }
        if let Some(secs) = get("DB_READ_TIMEOUT") {
            config.read_timeout = parse_timeout("DB_READ_TIMEOUT", &secs)?;
        }
        if let Some(secs) = get("DB_WRITE_TIMEOUT") {
            config.write_timeout = parse_timeout("DB_WRITE_TIMEOUT", &secs)?;
        }

        Ok(config)
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::Config(format!("invalid DB_PORT: {raw:?}"))),
        Ok(port) => Ok(port),
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::Config(format!(
            "invalid {key}: {raw:?} (expected a positive number of seconds)"
        ))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_password_is_set() {
        let config = DatabaseConfig::from_lookup(lookup(&[("DB_PASSWORD", "s3cret")])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3306);
        assert_eq!(config.database, "autobot");
        assert_eq!(config.user, "autobot_app");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.write_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_password_is_fatal() {
        let err = DatabaseConfig::from_lookup(lookup(&[("DB_HOST", "db.internal")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("DB_PASSWORD")));

        let err = DatabaseConfig::from_lookup(lookup(&[("DB_PASSWORD", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "3307"),
            ("DB_NAME", "staging"),
            ("DB_USER", "migrator"),
            ("DB_PASSWORD", "pw"),
            ("DB_CONNECT_TIMEOUT", "3"),
            ("DB_READ_TIMEOUT", "5"),
            ("DB_WRITE_TIMEOUT", "7"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.database, "staging");
        assert_eq!(config.user, "migrator");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(7));
    }

    #[test]
    fn rejects_bad_numbers() {
        for (key, value) in [
            ("DB_PORT", "abc"),
            ("DB_PORT", "0"),
            ("DB_PORT", "70000"),
            ("DB_READ_TIMEOUT", "-1"),
            ("DB_CONNECT_TIMEOUT", "0"),
        ] {
            let result = DatabaseConfig::from_lookup(lookup(&[("DB_PASSWORD", "pw"), (key, value)]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = DatabaseConfig::with_password("hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
