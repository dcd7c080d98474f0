//! Connection configuration.
//!
//! A [`ConnectionConfig`] is assembled once at startup, usually from the
//! `DB_MYSQL_*` environment variables, and handed by value to
//! [`DatabaseManager::create`](crate::DatabaseManager::create).

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::{QuarryError, QuarryResult};

/// Session `sql_mode` applied when `strict` is enabled (MySQL 8 defaults).
pub const STRICT_SQL_MODE: &str = "ONLY_FULL_GROUP_BY,STRICT_TRANS_TABLES,NO_ZERO_IN_DATE,NO_ZERO_DATE,ERROR_FOR_DIVISION_BY_ZERO,NO_ENGINE_SUBSTITUTION";
/// Session `sql_mode` applied when `strict` is disabled.
pub const LOOSE_SQL_MODE: &str = "NO_ENGINE_SUBSTITUTION";

/// Name given to a connection when none is configured.
pub const DEFAULT_CONNECTION_NAME: &str = "quarry_default";

const ISOLATION_LEVELS: [&str; 4] = [
    "READ UNCOMMITTED",
    "READ COMMITTED",
    "REPEATABLE READ",
    "SERIALIZABLE",
];

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    MySql,
    MariaDb,
    Sqlite,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::Sqlite => "sqlite",
        }
    }

    /// MySQL and MariaDB speak the same protocol.
    pub fn is_mysql_family(&self) -> bool {
        matches!(self, Self::MySql | Self::MariaDb)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time zone applied to date/time values read from the database.
///
/// The session time zone is pinned to `+00:00`, so stored `DATETIME` values
/// are interpreted as UTC before conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppTimeZone {
    /// Values become offset-aware timestamps in UTC.
    #[default]
    Utc,
    /// Values become offset-aware timestamps in the system local time zone.
    Local,
    /// Values are returned as naive date-times, untouched.
    DontConvert,
}

/// TLS mode requested from the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SslMode {
    Disabled,
    #[default]
    Preferred,
    Required,
    VerifyCa,
    VerifyIdentity,
}

impl SslMode {
    /// Parses a mode name; unknown names fall back to [`SslMode::Preferred`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "disabled" => Self::Disabled,
            "required" => Self::Required,
            "verify_ca" => Self::VerifyCa,
            "verify_identity" => Self::VerifyIdentity,
            _ => Self::Preferred,
        }
    }
}

/// Driver-specific TLS parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SslOptions {
    pub mode: SslMode,
    /// Path to the CA certificate.
    pub ca: Option<String>,
    /// Path to the client certificate.
    pub cert: Option<String>,
    /// Path to the client private key.
    pub key: Option<String>,
}

impl SslOptions {
    /// Reads `<prefix>_SSL_{MODE,CA,CERT,KEY}`; empty paths count as unset.
    pub fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |suffix: &str| {
            lookup(&format!("{}_SSL_{}", prefix, suffix)).filter(|value| !value.is_empty())
        };
        Self {
            mode: lookup(&format!("{}_SSL_MODE", prefix))
                .map(|mode| SslMode::from_name(&mode))
                .unwrap_or_default(),
            ca: path("CA"),
            cert: path("CERT"),
            key: path("KEY"),
        }
    }
}

/// Configuration fields that can be overridden from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Host,
    Port,
    Database,
    Username,
    Password,
    Charset,
    Collation,
}

/// One row of the environment fallback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvDefault {
    pub key: ConfigKey,
    pub variable: &'static str,
    pub default: &'static str,
}

/// Environment variables read by [`ConnectionConfig::mysql_from_env`] and their fallbacks.
pub const MYSQL_ENV_DEFAULTS: [EnvDefault; 7] = [
    EnvDefault { key: ConfigKey::Host, variable: "DB_MYSQL_HOST", default: "127.0.0.1" },
    EnvDefault { key: ConfigKey::Port, variable: "DB_MYSQL_PORT", default: "3306" },
    EnvDefault { key: ConfigKey::Database, variable: "DB_MYSQL_DATABASE", default: "" },
    EnvDefault { key: ConfigKey::Username, variable: "DB_MYSQL_USERNAME", default: "root" },
    EnvDefault { key: ConfigKey::Password, variable: "DB_MYSQL_PASSWORD", default: "" },
    EnvDefault { key: ConfigKey::Charset, variable: "DB_MYSQL_CHARSET", default: "utf8mb4" },
    EnvDefault {
        key: ConfigKey::Collation,
        variable: "DB_MYSQL_COLLATION",
        default: "utf8mb4_0900_ai_ci",
    },
];

/// Seconds to wait for a pooled connection, read from the environment.
pub const CONNECT_TIMEOUT_VARIABLE: &str = "DB_MYSQL_CONNECT_TIMEOUT";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Returns the looked-up value of `variable`, or `default` when it is unset.
///
/// A variable set to the empty string is returned as-is.
pub fn env_or(lookup: impl Fn(&str) -> Option<String>, variable: &str, default: &str) -> String {
    lookup(variable).unwrap_or_else(|| default.to_owned())
}

/// Everything needed to reach a database.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub driver: Driver,
    pub connection_name: String,
    pub host: String,
    /// Kept as text; parsed when the connection is created.
    pub port: String,
    pub database: String,
    pub username: String,
    #[serde(serialize_with = "redact")]
    pub password: String,
    pub charset: String,
    pub collation: String,
    /// Session time zone label sent to the server.
    pub timezone: String,
    pub app_timezone: AppTimeZone,
    pub prefix: String,
    pub prefix_indexes: bool,
    pub strict: bool,
    pub isolation_level: Option<String>,
    pub engine: Option<String>,
    /// Server version; `None` means autodetect after connecting.
    pub version: Option<String>,
    pub options: SslOptions,
    pub connect_timeout: Duration,
}

fn redact<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("***")
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("connection_name", &self.connection_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("charset", &self.charset)
            .field("collation", &self.collation)
            .field("timezone", &self.timezone)
            .field("app_timezone", &self.app_timezone)
            .field("strict", &self.strict)
            .field("isolation_level", &self.isolation_level)
            .field("engine", &self.engine)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    /// Creates a configuration for `driver` with the documented defaults.
    pub fn new(driver: Driver) -> Self {
        let default_of = |key: ConfigKey| {
            MYSQL_ENV_DEFAULTS
                .iter()
                .find(|entry| entry.key == key)
                .map(|entry| entry.default.to_owned())
                .unwrap_or_default()
        };
        Self {
            driver,
            connection_name: DEFAULT_CONNECTION_NAME.to_owned(),
            host: default_of(ConfigKey::Host),
            port: default_of(ConfigKey::Port),
            database: default_of(ConfigKey::Database),
            username: default_of(ConfigKey::Username),
            password: default_of(ConfigKey::Password),
            charset: default_of(ConfigKey::Charset),
            collation: default_of(ConfigKey::Collation),
            timezone: "+00:00".to_owned(),
            app_timezone: AppTimeZone::Utc,
            prefix: String::new(),
            prefix_indexes: false,
            strict: true,
            isolation_level: Some("REPEATABLE READ".to_owned()),
            engine: Some("InnoDB".to_owned()),
            version: None,
            options: SslOptions::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// MySQL configuration from the process environment.
    pub fn mysql_from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// MySQL configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new(Driver::MySql);
        for entry in &MYSQL_ENV_DEFAULTS {
            let value = env_or(&lookup, entry.variable, entry.default);
            match entry.key {
                ConfigKey::Host => config.host = value,
                ConfigKey::Port => config.port = value,
                ConfigKey::Database => config.database = value,
                ConfigKey::Username => config.username = value,
                ConfigKey::Password => config.password = value,
                ConfigKey::Charset => config.charset = value,
                ConfigKey::Collation => config.collation = value,
            }
        }
        if let Some(secs) = lookup(CONNECT_TIMEOUT_VARIABLE).and_then(|v| v.trim().parse().ok()) {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.options = SslOptions::from_lookup("DB_MYSQL", &lookup);
        config
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: impl ToString) -> Self {
        self.port = port.to_string();
        self
    }

    /// Set the database name (a file path or `:memory:` for SQLite).
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the connection name used in query logs.
    pub fn connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = name.into();
        self
    }

    /// Set the table name prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the in-process time zone conversion.
    pub fn app_timezone(mut self, tz: AppTimeZone) -> Self {
        self.app_timezone = tz;
        self
    }

    /// Set the pool acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Parses the configured port.
    pub fn port_number(&self) -> QuarryResult<u16> {
        self.port
            .trim()
            .parse()
            .map_err(|_| QuarryError::config(format!("invalid port '{}'", self.port)))
    }

    /// Statements run on every new MySQL session.
    pub fn session_statements(&self) -> QuarryResult<Vec<String>> {
        let mut statements = Vec::with_capacity(3);
        let sql_mode = if self.strict { STRICT_SQL_MODE } else { LOOSE_SQL_MODE };
        statements.push(format!("SET SESSION sql_mode = '{}'", sql_mode));

        if let Some(level) = &self.isolation_level {
            let level = level.trim().to_ascii_uppercase();
            if !ISOLATION_LEVELS.contains(&level.as_str()) {
                return Err(QuarryError::config(format!(
                    "unsupported isolation level '{}'",
                    level
                )));
            }
            statements.push(format!("SET SESSION TRANSACTION ISOLATION LEVEL {}", level));
        }

        if let Some(engine) = &self.engine {
            if engine.is_empty() || !engine.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(QuarryError::config(format!(
                    "invalid storage engine '{}'",
                    engine
                )));
            }
            statements.push(format!("SET SESSION default_storage_engine = {}", engine));
        }

        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_unset_variables_fall_back_to_defaults() {
        let config = ConnectionConfig::from_lookup(|_| None);
        for entry in &MYSQL_ENV_DEFAULTS {
            let actual = match entry.key {
                ConfigKey::Host => &config.host,
                ConfigKey::Port => &config.port,
                ConfigKey::Database => &config.database,
                ConfigKey::Username => &config.username,
                ConfigKey::Password => &config.password,
                ConfigKey::Charset => &config.charset,
                ConfigKey::Collation => &config.collation,
            };
            assert_eq!(actual, entry.default, "{}", entry.variable);
        }
        assert_eq!(config.port_number().unwrap(), 3306);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.username, "root");
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = ConnectionConfig::from_lookup(lookup_from(&[
            ("DB_MYSQL_HOST", "db.internal"),
            ("DB_MYSQL_PORT", "3307"),
            ("DB_MYSQL_DATABASE", "quarry"),
            ("DB_MYSQL_USERNAME", "app"),
            ("DB_MYSQL_PASSWORD", "secret"),
        ]));
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port_number().unwrap(), 3307);
        assert_eq!(config.database, "quarry");
        assert_eq!(config.username, "app");
        assert_eq!(config.password, "secret");
        assert_eq!(config.charset, "utf8mb4");
    }

    #[test]
    fn test_empty_variable_is_not_replaced_by_default() {
        let config = ConnectionConfig::from_lookup(lookup_from(&[("DB_MYSQL_USERNAME", "")]));
        assert_eq!(config.username, "");
    }

    #[test]
    fn test_fixed_fields() {
        let config = ConnectionConfig::from_lookup(|_| None);
        assert_eq!(config.driver, Driver::MySql);
        assert_eq!(config.timezone, "+00:00");
        assert_eq!(config.app_timezone, AppTimeZone::Utc);
        assert_eq!(config.prefix, "");
        assert!(!config.prefix_indexes);
        assert!(config.strict);
        assert_eq!(config.isolation_level.as_deref(), Some("REPEATABLE READ"));
        assert_eq!(config.engine.as_deref(), Some("InnoDB"));
        assert!(config.version.is_none());
    }

    #[test]
    fn test_malformed_port_is_deferred() {
        let config = ConnectionConfig::from_lookup(lookup_from(&[("DB_MYSQL_PORT", "abc")]));
        assert_eq!(config.port, "abc");
        let err = config.port_number().unwrap_err();
        assert!(err.to_string().contains("invalid port 'abc'"));
    }

    #[test]
    fn test_ssl_options_from_lookup() {
        let options = SslOptions::from_lookup(
            "DB_MYSQL",
            lookup_from(&[
                ("DB_MYSQL_SSL_MODE", "VERIFY_CA"),
                ("DB_MYSQL_SSL_CA", "/certs/ca.pem"),
                ("DB_MYSQL_SSL_KEY", ""),
            ]),
        );
        assert_eq!(options.mode, SslMode::VerifyCa);
        assert_eq!(options.ca.as_deref(), Some("/certs/ca.pem"));
        assert!(options.cert.is_none());
        assert!(options.key.is_none());

        let maria = SslOptions::from_lookup("DB_MARIA", lookup_from(&[("DB_MYSQL_SSL_CA", "x")]));
        assert_eq!(maria, SslOptions::default());
    }

    #[test]
    fn test_unknown_ssl_mode_is_preferred() {
        assert_eq!(SslMode::from_name("bogus"), SslMode::Preferred);
        assert_eq!(SslMode::from_name("disabled"), SslMode::Disabled);
    }

    #[test]
    fn test_connect_timeout_variable() {
        let config =
            ConnectionConfig::from_lookup(lookup_from(&[(CONNECT_TIMEOUT_VARIABLE, "2")]));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        let config =
            ConnectionConfig::from_lookup(lookup_from(&[(CONNECT_TIMEOUT_VARIABLE, "soon")]));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_session_statements() {
        let config = ConnectionConfig::new(Driver::MySql);
        let statements = config.session_statements().unwrap();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("STRICT_TRANS_TABLES"));
        assert_eq!(
            statements[1],
            "SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ"
        );
        assert_eq!(statements[2], "SET SESSION default_storage_engine = InnoDB");
    }

    #[test]
    fn test_session_statements_reject_bad_values() {
        let mut config = ConnectionConfig::new(Driver::MySql);
        config.isolation_level = Some("READ EVERYTHING; DROP TABLE users".to_owned());
        assert!(config.session_statements().is_err());

        let mut config = ConnectionConfig::new(Driver::MySql);
        config.engine = Some("InnoDB; --".to_owned());
        assert!(config.session_statements().is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let mut config = ConnectionConfig::new(Driver::MySql);
        config.password = "hunter2".to_owned();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"password\":\"***\""));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
