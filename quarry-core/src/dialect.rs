use std::future::Future;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use sqlx::{Column, Database, Row as SqlxRow};

use crate::config::{AppTimeZone, ConnectionConfig, Driver};
use crate::error::QuarryResult;
use crate::row::{Cursor, Row};
use crate::value::Value;

/// Bound query type for a dialect.
pub type DialectQuery<'q, DB> = sqlx::query::Query<'q, DB, <DB as Database>::Arguments<'q>>;

/// A trait that encapsulates everything Quarry needs from a database driver.
///
/// Implementing this trait lets the manager open a pool, render SQL with the
/// right placeholder and quoting rules, bind [`Value`]s, and decode driver
/// rows into [`Row`]s.
pub trait SqlDialect: Database + Sized + Send + Sync {
    /// Returns true if a configuration for `driver` can be served by this dialect.
    fn accepts(driver: Driver) -> bool;

    /// Returns the placeholder for the `n`-th parameter in a query (e.g., "?" or "$1").
    fn placeholder(n: usize) -> String;

    /// Query returning the server version as a single text column.
    fn version_query() -> &'static str;

    /// Returns the number of rows affected by a query result.
    fn rows_affected(res: &Self::QueryResult) -> u64;

    /// Opens a pool for `config`.
    fn connect(
        config: &ConnectionConfig,
    ) -> impl Future<Output = QuarryResult<sqlx::Pool<Self>>> + Send;

    /// Decodes column `index` of a driver row.
    fn decode_value(row: &Self::Row, index: usize, tz: AppTimeZone) -> Result<Value, sqlx::Error>;

    /// Binds one positional parameter.
    fn bind_value<'q>(query: DialectQuery<'q, Self>, value: Value) -> DialectQuery<'q, Self>;

    /// Quotes an identifier (table/column name) to prevent SQL injection.
    fn quote_identifier(ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    /// Renders `value` as a string literal. Only single quotes are special.
    fn quote_string(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

/// Converts driver rows into a [`Cursor`].
pub(crate) fn decode_rows<DB: SqlDialect>(
    rows: &[DB::Row],
    tz: AppTimeZone,
) -> Result<Cursor, sqlx::Error> {
    let columns: Arc<[String]> = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_owned()).collect(),
        None => Arc::from(Vec::new()),
    };

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            values.push(DB::decode_value(row, index, tz)?);
        }
        decoded.push(Row::new(columns.clone(), values));
    }
    Ok(Cursor::new(columns, decoded))
}

/// Applies the in-process time zone policy to a date-time stored as UTC.
pub(crate) fn apply_timezone(utc: NaiveDateTime, tz: AppTimeZone) -> Value {
    match tz {
        AppTimeZone::Utc => Value::Timestamp(utc.and_utc().fixed_offset()),
        AppTimeZone::Local => Value::Timestamp(utc.and_utc().with_timezone(&Local).fixed_offset()),
        AppTimeZone::DontConvert => Value::DateTime(utc),
    }
}

#[cfg(feature = "mysql")]
mod mysql {
    use std::io;

    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPoolOptions, MySqlRow, MySqlSslMode};
    use sqlx::{ConnectOptions, Connection, Row as SqlxRow, TypeInfo, ValueRef};

    use super::{DialectQuery, SqlDialect, apply_timezone};
    use crate::config::{AppTimeZone, ConnectionConfig, Driver, SslMode};
    use crate::error::{QuarryError, QuarryResult};
    use crate::value::Value;

    fn ssl_mode(mode: SslMode) -> MySqlSslMode {
        match mode {
            SslMode::Disabled => MySqlSslMode::Disabled,
            SslMode::Preferred => MySqlSslMode::Preferred,
            SslMode::Required => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyIdentity => MySqlSslMode::VerifyIdentity,
        }
    }

    pub(crate) fn connect_options(config: &ConnectionConfig) -> QuarryResult<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port_number()?)
            .username(&config.username)
            .charset(&config.charset)
            .collation(&config.collation)
            .timezone(Some(config.timezone.clone()))
            .ssl_mode(ssl_mode(config.options.mode));

        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        if !config.database.is_empty() {
            options = options.database(&config.database);
        }
        if let Some(ca) = &config.options.ca {
            options = options.ssl_ca(ca);
        }
        if let Some(cert) = &config.options.cert {
            options = options.ssl_client_cert(cert);
        }
        if let Some(key) = &config.options.key {
            options = options.ssl_client_key(key);
        }
        Ok(options)
    }

    impl SqlDialect for MySql {
        fn accepts(driver: Driver) -> bool {
            driver.is_mysql_family()
        }

        // Backslash is an escape character unless NO_BACKSLASH_ESCAPES is set.
        fn quote_string(value: &str) -> String {
            format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
        }

        fn placeholder(_n: usize) -> String {
            "?".to_owned()
        }

        fn version_query() -> &'static str {
            "SELECT VERSION()"
        }

        fn rows_affected(res: &sqlx::mysql::MySqlQueryResult) -> u64 {
            res.rows_affected()
        }

        async fn connect(config: &ConnectionConfig) -> QuarryResult<sqlx::Pool<Self>> {
            let options = connect_options(config)?;
            let statements = config.session_statements()?;
            let address = format!("{}:{}", config.host, config.port);

            // The pool retries refused connections until `acquire_timeout`, hiding the cause.
            let first = tokio::time::timeout(config.connect_timeout, options.connect())
                .await
                .unwrap_or_else(|_| {
                    Err(sqlx::Error::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no answer within {}s", config.connect_timeout.as_secs()),
                    )))
                })
                .map_err(|source| QuarryError::connect(&address, source))?;
            first.close().await?;

            let pool = MySqlPoolOptions::new()
                .acquire_timeout(config.connect_timeout)
                .after_connect(move |conn, _meta| {
                    let statements = statements.clone();
                    Box::pin(async move {
                        for statement in &statements {
                            sqlx::Executor::execute(&mut *conn, statement.as_str()).await?;
                        }
                        Ok(())
                    })
                })
                .connect_with(options)
                .await
                .map_err(|source| QuarryError::connect(&address, source))?;
            Ok(pool)
        }

        fn decode_value(row: &MySqlRow, index: usize, tz: AppTimeZone) -> Result<Value, sqlx::Error> {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                return Ok(Value::Null);
            }
            let type_name = raw.type_info().name().to_owned();

            let value = match type_name.as_str() {
                "BOOLEAN" => Value::Bool(row.try_get_unchecked(index)?),
                "BIT" => Value::U64(row.try_get_unchecked(index)?),
                "FLOAT" | "DOUBLE" => Value::F64(row.try_get_unchecked(index)?),
                "DATE" => Value::Date(row.try_get_unchecked::<NaiveDate, _>(index)?),
                "TIME" => Value::String(row.try_get_unchecked::<NaiveTime, _>(index)?.to_string()),
                "DATETIME" => apply_timezone(row.try_get_unchecked::<NaiveDateTime, _>(index)?, tz),
                "TIMESTAMP" => {
                    let ts: DateTime<Utc> = row.try_get_unchecked(index)?;
                    apply_timezone(ts.naive_utc(), tz)
                }
                "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY"
                | "GEOMETRY" => Value::Bytes(row.try_get_unchecked(index)?),
                name if name == "YEAR" || name.contains("INT") => {
                    if name.ends_with("UNSIGNED") {
                        Value::U64(row.try_get_unchecked(index)?)
                    } else {
                        Value::I64(row.try_get_unchecked(index)?)
                    }
                }
                // DECIMAL arrives as text on both protocols
                _ => Value::String(row.try_get_unchecked(index)?),
            };
            Ok(value)
        }

        fn bind_value<'q>(query: DialectQuery<'q, Self>, value: Value) -> DialectQuery<'q, Self> {
            match value {
                Value::Null => query.bind(Option::<String>::None),
                Value::Bool(v) => query.bind(v),
                Value::I64(v) => query.bind(v),
                Value::U64(v) => query.bind(v),
                Value::F64(v) => query.bind(v),
                Value::String(v) => query.bind(v),
                Value::Bytes(v) => query.bind(v),
                Value::Date(v) => query.bind(v),
                Value::DateTime(v) => query.bind(v),
                Value::Timestamp(v) => query.bind(v.with_timezone(&Utc)),
            }
        }
    }

}

#[cfg(feature = "sqlite")]
mod sqlite {
    use std::str::FromStr;

    use chrono::Utc;
    use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
    use sqlx::{Row as SqlxRow, TypeInfo, ValueRef};

    use super::{DialectQuery, SqlDialect};
    use crate::config::{AppTimeZone, ConnectionConfig, Driver};
    use crate::error::QuarryResult;
    use crate::value::Value;

    impl SqlDialect for Sqlite {
        fn accepts(driver: Driver) -> bool {
            driver == Driver::Sqlite
        }

        fn placeholder(_n: usize) -> String {
            "?".to_owned()
        }

        fn version_query() -> &'static str {
            "SELECT sqlite_version()"
        }

        fn rows_affected(res: &sqlx::sqlite::SqliteQueryResult) -> u64 {
            res.rows_affected()
        }

        async fn connect(config: &ConnectionConfig) -> QuarryResult<sqlx::Pool<Self>> {
            let in_memory = config.database.is_empty() || config.database == ":memory:";
            let options = if in_memory {
                SqliteConnectOptions::from_str("sqlite::memory:")?
            } else {
                SqliteConnectOptions::new()
                    .filename(&config.database)
                    .create_if_missing(true)
            };
            // Every connection to `:memory:` is a separate database.
            let max_connections = if in_memory { 1 } else { 4 };

            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(config.connect_timeout)
                .connect_with(options)
                .await?;
            Ok(pool)
        }

        fn decode_value(row: &SqliteRow, index: usize, _tz: AppTimeZone) -> Result<Value, sqlx::Error> {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                return Ok(Value::Null);
            }
            let type_name = raw.type_info().name().to_owned();

            let value = match type_name.as_str() {
                "BOOLEAN" => Value::Bool(row.try_get_unchecked(index)?),
                "REAL" | "NUMERIC" => Value::F64(row.try_get_unchecked(index)?),
                "BLOB" => Value::Bytes(row.try_get_unchecked(index)?),
                name if name.contains("INT") => Value::I64(row.try_get_unchecked(index)?),
                _ => Value::String(row.try_get_unchecked(index)?),
            };
            Ok(value)
        }

        fn bind_value<'q>(query: DialectQuery<'q, Self>, value: Value) -> DialectQuery<'q, Self> {
            match value {
                Value::Null => query.bind(Option::<String>::None),
                Value::Bool(v) => query.bind(v),
                Value::I64(v) => query.bind(v),
                Value::U64(v) => match i64::try_from(v) {
                    Ok(v) => query.bind(v),
                    Err(_) => query.bind(v.to_string()),
                },
                Value::F64(v) => query.bind(v),
                Value::String(v) => query.bind(v),
                Value::Bytes(v) => query.bind(v),
                Value::Date(v) => query.bind(v),
                Value::DateTime(v) => query.bind(v),
                Value::Timestamp(v) => query.bind(v.with_timezone(&Utc)),
            }
        }
    }
}
