pub use sqlx;

pub mod config;
pub mod dialect;
pub mod error;
pub mod manager;
pub mod model;
pub mod query;
pub mod row;
pub mod test_utils;
pub mod value;

pub use config::{
    AppTimeZone, ConnectionConfig, DEFAULT_CONNECTION_NAME, Driver, EnvDefault,
    MYSQL_ENV_DEFAULTS, SslMode, SslOptions,
};
pub use dialect::SqlDialect;
pub use error::{QuarryError, QuarryResult};
pub use manager::DatabaseManager;
pub use model::Model;
pub use query::{Direction, Operator, QueryBuilder};
pub use row::{ColumnRef, Cursor, Row};
pub use value::{FromValue, Value};

pub mod prelude {
    pub use crate::{
        ConnectionConfig, Cursor, DatabaseManager, Direction, Model, Operator, QuarryError,
        QuarryResult, Row, Value,
    };
}

// Keep in step with the sqlx requirement in Cargo.toml.
const DRIVER_NAME: &str = "sqlx";
const DRIVER_VERSION: &str = "0.8.6";

/// Build information for a library linked into this binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl LibraryInfo {
    /// Quarry itself.
    pub fn build() -> Self {
        Self {
            name: "quarry",
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// The database driver quarry runs on.
    pub fn driver() -> Self {
        Self {
            name: DRIVER_NAME,
            version: DRIVER_VERSION,
        }
    }
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endian = if cfg!(target_endian = "little") {
            "little_endian"
        } else {
            "big_endian"
        };
        let profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        };
        write!(
            f,
            "{} {} ({}-{} {} {} build; by rustc)",
            self.name,
            self.version,
            std::env::consts::ARCH,
            endian,
            std::env::consts::OS,
            profile
        )
    }
}
