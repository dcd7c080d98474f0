use crate::dialect::SqlDialect;
use crate::error::QuarryResult;
use crate::manager::DatabaseManager;
use crate::query::QueryBuilder;
use crate::row::Row;

/// The core trait for database models.
///
/// A model maps one table to a Rust struct. It is usually implemented
/// automatically via `#[derive(Model)]`.
pub trait Model: Sized + Send + Unpin {
    /// Returns the name of the database table, without the connection prefix.
    fn table_name() -> &'static str;

    /// Returns the column names this model hydrates from, in field order.
    fn list_columns() -> &'static [&'static str];

    /// Builds an instance from a result row.
    ///
    /// Columns missing from the row fall back to the field's default when the
    /// field allows it; anything else is an error.
    fn from_row(row: &Row) -> QuarryResult<Self>;

    /// Columns whose values are masked in query logs.
    fn sensitive_fields() -> &'static [&'static str] {
        &[]
    }

    /// Starts a query against this model's table.
    fn query<DB: SqlDialect>(manager: &DatabaseManager<DB>) -> QueryBuilder<'_, Self, DB> {
        QueryBuilder::new(manager)
    }
}
