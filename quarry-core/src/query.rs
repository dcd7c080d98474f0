use std::fmt::Write;
use std::marker::PhantomData;

use sqlx::{Database, IntoArguments};

use crate::dialect::SqlDialect;
use crate::error::QuarryResult;
use crate::manager::DatabaseManager;
use crate::model::Model;
use crate::value::Value;

// Largest LIMIT accepted by both MySQL and SQLite; MySQL requires LIMIT before OFFSET.
const NO_LIMIT: u64 = i64::MAX as u64;

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// Sort direction for [`QueryBuilder::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub(crate) enum FilterExpr {
    Compare {
        column: String,
        op: Operator,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    NullCheck {
        column: String,
        is_null: bool,
    },
}

/// A filtered single-table SELECT for a [`Model`].
///
/// Column and table names are always quoted; values are always bound.
pub struct QueryBuilder<'a, T, DB: SqlDialect> {
    manager: &'a DatabaseManager<DB>,
    columns: Vec<String>,
    filters: Vec<FilterExpr>,
    orders: Vec<(String, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
    _marker: PhantomData<T>,
}

impl<'a, T, DB: SqlDialect> std::fmt::Debug for QueryBuilder<'a, T, DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("columns", &self.columns)
            .field("filters", &self.filters)
            .field("orders", &self.orders)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T, DB> QueryBuilder<'a, T, DB>
where
    DB: SqlDialect,
    T: Model,
{
    /// Creates a new `QueryBuilder` running on `manager`.
    pub fn new(manager: &'a DatabaseManager<DB>) -> Self {
        Self {
            manager,
            columns: Vec::new(),
            filters: Vec::with_capacity(4),
            orders: Vec::new(),
            limit: None,
            offset: None,
            _marker: PhantomData,
        }
    }

    /// Restricts the projection to `columns`. An empty list selects `*`.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    /// Adds a `column <op> value` filter.
    pub fn filter(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.filters.push(FilterExpr::Compare {
            column: column.to_owned(),
            op,
            value: value.into(),
        });
        self
    }

    /// Adds an equality filter (`column = value`).
    pub fn filter_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Eq, value)
    }

    /// Adds a not-equal filter (`column != value`).
    pub fn filter_ne(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Ne, value)
    }

    /// Adds a less-than filter (`column < value`).
    pub fn filter_lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Lt, value)
    }

    /// Adds a less-than-or-equal filter (`column <= value`).
    pub fn filter_lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Lte, value)
    }

    /// Adds a greater-than filter (`column > value`).
    pub fn filter_gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Gt, value)
    }

    /// Adds a greater-than-or-equal filter (`column >= value`).
    pub fn filter_gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Gte, value)
    }

    /// Adds a LIKE filter (`column LIKE value`).
    pub fn filter_like(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Like, value)
    }

    /// Adds an IN filter (`column IN (values...)`). An empty list matches nothing.
    pub fn filter_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters.push(FilterExpr::In {
            column: column.to_owned(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Filters rows where the column IS NULL.
    pub fn filter_is_null(mut self, column: &str) -> Self {
        self.filters.push(FilterExpr::NullCheck {
            column: column.to_owned(),
            is_null: true,
        });
        self
    }

    /// Filters rows where the column IS NOT NULL.
    pub fn filter_is_not_null(mut self, column: &str) -> Self {
        self.filters.push(FilterExpr::NullCheck {
            column: column.to_owned(),
            is_null: false,
        });
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.orders.push((column.to_owned(), direction));
        self
    }

    /// Sets the maximum number of rows to return.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the SELECT SQL that would be executed for this query.
    pub fn to_sql(&self) -> String {
        let mut binds = Vec::new();
        self.render_into(&mut binds)
    }

    /// Returns the values bound to the placeholders of [`QueryBuilder::to_sql`], in order.
    pub fn bindings(&self) -> Vec<Value> {
        let mut binds = Vec::new();
        self.render_into(&mut binds);
        binds
    }

    fn render_into(&self, binds: &mut Vec<Value>) -> String {
        let mut sql = String::with_capacity(128);
        let mut idx = 1;

        sql.push_str("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let projection = self
                .columns
                .iter()
                .map(|c| DB::quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&projection);
        }
        let _ = write!(
            sql,
            " FROM {}",
            DB::quote_identifier(&self.manager.prefixed(T::table_name()))
        );

        for (i, filter) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            match filter {
                FilterExpr::Compare { column, op, value } => {
                    let _ = write!(
                        sql,
                        "{} {} {}",
                        DB::quote_identifier(column),
                        op.as_sql(),
                        DB::placeholder(idx)
                    );
                    idx += 1;
                    binds.push(value.clone());
                }
                FilterExpr::In { column, values } => {
                    if values.is_empty() {
                        sql.push_str("1=0");
                        continue;
                    }
                    let _ = write!(sql, "{} IN (", DB::quote_identifier(column));
                    for (n, value) in values.iter().enumerate() {
                        if n > 0 {
                            sql.push_str(", ");
                        }
                        sql.push_str(&DB::placeholder(idx));
                        idx += 1;
                        binds.push(value.clone());
                    }
                    sql.push(')');
                }
                FilterExpr::NullCheck { column, is_null } => {
                    let check = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                    let _ = write!(sql, "{} {}", DB::quote_identifier(column), check);
                }
            }
        }

        for (i, (column, direction)) in self.orders.iter().enumerate() {
            sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
            let dir = match direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            let _ = write!(sql, "{} {}", DB::quote_identifier(column), dir);
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => {
                let _ = write!(sql, " LIMIT {}", limit);
            }
            (None, Some(_)) => {
                let _ = write!(sql, " LIMIT {}", NO_LIMIT);
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            let _ = write!(sql, " OFFSET {}", offset);
        }

        sql
    }

    fn format_filters_for_log(&self) -> String {
        let sensitive_fields = T::sensitive_fields();
        let render = |column: &str, value: &Value| {
            if sensitive_fields.contains(&column) {
                "***".to_owned()
            } else {
                value.to_log_string()
            }
        };

        self.filters
            .iter()
            .map(|filter| match filter {
                FilterExpr::Compare { column, op, value } => {
                    format!("{} {} {}", column, op.as_sql(), render(column, value))
                }
                FilterExpr::In { values, .. } if values.is_empty() => "1=0".to_owned(),
                FilterExpr::In { column, values } => format!(
                    "{} IN ({})",
                    column,
                    values
                        .iter()
                        .map(|v| render(column, v))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                FilterExpr::NullCheck { column, is_null: true } => format!("{} IS NULL", column),
                FilterExpr::NullCheck { column, is_null: false } => {
                    format!("{} IS NOT NULL", column)
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl<'a, T, DB> QueryBuilder<'a, T, DB>
where
    DB: SqlDialect,
    T: Model,
    for<'c> &'c mut <DB as Database>::Connection: sqlx::Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
{
    /// Executes the query and hydrates every row into `T`.
    #[tracing::instrument(skip(self), fields(table = T::table_name()))]
    pub async fn all(self) -> QuarryResult<Vec<T>> {
        let mut binds = Vec::with_capacity(self.filters.len());
        let sql = self.render_into(&mut binds);

        tracing::debug!(
            operation = "select",
            sql = %sql,
            filters = %self.format_filters_for_log(),
            "quarry model query"
        );

        let cursor = self.manager.select(&sql, binds).await?;
        cursor.map(|row| T::from_row(&row)).collect()
    }

    /// Executes the query projecting `columns`.
    pub async fn get(self, columns: &[&str]) -> QuarryResult<Vec<T>> {
        self.select(columns).all().await
    }

    /// Executes the query and returns the first row, if any.
    pub async fn first(self) -> QuarryResult<Option<T>> {
        Ok(self.limit(1).all().await?.into_iter().next())
    }
}
