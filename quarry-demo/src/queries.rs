use quarry::{DatabaseManager, Model, Operator, QueryBuilder, SqlDialect, Value};

use crate::user::User;

/// One filtered projection of `users`, rendered as an unprepared statement,
/// a prepared statement and a model query.
#[derive(Debug, Clone, PartialEq)]
pub struct UserQuery {
    pub column: &'static str,
    pub operator: Operator,
    pub threshold: u64,
    pub projection: &'static [&'static str],
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            column: "id",
            operator: Operator::Lt,
            threshold: 3,
            projection: &["id", "name"],
        }
    }
}

impl UserQuery {
    fn select_prefix(&self) -> String {
        format!(
            "select {} from {} where {} {}",
            self.projection.join(", "),
            User::table_name(),
            self.column,
            self.operator.as_sql()
        )
    }

    /// SQL with the threshold inlined as a literal.
    pub fn unprepared_sql<DB: SqlDialect>(&self) -> String {
        format!(
            "{} {}",
            self.select_prefix(),
            Value::from(self.threshold).to_sql_literal::<DB>()
        )
    }

    /// SQL with one positional placeholder for the threshold.
    pub fn prepared_sql(&self) -> String {
        format!("{} ?", self.select_prefix())
    }

    pub fn bindings(&self) -> Vec<Value> {
        vec![Value::from(self.threshold)]
    }

    /// The same filter as a [`User`] model query.
    pub fn model_query<'a, DB: SqlDialect>(
        &self,
        manager: &'a DatabaseManager<DB>,
    ) -> QueryBuilder<'a, User, DB> {
        User::query(manager)
            .filter(self.column, self.operator, self.threshold)
            .select(self.projection)
    }
}
