use std::sync::Arc;

use crate::error::{QuarryError, QuarryResult};
use crate::value::{FromValue, Value};

/// Column lookup key: a name or a zero-based position.
pub trait ColumnRef: Copy {
    fn position(self, columns: &[String]) -> Option<usize>;
    fn describe(self) -> String;
}

impl ColumnRef for &str {
    fn position(self, columns: &[String]) -> Option<usize> {
        columns.iter().position(|c| c == self)
    }

    fn describe(self) -> String {
        self.to_owned()
    }
}

impl ColumnRef for usize {
    fn position(self, columns: &[String]) -> Option<usize> {
        (self < columns.len()).then_some(self)
    }

    fn describe(self) -> String {
        format!("#{}", self)
    }
}

/// One result row: a fixed-width tuple of values sharing its column names
/// with every other row of the same result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Builds a row; `values` must line up with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Returns the raw value of a column.
    pub fn value<C: ColumnRef>(&self, column: C) -> QuarryResult<&Value> {
        column
            .position(&self.columns)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| QuarryError::MissingColumn(column.describe()))
    }

    /// Reads a column as `T`.
    pub fn get<T: FromValue, C: ColumnRef>(&self, column: C) -> QuarryResult<T> {
        let value = self.value(column)?;
        T::from_value(value)
            .ok_or_else(|| QuarryError::type_mismatch(column.describe(), T::TYPE_NAME, value.type_name()))
    }

    /// Like [`Row::get`], but a missing column yields `Ok(None)`.
    pub fn get_opt<T: FromValue>(&self, column: &str) -> QuarryResult<Option<T>> {
        if self.contains(column) {
            self.get(column).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// A forward-only result set.
///
/// Rows are visited with [`Cursor::advance`]; once it returns `false` the
/// cursor stays exhausted.
#[derive(Debug, Clone)]
pub struct Cursor {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
    total: usize,
}

impl Cursor {
    pub fn new(columns: Arc<[String]>, rows: Vec<Row>) -> Self {
        let total = rows.len();
        Self {
            columns,
            rows: rows.into_iter(),
            current: None,
            total,
        }
    }

    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::new()), Vec::new())
    }

    /// Moves to the next row. Returns `false` when there are no more rows.
    pub fn advance(&mut self) -> bool {
        self.current = self.rows.next();
        self.current.is_some()
    }

    /// The row the cursor is positioned on.
    pub fn current(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    /// Raw value of a column in the current row.
    pub fn value<C: ColumnRef>(&self, column: C) -> QuarryResult<&Value> {
        self.current
            .as_ref()
            .ok_or(QuarryError::NoCurrentRow)?
            .value(column)
    }

    /// Reads a column of the current row as `T`.
    pub fn get<T: FromValue, C: ColumnRef>(&self, column: C) -> QuarryResult<T> {
        self.current
            .as_ref()
            .ok_or(QuarryError::NoCurrentRow)?
            .get(column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows in the whole result, independent of position.
    pub fn size(&self) -> usize {
        self.total
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.current = None;
        self.rows.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Cursor {
        let columns: Arc<[String]> = Arc::from(vec!["id".to_owned(), "name".to_owned()]);
        let rows = vec![
            Row::new(columns.clone(), vec![Value::I64(1), Value::from("andrej")]),
            Row::new(columns.clone(), vec![Value::I64(2), Value::from("silver")]),
        ];
        Cursor::new(columns, rows)
    }

    #[test]
    fn test_cursor_walks_rows_then_stops() {
        let mut cursor = users();
        assert_eq!(cursor.size(), 2);

        let mut seen = Vec::new();
        while cursor.advance() {
            seen.push((
                cursor.get::<u64, _>("id").unwrap(),
                cursor.get::<String, _>("name").unwrap(),
            ));
        }
        assert_eq!(seen, vec![(1, "andrej".to_owned()), (2, "silver".to_owned())]);

        assert!(!cursor.advance());
        assert!(!cursor.advance());
        assert!(matches!(cursor.value("id"), Err(QuarryError::NoCurrentRow)));
    }

    #[test]
    fn test_current_follows_advance() {
        let mut cursor = users();
        assert!(cursor.current().is_none());
        assert!(cursor.advance());
        assert_eq!(cursor.current().unwrap().get::<String, _>("name").unwrap(), "andrej");
        assert!(cursor.advance());
        assert!(!cursor.advance());
        assert!(cursor.current().is_none());
    }

    #[test]
    fn test_read_before_advance_fails() {
        let cursor = users();
        assert!(matches!(cursor.get::<u64, _>("id"), Err(QuarryError::NoCurrentRow)));
    }

    #[test]
    fn test_wrong_type_is_a_mismatch() {
        let mut cursor = users();
        assert!(cursor.advance());
        let err = cursor.get::<u64, _>("name").unwrap_err();
        assert!(err.is_type_mismatch());
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn test_lookup_by_position_and_missing_column() {
        let mut cursor = users();
        assert!(cursor.advance());
        assert_eq!(cursor.get::<String, _>(1).unwrap(), "andrej");
        assert!(matches!(cursor.value(5), Err(QuarryError::MissingColumn(c)) if c == "#5"));
        assert!(matches!(cursor.value("email"), Err(QuarryError::MissingColumn(_))));
    }

    #[test]
    fn test_get_opt_tolerates_missing_column() {
        let row = users().next().unwrap();
        assert_eq!(row.get_opt::<String>("email").unwrap(), None);
        assert_eq!(row.get_opt::<u64>("id").unwrap(), Some(1));
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = Cursor::empty();
        assert_eq!(cursor.size(), 0);
        assert!(!cursor.advance());
    }
}
