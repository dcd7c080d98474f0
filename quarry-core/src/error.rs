/// Quarry error type with actionable variants.
#[derive(Debug)]
pub enum QuarryError {
    /// Underlying sqlx error (connect, authentication, malformed SQL, ...).
    Sqlx(sqlx::Error),
    /// The server at `address` could not be reached or refused the session.
    Connect { address: String, source: sqlx::Error },
    /// Invalid connection configuration.
    Config(String),
    /// A column was read as an incompatible type.
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The requested column is not part of the row.
    MissingColumn(String),
    /// A value was read from a cursor that is not positioned on a row.
    NoCurrentRow,
    /// Generic message error.
    Message(String),
}

impl QuarryError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn connect(address: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Connect {
            address: address.into(),
            source,
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(column: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected,
            found,
        }
    }

    /// Returns true for errors raised while reading a value as the wrong type.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}

impl std::fmt::Display for QuarryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlx(err) => write!(f, "sqlx error: {}", err),
            Self::Connect { address, source } => {
                write!(f, "could not connect to {}: {}", address, source)
            }
            Self::Config(message) => write!(f, "configuration error: {}", message),
            Self::TypeMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "type mismatch for column '{}': expected {}, found {}",
                column, expected, found
            ),
            Self::MissingColumn(column) => write!(f, "no such column '{}'", column),
            Self::NoCurrentRow => write!(f, "cursor is not positioned on a row"),
            Self::Message(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for QuarryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlx(err) | Self::Connect { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for QuarryError {
    fn from(err: sqlx::Error) -> Self {
        Self::Sqlx(err)
    }
}

/// Result alias for Quarry operations.
pub type QuarryResult<T> = Result<T, QuarryError>;
