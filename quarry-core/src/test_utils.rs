#[cfg(feature = "sqlite")]
use crate::config::{ConnectionConfig, Driver};
use crate::dialect::SqlDialect;
#[cfg(feature = "sqlite")]
use crate::error::QuarryResult;
use crate::manager::DatabaseManager;

/// Lightweight test helper owning a dedicated manager.
pub struct MockDatabase<DB: SqlDialect> {
    manager: DatabaseManager<DB>,
}

impl<DB: SqlDialect> MockDatabase<DB> {
    pub fn manager(&self) -> &DatabaseManager<DB> {
        &self.manager
    }
}

#[cfg(feature = "sqlite")]
impl MockDatabase<sqlx::Sqlite> {
    /// In-memory SQLite database behind a single-connection pool.
    pub async fn new_sqlite() -> QuarryResult<Self> {
        Self::with_config(ConnectionConfig::new(Driver::Sqlite)).await
    }

    pub async fn with_config(config: ConnectionConfig) -> QuarryResult<Self> {
        let manager = DatabaseManager::create(config).await?;
        Ok(Self { manager })
    }

    /// In-memory database with a `users` table holding three rows.
    pub async fn with_users() -> QuarryResult<Self> {
        let db = Self::new_sqlite().await?;
        seed_users(db.manager()).await?;
        Ok(db)
    }
}

/// Creates `users (id, name)` under the manager's prefix and inserts ids 1 to 3.
#[cfg(feature = "sqlite")]
pub async fn seed_users(manager: &DatabaseManager<sqlx::Sqlite>) -> QuarryResult<()> {
    let table = sqlx::Sqlite::quote_identifier(&manager.prefixed("users"));
    manager
        .unprepared(&format!(
            "CREATE TABLE {} (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            table
        ))
        .await?;
    for (id, name) in [(1_i64, "andrej"), (2, "silver"), (3, "third")] {
        manager
            .statement(
                &format!("INSERT INTO {} (id, name) VALUES (?, ?)", table),
                vec![id.into(), name.into()],
            )
            .await?;
    }
    Ok(())
}
