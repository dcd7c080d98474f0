use std::io::Write;
use std::time::Instant;

use quarry::sqlx::{Database, IntoArguments};
use quarry::{DatabaseManager, LibraryInfo, SqlDialect};

pub mod printer;
pub mod queries;
pub mod user;

pub use queries::UserQuery;
pub use user::User;

pub type DemoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Process-wide state for the lifetime of the demo.
///
/// Created at the top of `main`; logs its teardown on drop.
#[derive(Debug)]
pub struct AppContext {
    started: Instant,
}

impl AppContext {
    pub fn new() -> Self {
        tracing::debug!(pid = std::process::id(), "application context created");
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        tracing::debug!(
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "application context dropped"
        );
    }
}

/// Writes the driver and quarry build banners followed by a blank line.
pub fn print_banners(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", LibraryInfo::driver())?;
    writeln!(out, "{}", LibraryInfo::build())?;
    writeln!(out)
}

/// Runs `query` as an unprepared statement, a prepared statement and a model
/// query, printing the rows of each in turn.
pub async fn run_queries<DB>(
    manager: &DatabaseManager<DB>,
    query: &UserQuery,
    out: &mut impl Write,
) -> DemoResult<()>
where
    DB: SqlDialect,
    for<'c> &'c mut <DB as Database>::Connection: quarry::sqlx::Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
{
    let mut users = manager.unprepared(&query.unprepared_sql::<DB>()).await?;
    printer::print_cursor(out, &mut users)?;

    let mut users = manager
        .select(&query.prepared_sql(), query.bindings())
        .await?;
    printer::print_cursor(out, &mut users)?;

    let users = query.model_query(manager).all().await?;
    printer::print_users(out, &users)?;

    out.flush()?;
    Ok(())
}
