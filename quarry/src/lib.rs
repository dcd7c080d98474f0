//! # Quarry
//!
//! A thin MySQL-first data layer on top of sqlx: environment-driven
//! connection configuration, a connection manager with `unprepared` and
//! prepared `select`, a forward-only [`Cursor`], and filtered model queries
//! generated by `#[derive(Model)]`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry::prelude::*;
//!
//! #[derive(Model, Debug)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager =
//!     DatabaseManager::<quarry::sqlx::MySql>::create(ConnectionConfig::mysql_from_env()).await?;
//!
//! let mut cursor = manager.select("select id, name from users where id < ?", vec![3.into()]).await?;
//! while cursor.advance() {
//!     println!("{} \"{}\"", cursor.get::<u64, _>("id")?, cursor.get::<String, _>("name")?);
//! }
//!
//! let users = User::query(&manager).filter_lt("id", 3).get(&["id", "name"]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! `#[derive(Model)]` expands to paths under `quarry_core`, so depend on
//! `quarry-core` alongside this crate.

pub use quarry_core::*;
pub use quarry_macros::Model;

pub mod prelude {
    pub use quarry_core::prelude::*;

    pub use crate::Model; // The macro and the trait
}
