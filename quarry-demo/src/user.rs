use quarry::Model;

/// A row of the `users` table.
#[derive(Model, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
}
