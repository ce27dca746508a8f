//! SQLite persistence: pool setup, migrations, and the repository traits
//! with their `Sql*` and `InMemory*` implementations.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
