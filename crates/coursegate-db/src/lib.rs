//! coursegate Database Layer
//!
//! Postgres row models with the queries the purchase engine needs, the
//! connection pool wrapper, and embedded migrations.
//!
//! Models follow one shape: a `FromRow` struct with `String` status columns
//! and typed accessors, plus inherent `async fn`s taking `&PgPool` that
//! return `sqlx::Error`. Callers convert into [`DbError`] when they need to
//! distinguish unique violations.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::*;
pub use pool::{DbPool, PoolSettings};
