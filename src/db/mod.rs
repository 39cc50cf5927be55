//! Database layer (SQLite via sqlx).

pub mod migrations;
pub mod sqlite;

pub use sqlite::Database;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    /// One schedule per user (keyed by user_id)
    pub const SCHEDULES: &str = "schedules";
}
