//! Custom error types for the common library
//!
//! This module defines application-specific error types that can be used
//! throughout the application.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Classify a query failure, pulling unique violations out of the generic
    /// query bucket so callers can react to them.
    pub fn query(err: SqlxError) -> Self {
        match &err {
            SqlxError::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::UniqueViolation(db_err.message().to_string())
            }
            _ => DatabaseError::Query(err),
        }
    }

    /// Whether this is a unique violation on the given column
    pub fn violates(&self, column: &str) -> bool {
        matches!(self, DatabaseError::UniqueViolation(message) if message.contains(column))
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violates_matches_column_name() {
        let err = DatabaseError::UniqueViolation("UNIQUE constraint failed: users.email".into());
        assert!(err.violates("users.email"));
        assert!(!err.violates("users.username"));
    }

    #[test]
    fn test_query_keeps_non_constraint_errors() {
        let err = DatabaseError::query(SqlxError::RowNotFound);
        assert!(matches!(err, DatabaseError::Query(SqlxError::RowNotFound)));
    }
}
