//! Storage error types.

use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound {
        /// Kind of entity ("order", "bid", ...)
        entity_type: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Unique constraint violated
    #[error("{entity_type} already exists: {id}")]
    Duplicate {
        /// Kind of entity
        entity_type: &'static str,
        /// Conflicting identifier
        id: String,
    },

    /// Contended resource stayed locked past the retry budget
    #[error("Resource busy: {0}")]
    Busy(String),

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),

    /// Connection failure
    #[error("Connection error: {0}")]
    Connection(String),
}

impl StoreError {
    /// Create a NotFound error.
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a Duplicate error.
    pub fn duplicate(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a Busy error.
    pub fn busy(message: impl Into<String>) -> Self {
        Self::Busy(message.into())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::not_found("row", "unknown"),
            sqlx::Error::PoolTimedOut => StoreError::busy("connection pool timed out"),
            sqlx::Error::Database(db_err) => {
                // 23505 = unique_violation
                if db_err.code().as_deref() == Some("23505") {
                    StoreError::duplicate("row", db_err.message().to_string())
                } else {
                    StoreError::Database(err.to_string())
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StoreError::Connection(err.to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("order", "ORD-00042");
        assert_eq!(err.to_string(), "order not found: ORD-00042");
    }

    #[test]
    fn test_busy_display() {
        let err = StoreError::busy("sequence counter is locked");
        assert_eq!(err.to_string(), "Resource busy: sequence counter is locked");
    }
}
