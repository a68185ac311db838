//! Error types for mdborm

use thiserror::Error;

/// Result type alias for mdborm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed error raised by a connection/statement implementation.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for database operations.
///
/// Programmer errors (binding a list as an atomic parameter, an order direction
/// other than `ASC`/`DESC`, executing an INSERT without a table) are not
/// represented here: they panic at the call site.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Failure reported by the connection collaborator, passed through untouched.
    #[error("Driver error: {0}")]
    Driver(#[source] DriverError),

    /// Fetch-one query produced no row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Builder state rejected before execution
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Wrap a driver error.
    pub fn driver<E>(err: E) -> Self
    where
        E: Into<DriverError>,
    {
        Self::Driver(err.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error came from the connection collaborator
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }

    /// Borrow the driver error, if this is one.
    pub fn as_driver_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Driver(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
