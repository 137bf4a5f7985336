//! Error types for gridlite.

use std::fmt;

/// The main error type for gridlite operations.
///
/// Every variant is recovered at the service boundary and turned into an
/// error envelope; the `Display` output is what the grid receives as
/// `message`.
#[derive(Debug)]
pub enum Error {
    /// The request could not be parsed or is missing a required field
    MalformedRequest(String),

    /// The table is not part of the configured allow-list
    UnknownTable(String),

    /// The field does not exist in the table's schema
    UnknownColumn {
        /// Table that was probed
        table: String,
        /// Requested column name
        column: String,
    },

    /// The search operator is not defined for the field's type
    UnsupportedOperator {
        /// Field the clause refers to
        field: String,
        /// Operator as sent by the client
        operator: String,
        /// Type category of the field
        category: &'static str,
    },

    /// The field's declared type cannot be filtered
    UnsupportedFieldType {
        /// Field the clause refers to
        field: String,
        /// Declared SQL type of the column
        declared_type: String,
    },

    /// Input rejected by validation
    InvalidInput(String),

    /// Storage engine failure (connection, statement, constraint)
    Storage(String),
}

impl Error {
    /// Name of the error kind, used as the prefix of the envelope message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedRequest(_) => "MalformedRequest",
            Error::UnknownTable(_) => "UnknownTable",
            Error::UnknownColumn { .. } => "UnknownColumn",
            Error::UnsupportedOperator { .. } => "UnsupportedOperator",
            Error::UnsupportedFieldType { .. } => "UnsupportedFieldType",
            Error::InvalidInput(_) => "InvalidInput",
            Error::Storage(_) => "StorageError",
        }
    }

    /// Returns true when the failure was caused by the client's request
    /// rather than by the storage engine.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::Storage(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.kind())?;
        match self {
            Error::MalformedRequest(msg) => write!(f, "{}", msg),
            Error::UnknownTable(table) => write!(f, "table '{}' is not available", table),
            Error::UnknownColumn { table, column } => {
                write!(f, "table '{}' has no column '{}'", table, column)
            }
            Error::UnsupportedOperator {
                field,
                operator,
                category,
            } => write!(
                f,
                "unknown search operator '{}' for field '{}' ({})",
                operator, field, category
            ),
            Error::UnsupportedFieldType {
                field,
                declared_type,
            } => write!(
                f,
                "field '{}' has type '{}' which cannot be searched",
                field, declared_type
            ),
            Error::InvalidInput(msg) => write!(f, "{}", msg),
            Error::Storage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedRequest(format!("invalid request document: {}", err))
    }
}

/// A specialized `Result` type for gridlite operations.
pub type Result<T> = std::result::Result<T, Error>;
