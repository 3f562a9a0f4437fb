//! Store error types.
//!
//! Every fallible operation in this crate returns [`StoreResult`]. Errors are
//! surfaced to the caller as-is: a dangling reference is never clamped, a
//! malformed file is never partially loaded.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::schema::RowId;

/// Error codes for categorizing store errors.
///
/// These codes are stable and can be used for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,

    // Storage errors (0x0200 - 0x02FF)
    /// Row id beyond the bounds of its backing file.
    MissingRow = 0x0200,
    /// Unparsable line in a backing file.
    MalformedRow = 0x0201,
    /// No row structurally equal to the requested record.
    NotFound = 0x0202,

    // Schema errors (0x0300 - 0x03FF)
    /// Record or schema of the wrong shape.
    SchemaMismatch = 0x0300,
    /// Field not declared by the schema.
    UnknownField = 0x0301,
    /// Value of the wrong kind for a field.
    TypeMismatch = 0x0302,
    /// Schema declaration rejected.
    InvalidSchema = 0x0303,

    // Query errors (0x0400 - 0x04FF)
    /// Unrecognized predicate key.
    BadFilterKey = 0x0400,
    /// Unrecognized aggregate expression.
    InvalidAggregate = 0x0401,

    // Configuration errors (0x0500 - 0x05FF)
    /// Invalid configuration.
    Config = 0x0500,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x01 => "I/O",
            0x02 => "Storage",
            0x03 => "Schema",
            0x04 => "Query",
            0x05 => "Config",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A row id points past the end of its table, typically a dangling
    /// reference left behind by an unchecked delete.
    #[error("row {id} of {schema} does not exist (table has {len} rows)")]
    MissingRow {
        /// Schema of the table being indexed.
        schema: String,
        /// Requested row id.
        id: RowId,
        /// Row count at the time of the lookup.
        len: usize,
    },

    /// A line of a backing file could not be decoded.
    #[error("malformed row in {schema} at line {line}: {reason}")]
    MalformedRow {
        /// Schema of the table being loaded.
        schema: String,
        /// 1-based physical line number where the record starts.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// No row structurally equal to the requested record exists.
    #[error("no matching row in {schema}")]
    NotFound {
        /// Schema of the table that was scanned.
        schema: String,
    },

    /// Unrecognized predicate key.
    #[error("bad filter key: {0}")]
    BadFilterKey(String),

    /// Field not declared by the schema.
    #[error("{schema} has no field named {field}")]
    UnknownField {
        /// Schema that was consulted.
        schema: String,
        /// Requested field name.
        field: String,
    },

    /// A record of one schema was handed to a table of another.
    #[error("schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch {
        /// Schema the operation expected.
        expected: String,
        /// Schema that was supplied.
        actual: String,
    },

    /// A value does not have the kind its field declares.
    #[error("type mismatch for field {field}: expected {expected}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Declared kind.
        expected: String,
    },

    /// A schema declaration was rejected.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Unrecognized aggregate expression.
    #[error("invalid aggregate expression: {0}")]
    InvalidAggregate(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Io { .. } => ErrorCode::Io,
            StoreError::MissingRow { .. } => ErrorCode::MissingRow,
            StoreError::MalformedRow { .. } => ErrorCode::MalformedRow,
            StoreError::NotFound { .. } => ErrorCode::NotFound,
            StoreError::BadFilterKey(_) => ErrorCode::BadFilterKey,
            StoreError::UnknownField { .. } => ErrorCode::UnknownField,
            StoreError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            StoreError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            StoreError::InvalidSchema(_) => ErrorCode::InvalidSchema,
            StoreError::InvalidAggregate(_) => ErrorCode::InvalidAggregate,
            StoreError::Config(_) => ErrorCode::Config,
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = StoreError::MissingRow {
            schema: "Parent".into(),
            id: 3,
            len: 1,
        };
        assert_eq!(err.code(), ErrorCode::MissingRow);
        assert_eq!(err.code().category(), "Storage");
        assert_eq!(
            err.to_string(),
            "row 3 of Parent does not exist (table has 1 rows)"
        );

        let err = StoreError::BadFilterKey("end_between".into());
        assert_eq!(err.code().as_u16(), 0x0400);
        assert_eq!(err.code().category(), "Query");
    }
}
