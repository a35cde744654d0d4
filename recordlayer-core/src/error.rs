//! Error types, the error taxonomy, and the in-band error record factory.
//!
//! Fallible operations return [`RecordStoreResult<T>`]. Failures that have to be reported
//! inside a result set instead of as a Rust error are encoded with [`error_record`] or
//! [`ErrorKind::record`].

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use serde_yaml::Error as SerdeYamlError;
use thiserror::Error;

use crate::record::Record;

/// Represents all possible errors that can occur when accessing records in a document store.
#[derive(Error, Debug)]
pub enum RecordStoreError {
    /// Conversion between JSON, YAML and BSON representations failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The store could not be dialed, or its configuration is unusable.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An error reported by the underlying store.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A write collided with a uniqueness constraint.
    /// The first argument is the offending key, the second is the namespace.
    #[error("Duplicate key {0} in {1}")]
    DuplicateKey(String, String),
    /// No document matched a filter that required one.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The filter or sort specification cannot be executed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The record is not a document or violates a structural requirement.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    /// A typed accessor found a value of a different dynamic type at the given path.
    #[error("Unable to cast value for key '{path}'")]
    TypeMismatch {
        /// The dotted path that was resolved.
        path: String,
    },
}

/// A specialized `Result` type for record store operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

impl RecordStoreError {
    /// Classifies this error into the fixed error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordStoreError::Serialization(_) => ErrorKind::ParserError,
            RecordStoreError::Initialization(_) => ErrorKind::ServerError,
            RecordStoreError::Backend(_)
            | RecordStoreError::DuplicateKey(_, _)
            | RecordStoreError::NotFound(_) => ErrorKind::DbError,
            RecordStoreError::InvalidQuery(_) => ErrorKind::QueryError,
            RecordStoreError::InvalidRecord(_) | RecordStoreError::TypeMismatch { .. } => {
                ErrorKind::ValidationError
            }
        }
    }

    /// Encodes this error as an error record tagged with its taxonomy kind.
    pub fn to_record(&self) -> Record {
        self.kind().record(&self.to_string())
    }
}

impl From<BsonError> for RecordStoreError {
    fn from(err: BsonError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RecordStoreError {
    fn from(err: SerdeJsonError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeYamlError> for RecordStoreError {
    fn from(err: SerdeYamlError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}

/// The fixed error taxonomy, in ascending code order starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ServerError,
    DbError,
    QueryError,
    ParserError,
    ValidationError,
}

impl ErrorKind {
    /// Numeric code carried in the `code` field of an error record.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::ServerError => 1,
            ErrorKind::DbError => 2,
            ErrorKind::QueryError => 3,
            ErrorKind::ParserError => 4,
            ErrorKind::ValidationError => 5,
        }
    }

    /// Human readable name carried in the `type` field of an error record.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::ServerError => "Server error",
            ErrorKind::DbError => "MongoDB error",
            ErrorKind::QueryError => "Server query error",
            ErrorKind::ParserError => "Server parser error",
            ErrorKind::ValidationError => "Server validation error",
        }
    }

    /// Builds an error record of this kind.
    pub fn record(self, message: &str) -> Record {
        error_record(message, self.name(), self.code())
    }
}

/// Builds a record with exactly three fields: `error`, `type` and `code`.
///
/// The message and kind name are HTML-escaped.
pub fn error_record(message: &str, kind_name: &str, code: i32) -> Record {
    let mut record = Record::new();
    record.insert("error", escape_html(message));
    record.insert("type", escape_html(kind_name));
    record.insert("code", code);
    record
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn taxonomy_codes_ascend_from_one() {
        let kinds = [
            ErrorKind::ServerError,
            ErrorKind::DbError,
            ErrorKind::QueryError,
            ErrorKind::ParserError,
            ErrorKind::ValidationError,
        ];
        let codes: Vec<i32> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5]);
        assert_eq!(ErrorKind::DbError.name(), "MongoDB error");
        assert_eq!(ErrorKind::ValidationError.name(), "Server validation error");
    }

    #[test]
    fn error_record_has_three_escaped_fields() {
        let record = error_record("<b>\"x\" & 'y'</b>", "Server error", 1);

        assert_eq!(record.len(), 3);
        assert_eq!(
            record.get("error"),
            Some(&Bson::String("&lt;b&gt;&#34;x&#34; &amp; &#39;y&#39;&lt;/b&gt;".into()))
        );
        assert_eq!(record.get("type"), Some(&Bson::String("Server error".into())));
        assert_eq!(record.get("code"), Some(&Bson::Int32(1)));
    }

    #[test]
    fn errors_classify_into_taxonomy() {
        let err = RecordStoreError::Backend("connection reset".into());
        let record = err.to_record();

        assert_eq!(err.kind(), ErrorKind::DbError);
        assert_eq!(record.get_int_value("code").unwrap(), 2);
        assert_eq!(
            RecordStoreError::TypeMismatch { path: "a.b".into() }.kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            RecordStoreError::InvalidQuery("bad sort".into()).kind(),
            ErrorKind::QueryError
        );
    }
}
