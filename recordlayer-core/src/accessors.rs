//! Typed field accessors built on dotted-path resolution.
//!
//! String accessors never fail: an unresolved path renders as an empty string. Integer
//! accessors are strict and only succeed when the stored value already has the requested
//! integer type. A double that happens to hold an integral value is a type mismatch.

use bson::Bson;

use crate::{
    error::{RecordStoreError, RecordStoreResult},
    path::{get_value, resolve, single_entry},
    record::{Record, display_value},
};

impl Record {
    /// Resolves a dotted path. See [`crate::path::get_value`].
    pub fn get_value(&self, path: &str) -> Bson {
        get_value(self.as_document(), path)
    }

    /// Resolves a dotted path and renders the value in its default textual form.
    pub fn get_string_value(&self, path: &str) -> String {
        display_value(&self.get_value(path))
    }

    /// Like [`Record::get_string_value`], but a sequence is first unwrapped to its first element.
    pub fn get_single_string_value(&self, path: &str) -> String {
        display_value(&single_entry(self.get_value(path)))
    }

    /// Resolves a dotted path to a 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TypeMismatch`] unless the value is stored as an `Int32`.
    pub fn get_int_value(&self, path: &str) -> RecordStoreResult<i32> {
        match resolve(self.as_document(), path) {
            Some(Bson::Int32(value)) => Ok(*value),
            _ => Err(RecordStoreError::TypeMismatch { path: path.to_string() }),
        }
    }

    /// Resolves a dotted path to a 64-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TypeMismatch`] unless the value is stored as an `Int64`.
    pub fn get_int64_value(&self, path: &str) -> RecordStoreResult<i64> {
        match resolve(self.as_document(), path) {
            Some(Bson::Int64(value)) => Ok(*value),
            _ => Err(RecordStoreError::TypeMismatch { path: path.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn sample() -> Record {
        Record::from(doc! {
            "dataset": "/a/b/c",
            "run": { "number": 42, "events": 1_000_000_i64, "lumi": 5.0 },
            "sites": [ { "name": "T1_US" }, { "name": "T2_CH" } ],
            "tags": ["raw", "reco"],
        })
    }

    #[test]
    fn string_values_always_succeed() {
        let record = sample();

        assert_eq!(record.get_string_value("dataset"), "/a/b/c");
        assert_eq!(record.get_string_value("run.number"), "42");
        assert_eq!(record.get_string_value("sites.name"), "T1_US");
        assert_eq!(record.get_string_value("tags"), "raw,reco");
        assert_eq!(record.get_string_value("run.missing"), "");
        assert_eq!(record.get_string_value("nothing.here"), "");
    }

    #[test]
    fn single_string_value_unwraps_sequences() {
        let record = sample();

        assert_eq!(record.get_single_string_value("tags"), "raw");
        assert_eq!(record.get_single_string_value("dataset"), "/a/b/c");
    }

    #[test]
    fn integer_accessors_match_exact_types() {
        let record = sample();

        assert_eq!(record.get_int_value("run.number").unwrap(), 42);
        assert_eq!(record.get_int64_value("run.events").unwrap(), 1_000_000);
        assert!(matches!(
            record.get_int64_value("run.number"),
            Err(RecordStoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn integral_double_is_not_coerced() {
        let record = sample();

        match record.get_int_value("run.lumi") {
            Err(RecordStoreError::TypeMismatch { path }) => assert_eq!(path, "run.lumi"),
            other => panic!("expected type mismatch, got {:?}", other),
        }
        assert!(record.get_int_value("run.missing").is_err());
    }
}
