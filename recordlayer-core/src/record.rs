//! The schema-less record value and its renderings.
//!
//! A [`Record`] owns a BSON document. It is built fresh for every query result, write payload
//! or error report and has no identity beyond the call that produced it.
//!
//! Two renderings are provided:
//!
//! - [`Record::to_json`] - indented JSON of every field, `_id` included
//! - [`Record`]'s `Display` - newline separated `key:value` lines without `_id`
//!
//! Both emit fields in sorted key order.

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, ser::PrettyFormatter};

use crate::error::{RecordStoreError, RecordStoreResult};

/// Key under which the store keeps a document's assigned identity.
pub const ID_KEY: &str = "_id";

/// A schema-less document record.
///
/// Dereferences to [`bson::Document`], so fields are read and written with the usual
/// document API.
///
/// # Example
///
/// ```ignore
/// use recordlayer::{record::Record, bson::doc};
///
/// let record = Record::from(doc! { "_id": 1, "name": "x" });
/// assert_eq!(record.to_string(), "name:x");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Document);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self(Document::new())
    }

    /// Builds a record from a JSON object, e.g. a request body.
    ///
    /// Integers that fit 32 bits become `Int32`, larger ones `Int64`, anything else `Double`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the input is not valid JSON, or an invalid record
    /// error if it is valid JSON but not an object.
    pub fn from_json(input: &str) -> RecordStoreResult<Self> {
        let value: Value = serde_json::from_str(input)?;

        match json_to_bson(value) {
            Bson::Document(document) => Ok(Self(document)),
            other => Err(RecordStoreError::InvalidRecord(format!(
                "expected a JSON object, got {:?}",
                other.element_type()
            ))),
        }
    }

    /// Renders the record as JSON indented with four spaces, `_id` included.
    ///
    /// Object ids are written as their hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be represented as JSON.
    pub fn to_json(&self) -> RecordStoreResult<String> {
        let value = plain_json(Bson::Document(self.0.clone()))?;
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));

        value.serialize(&mut serializer)?;

        String::from_utf8(buffer).map_err(|e| RecordStoreError::Serialization(e.to_string()))
    }

    /// Returns a reference to the underlying document.
    pub fn as_document(&self) -> &Document {
        &self.0
    }

    /// Consumes the record and returns the underlying document.
    pub fn into_document(self) -> Document {
        self.0
    }
}

impl Deref for Record {
    type Target = Document;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Document> for Record {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

impl From<Record> for Document {
    fn from(record: Record) -> Self {
        record.0
    }
}

impl From<Record> for Bson {
    fn from(record: Record) -> Self {
        Bson::Document(record.0)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<(&String, &Bson)> =
            self.0.iter().filter(|(k, _)| k.as_str() != ID_KEY).collect();
        fields.sort_by(|(a, _), (b, _)| a.cmp(b));

        let lines: Vec<String> = fields
            .into_iter()
            .map(|(key, value)| format!("{}:{}", key, render_field(value)))
            .collect();

        f.write_str(&lines.join("\n"))
    }
}

/// Field formatting used by the `key:value` rendering.
fn render_field(value: &Bson) -> String {
    match value {
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Double(v) if is_integral(*v) => (*v as i64).to_string(),
        Bson::Double(v) => format!("{:.6}", v),
        _ => display_value(value),
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

/// Default textual form of a value.
///
/// Strings render without quotes, sequences render their elements comma-joined and nested
/// documents render as compact JSON.
pub fn display_value(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Double(v) => format_double(*v),
        Bson::Boolean(v) => v.to_string(),
        Bson::Null => "null".to_string(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Bson::Document(document) => plain_json(Bson::Document(document.clone()))
            .map(|v| v.to_string())
            .unwrap_or_else(|_| value.to_string()),
        other => other.to_string(),
    }
}

fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(v) => Bson::Boolean(v),
        Value::Number(n) => match n.as_i64() {
            Some(v) => i32::try_from(v).map(Bson::Int32).unwrap_or(Bson::Int64(v)),
            None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.into_iter()
                .map(|(k, v)| (k, json_to_bson(v)))
                .collect(),
        ),
    }
}

/// Shortest representation, switching to exponent form (`1e+21`, `1.5e-07`) below 1e-4
/// and from 1e6 on.
fn format_double(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "+Inf".to_string() } else { "-Inf".to_string() };
    }
    if value.is_nan() || value == 0.0 {
        return value.to_string();
    }

    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..6).contains(&exponent) {
        value.to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// JSON form of a value with object ids as hex strings and keys sorted.
fn plain_json(value: Bson) -> RecordStoreResult<Value> {
    Ok(sorted(serde_json::to_value(hex_object_ids(value))?))
}

fn hex_object_ids(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .map(|(k, v)| (k, hex_object_ids(v)))
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.into_iter().map(hex_object_ids).collect()),
        other => other,
    }
}

/// Rebuilds JSON objects with their keys in sorted order, regardless of map ordering features.
fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sorted(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}
