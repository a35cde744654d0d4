//! Filter document evaluation for in-memory documents.
//!
//! This module evaluates filters written in the store's query language against BSON documents:
//! field equality on (dotted) field names, the comparison operators `$eq`, `$ne`, `$gt`, `$gte`,
//! `$lt`, `$lte`, `$in`, `$nin` and `$exists`, and the logical operators `$and`, `$or` and
//! `$nor`. It also provides the value ordering used for sorting.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use recordlayer_core::error::{RecordStoreError, RecordStoreResult};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `5`, `5_i64` and `5.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// ObjectId value
    ObjectId(ObjectId),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Rank of the value's type in the store's cross-type sort order.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total ordering used for sorting: by type rank first, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

/// Looks up a dotted field name. Numeric segments index into arrays.
pub(crate) fn lookup<'a>(document: &'a Document, field: &str) -> Option<&'a Bson> {
    let mut segments = field.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(doc) => doc.get(segment)?,
            Bson::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Collects every value a dotted field name reaches, the way the store matches filters.
///
/// A numeric segment indexes into an array. Any other segment on an array fans out over the
/// array's document elements, so `sites.name` reaches the `name` of every site.
pub(crate) fn lookup_all<'a>(document: &'a Document, field: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = field.split('.').collect();
    let mut found = Vec::new();

    if let Some((head, rest)) = segments.split_first() {
        if let Some(value) = document.get(*head) {
            collect_values(value, rest, &mut found);
        }
    }

    found
}

fn collect_values<'a>(value: &'a Bson, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((segment, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(next) = doc.get(*segment) {
                collect_values(next, rest, found);
            }
        }
        Bson::Array(items) => match segment.parse::<usize>() {
            Ok(index) => {
                if let Some(next) = items.get(index) {
                    collect_values(next, rest, found);
                }
            }
            Err(_) => {
                for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                    collect_values(item, segments, found);
                }
            }
        },
        _ => {}
    }
}

pub(crate) struct FilterEvaluator<'a> {
    document: &'a Document,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns whether the document satisfies every condition of `filter`.
    ///
    /// An empty filter matches every document.
    pub fn evaluate(&self, filter: &Document) -> RecordStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in clauses(key, condition)? {
                        all &= self.evaluate(clause)?;
                    }
                    all
                }
                "$or" => {
                    let mut any = false;
                    for clause in clauses(key, condition)? {
                        any |= self.evaluate(clause)?;
                    }
                    any
                }
                "$nor" => {
                    let mut any = false;
                    for clause in clauses(key, condition)? {
                        any |= self.evaluate(clause)?;
                    }
                    !any
                }
                op if op.starts_with('$') => {
                    return Err(RecordStoreError::InvalidQuery(format!("unknown top level operator: {}", op)));
                }
                field => self.evaluate_field(field, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns the documents of `documents` matching `filter`.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> RecordStoreResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if FilterEvaluator::new(document).evaluate(filter)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }

    fn evaluate_field(&self, field: &str, condition: &Bson) -> RecordStoreResult<bool> {
        let values = lookup_all(self.document, field);

        match condition {
            Bson::Document(ops) if is_operator_document(ops) => {
                for (op, operand) in ops {
                    if !apply_operator(&values, op, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            expected => Ok(equals(&values, expected)),
        }
    }
}

/// Returns whether every key of a non-empty document is an operator.
pub(crate) fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|k| k.starts_with('$'))
}

fn clauses<'b>(op: &str, condition: &'b Bson) -> RecordStoreResult<Vec<&'b Document>> {
    match condition {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_document().ok_or_else(|| {
                RecordStoreError::InvalidQuery(format!("{} entries must be documents", op))
            }))
            .collect(),
        _ => Err(RecordStoreError::InvalidQuery(format!("{} requires a non-empty array", op))),
    }
}

/// Equality with the store's array semantics: a field matches when any reached value, or any
/// element of a reached array, equals `expected`. A field that reaches nothing matches `null`.
fn equals(values: &[&Bson], expected: &Bson) -> bool {
    if values.is_empty() {
        return matches!(expected, Bson::Null);
    }

    let expected = Comparable::from(expected);

    values.iter().any(|value| {
        Comparable::from(*value) == expected
            || match value {
                Bson::Array(items) => items
                    .iter()
                    .any(|item| Comparable::from(item) == expected),
                _ => false,
            }
    })
}

fn compare(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);
    let check = |item: &Bson| match Comparable::from(item).partial_cmp(&operand) {
        Some(ordering) => accept(ordering),
        None => false,
    };

    values.iter().any(|value| match value {
        Bson::Array(items) => items.iter().any(|item| check(item)),
        item => check(item),
    })
}

fn apply_operator(values: &[&Bson], op: &str, operand: &Bson) -> RecordStoreResult<bool> {
    Ok(match op {
        "$eq" => equals(values, operand),
        "$ne" => !equals(values, operand),
        "$gt" => compare(values, operand, |o| o == Ordering::Greater),
        "$gte" => compare(values, operand, |o| o != Ordering::Less),
        "$lt" => compare(values, operand, |o| o == Ordering::Less),
        "$lte" => compare(values, operand, |o| o != Ordering::Greater),
        "$in" | "$nin" => {
            let candidates = operand.as_array().ok_or_else(|| {
                RecordStoreError::InvalidQuery(format!("{} requires an array", op))
            })?;
            let found = candidates
                .iter()
                .any(|candidate| equals(values, candidate));

            if op == "$in" { found } else { !found }
        }
        "$exists" => {
            let should_exist = match operand {
                Bson::Boolean(b) => *b,
                Bson::Int32(n) => *n != 0,
                Bson::Int64(n) => *n != 0,
                Bson::Double(n) => *n != 0.0,
                _ => true,
            };
            !values.is_empty() == should_exist
        }
        _ => return Err(RecordStoreError::InvalidQuery(format!("unknown operator: {}", op))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn matches(document: &Document, filter: Document) -> bool {
        FilterEvaluator::new(document).evaluate(&filter).unwrap()
    }

    #[test]
    fn equality_on_nested_and_array_fields() {
        let document = doc! {
            "dataset": "/a/b/c",
            "meta": { "site": "T1_US", "size": 10 },
            "tags": ["raw", "reco"],
        };

        assert!(matches(&document, doc! {}));
        assert!(matches(&document, doc! { "dataset": "/a/b/c" }));
        assert!(matches(&document, doc! { "meta.site": "T1_US", "meta.size": 10.0 }));
        assert!(matches(&document, doc! { "tags": "reco" }));
        assert!(matches(&document, doc! { "missing": null }));
        assert!(!matches(&document, doc! { "dataset": "/x" }));
    }

    #[test]
    fn dotted_fields_reach_into_arrays_of_documents() {
        let document = doc! {
            "dataset": "/a",
            "sites": [ { "name": "T1_US", "size": 3 }, { "name": "T2_CH", "size": 9 } ],
        };

        assert!(matches(&document, doc! { "sites.name": "T1_US" }));
        assert!(matches(&document, doc! { "sites.name": "T2_CH" }));
        assert!(matches(&document, doc! { "sites.1.name": "T2_CH" }));
        assert!(!matches(&document, doc! { "sites.0.name": "T2_CH" }));
        assert!(matches(&document, doc! { "sites.size": { "$gt": 5 } }));
        assert!(matches(&document, doc! { "sites.name": { "$in": ["T3_IT", "T2_CH"] } }));
        assert!(!matches(&document, doc! { "sites.name": { "$ne": "T1_US" } }));
        assert!(matches(&document, doc! { "sites.name": { "$exists": true } }));
        assert!(!matches(&document, doc! { "sites.tier": { "$exists": true } }));
    }

    #[test]
    fn comparison_and_membership_operators() {
        let document = doc! { "size": 10, "site": "T2_CH" };

        assert!(matches(&document, doc! { "size": { "$gt": 5, "$lte": 10 } }));
        assert!(!matches(&document, doc! { "size": { "$lt": 10 } }));
        assert!(matches(&document, doc! { "site": { "$in": ["T1_US", "T2_CH"] } }));
        assert!(matches(&document, doc! { "site": { "$nin": ["T1_US"] } }));
        assert!(matches(&document, doc! { "size": { "$ne": 3 } }));
        assert!(matches(&document, doc! { "missing": { "$exists": false } }));
        assert!(!matches(&document, doc! { "size": { "$exists": 0 } }));
    }

    #[test]
    fn logical_operators() {
        let document = doc! { "size": 10, "site": "T2_CH" };

        assert!(matches(&document, doc! { "$or": [ { "size": 1 }, { "site": "T2_CH" } ] }));
        assert!(!matches(&document, doc! { "$and": [ { "size": 10 }, { "site": "T1_US" } ] }));
        assert!(matches(&document, doc! { "$nor": [ { "size": 1 } ] }));
    }

    #[test]
    fn unknown_operators_are_invalid() {
        let document = doc! { "size": 10 };

        assert!(matches!(
            FilterEvaluator::new(&document).evaluate(&doc! { "size": { "$near": 1 } }),
            Err(RecordStoreError::InvalidQuery(_))
        ));
        assert!(FilterEvaluator::new(&document).evaluate(&doc! { "$where": "1" }).is_err());
        assert!(FilterEvaluator::new(&document).evaluate(&doc! { "$or": [] }).is_err());
    }

    #[test]
    fn sort_order_ranks_types() {
        let null = Bson::Null;
        let number = Bson::Int32(3);
        let text = Bson::String("a".into());

        assert_eq!(Comparable::from(&null).sort_cmp(&Comparable::from(&number)), Ordering::Less);
        assert_eq!(Comparable::from(&text).sort_cmp(&Comparable::from(&number)), Ordering::Greater);
        assert_eq!(
            Comparable::from(&Bson::Double(2.5)).sort_cmp(&Comparable::from(&number)),
            Ordering::Less
        );
    }
}
