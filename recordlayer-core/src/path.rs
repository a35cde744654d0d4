//! Dotted-path field resolution over nested documents.
//!
//! A path such as `"meta.site.name"` is resolved one segment at a time. Every segment but the
//! last has to lead to a nested document, to a sequence whose first element is a document, or
//! the resolution stops. When it stops, [`get_value`] yields the empty-string sentinel.
//!
//! These functions only depend on the value tree and can be used on any document, whether it
//! came from the store or was built by hand.

use bson::{Bson, Document};
use tracing::warn;

/// The value returned when a path cannot be resolved.
pub fn unresolved() -> Bson {
    Bson::String(String::new())
}

/// Resolves a dotted path, borrowing the value it leads to.
///
/// Returns `None` when a key along the path is absent or when an intermediate value has a
/// shape that cannot be descended into.
pub fn resolve<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    resolve_from(document, path, 0)
}

fn resolve_from<'a>(document: &'a Document, path: &str, depth: usize) -> Option<&'a Bson> {
    let Some((head, rest)) = path.split_once('.') else {
        let value = document.get(path);
        if value.is_none() && depth > 0 {
            warn!(key = path, depth, "Unable to find key in nested record");
        }
        return value;
    };

    let Some(value) = document.get(head) else {
        warn!(key = head, path, "Unable to find key value in record");
        return None;
    };

    let nested = match value {
        Bson::Document(nested) => nested,
        Bson::Array(items) => match items.first() {
            Some(Bson::Document(nested)) => nested,
            None | Some(Bson::Null) => return None,
            Some(other) => {
                warn!(
                    element_type = ?other.element_type(),
                    key = head,
                    path,
                    "Unknown type of first sequence element"
                );
                return None;
            }
        },
        other => {
            warn!(element_type = ?other.element_type(), key = head, path, "Unknown type");
            return None;
        }
    };

    resolve_from(nested, rest, depth + 1)
}

/// Resolves a dotted path to an owned value, or to [`unresolved`] when resolution fails.
pub fn get_value(document: &Document, path: &str) -> Bson {
    resolve(document, path)
        .cloned()
        .unwrap_or_else(unresolved)
}

/// Unwraps a sequence to its first element. Any other value is returned unchanged.
pub fn single_entry(value: Bson) -> Bson {
    match value {
        Bson::Array(items) => items
            .into_iter()
            .next()
            .unwrap_or_else(unresolved),
        other => other,
    }
}
