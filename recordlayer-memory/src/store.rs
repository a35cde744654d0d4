//! In-memory storage implementation of a store session.
//!
//! This module provides a session that keeps documents in insertion order inside HashMaps
//! guarded by an async-safe read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, doc, oid::ObjectId};
use tracing::debug;

use recordlayer_core::{
    backend::{StoreConnector, StoreSession},
    error::{RecordStoreError, RecordStoreResult},
    query::{FindOptions, SortDirection},
    record::ID_KEY,
};

use crate::evaluator::{Comparable, FilterEvaluator, is_operator_document, lookup};

/// URI scheme accepted by [`InMemoryConnector`].
pub const MEMORY_SCHEME: &str = "memory://";

#[derive(Debug, Default)]
struct CollectionData {
    /// Documents in insertion order.
    documents: Vec<Document>,
    /// Fields that must hold distinct values, in addition to `_id`.
    unique_fields: Vec<String>,
}

type StoreMap = HashMap<(String, String), CollectionData>;


/// Thread-safe in-memory document store session.
///
/// This struct implements the [`StoreSession`] trait entirely in memory. Every document gets a
/// store-assigned `_id` on insert if it has none, and `_id` is unique per collection.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Multiple clones of
/// the same instance share the same underlying data, which makes every clone behave like a
/// session on the same store.
///
/// # Example
///
/// ```ignore
/// use recordlayer_memory::InMemoryStore;
/// use recordlayer::backend::StoreSession;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert("chess", "datasets", doc! { "dataset": "/a/b/c" }).await?;
///
/// assert_eq!(store.count("chess", "datasets", &doc! {}).await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: (database, collection) -> documents
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Requires `field` to hold distinct values across the documents of a collection.
    ///
    /// Documents without the field are not constrained.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::DuplicateKey`] if existing documents already violate the
    /// constraint.
    pub async fn add_unique_index(
        &self,
        database: &str,
        collection: &str,
        field: &str,
    ) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;
        let data = store
            .entry(namespace(database, collection))
            .or_default();

        for (position, document) in data.documents.iter().enumerate() {
            check_field_unique(data, document, field, Some(position), database, collection)?;
        }

        if !data.unique_fields.iter().any(|f| f == field) {
            data.unique_fields.push(field.to_string());
        }

        Ok(())
    }
}

fn namespace(database: &str, collection: &str) -> (String, String) {
    (database.to_string(), collection.to_string())
}

fn check_field_unique(
    data: &CollectionData,
    candidate: &Document,
    field: &str,
    skip: Option<usize>,
    database: &str,
    collection: &str,
) -> RecordStoreResult<()> {
    let Some(raw) = lookup(candidate, field) else {
        return Ok(());
    };
    let value = Comparable::from(raw);

    let duplicate = data.documents
        .iter()
        .enumerate()
        .filter(|(position, _)| Some(*position) != skip)
        .filter_map(|(_, document)| lookup(document, field))
        .any(|existing| Comparable::from(existing) == value);

    if duplicate {
        return Err(RecordStoreError::DuplicateKey(
            format!("{}: {}", field, raw),
            format!("{}.{}", database, collection),
        ));
    }

    Ok(())
}

fn check_unique(
    data: &CollectionData,
    candidate: &Document,
    skip: Option<usize>,
    database: &str,
    collection: &str,
) -> RecordStoreResult<()> {
    check_field_unique(data, candidate, ID_KEY, skip, database, collection)?;

    for field in &data.unique_fields {
        check_field_unique(data, candidate, field, skip, database, collection)?;
    }

    Ok(())
}

/// Puts `_id` first, taking it from `id` when the document doesn't carry one.
fn with_id(id: Bson, document: Document) -> RecordStoreResult<Document> {
    if let Some(own) = document.get(ID_KEY) {
        if Comparable::from(own) != Comparable::from(&id) {
            return Err(RecordStoreError::InvalidRecord(format!(
                "the field '{}' is immutable",
                ID_KEY
            )));
        }
    }

    Ok(id_first(id, document))
}

fn assign_id(document: Document) -> Document {
    let id = document
        .get(ID_KEY)
        .cloned()
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    id_first(id, document)
}

fn id_first(id: Bson, document: Document) -> Document {
    let mut prepared = doc! { ID_KEY: id };
    for (key, value) in document {
        if key != ID_KEY {
            prepared.insert(key, value);
        }
    }

    prepared
}

fn apply_operators(target: &mut Document, update: Document) -> RecordStoreResult<()> {
    for (op, operand) in update {
        let fields = match operand {
            Bson::Document(fields) => fields,
            _ => return Err(RecordStoreError::InvalidQuery(format!("{} requires a document", op))),
        };

        match op.as_str() {
            "$set" => {
                for (field, value) in fields {
                    target.insert(field, value);
                }
            }
            "$unset" => {
                for (field, _) in fields {
                    target.remove(&field);
                }
            }
            _ => return Err(RecordStoreError::InvalidQuery(format!("unsupported update operator: {}", op))),
        }
    }

    Ok(())
}

fn first_match(documents: &[Document], filter: &Document) -> RecordStoreResult<Option<usize>> {
    for (position, document) in documents.iter().enumerate() {
        if FilterEvaluator::new(document).evaluate(filter)? {
            return Ok(Some(position));
        }
    }

    Ok(None)
}


#[async_trait]
impl StoreSession for InMemoryStore {
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> RecordStoreResult<Vec<Document>> {
        for sort in &options.sort {
            if sort.field.is_empty() || sort.field.starts_with('$') {
                return Err(RecordStoreError::InvalidQuery(format!("bad sort field '{}'", sort.field)));
            }
        }

        let store = self.store.read().await;
        let mut documents = match store.get(&namespace(database, collection)) {
            Some(data) => FilterEvaluator::filter_documents(&data.documents, filter)?,
            None => {
                // Still reject invalid filters on collections that don't exist yet
                FilterEvaluator::new(&Document::new()).evaluate(filter)?;
                vec![]
            }
        };

        if !options.sort.is_empty() {
            documents.sort_by(|a, b| {
                options.sort
                    .iter()
                    .map(|sort| {
                        let left = lookup(a, &sort.field)
                            .map(Comparable::from)
                            .unwrap_or(Comparable::Null);
                        let right = lookup(b, &sort.field)
                            .map(Comparable::from)
                            .unwrap_or(Comparable::Null);

                        match sort.direction {
                            SortDirection::Asc => left.sort_cmp(&right),
                            SortDirection::Desc => right.sort_cmp(&left),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        Ok(
            documents
                .into_iter()
                .skip(options.skip)
                .take(options.limit.unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn insert(&self, database: &str, collection: &str, document: Document) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;
        let data = store
            .entry(namespace(database, collection))
            .or_default();

        let document = assign_id(document);
        check_unique(data, &document, None, database, collection)?;
        data.documents.push(document);

        Ok(())
    }

    async fn update(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        update: Document,
    ) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;
        let not_found = || RecordStoreError::NotFound(format!("no document in {}.{} matches {}", database, collection, filter));

        let data = store
            .get_mut(&namespace(database, collection))
            .ok_or_else(not_found)?;
        let position = first_match(&data.documents, filter)?.ok_or_else(not_found)?;

        let updated = if is_operator_document(&update) {
            let mut updated = data.documents[position].clone();
            apply_operators(&mut updated, update)?;
            updated
        } else {
            let id = data.documents[position]
                .get(ID_KEY)
                .cloned()
                .unwrap_or(Bson::Null);
            with_id(id, update)?
        };

        check_unique(data, &updated, Some(position), database, collection)?;
        data.documents[position] = updated;

        Ok(())
    }

    async fn upsert(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        document: Document,
    ) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;
        let data = store
            .entry(namespace(database, collection))
            .or_default();

        match first_match(&data.documents, filter)? {
            Some(position) => {
                let id = data.documents[position]
                    .get(ID_KEY)
                    .cloned()
                    .unwrap_or(Bson::Null);
                let replacement = with_id(id, document)?;

                check_unique(data, &replacement, Some(position), database, collection)?;
                data.documents[position] = replacement;
            }
            None => {
                let document = assign_id(document);

                check_unique(data, &document, None, database, collection)?;
                debug!(database, collection, "Upsert inserted a new document");
                data.documents.push(document);
            }
        }

        Ok(())
    }

    async fn count(&self, database: &str, collection: &str, filter: &Document) -> RecordStoreResult<u64> {
        Ok(self.find(database, collection, filter, &FindOptions::new()).await?.len() as u64)
    }

    async fn remove(&self, database: &str, collection: &str, filter: &Document) -> RecordStoreResult<u64> {
        let mut store = self.store.write().await;
        let Some(data) = store.get_mut(&namespace(database, collection)) else {
            return Ok(0);
        };

        let mut matched = Vec::with_capacity(data.documents.len());
        for document in &data.documents {
            matched.push(FilterEvaluator::new(document).evaluate(filter)?);
        }

        let removed = matched.iter().filter(|m| **m).count() as u64;
        let mut flags = matched.into_iter();
        data.documents.retain(|_| !flags.next().unwrap_or(false));

        Ok(removed)
    }
}


/// Connector handing out sessions on an [`InMemoryStore`].
///
/// Accepts URIs of the form `memory://<name>`. Every dial returns a clone of the same store,
/// so a store prepared before dialing (e.g. with unique indexes) is what sessions see.
#[derive(Default, Clone, Debug)]
pub struct InMemoryConnector {
    store: InMemoryStore,
}

impl InMemoryConnector {
    /// Creates a connector on a fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector on an existing store.
    pub fn with_store(store: InMemoryStore) -> Self {
        Self { store }
    }

    /// Returns the store sessions are dialed on.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    type Session = InMemoryStore;

    async fn dial(&self, uri: &str) -> RecordStoreResult<Self::Session> {
        if !uri.starts_with(MEMORY_SCHEME) {
            return Err(RecordStoreError::Initialization(format!(
                "unsupported URI '{}', expected {}<name>",
                uri, MEMORY_SCHEME
            )));
        }

        Ok(self.store.clone())
    }
}
