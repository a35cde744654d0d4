//! Store session abstraction.
//!
//! This module defines the primitives the record engine needs from a document store, so the
//! engine can run against different stores (in-memory, MongoDB, ...).
//!
//! # Traits
//!
//! - [`StoreSession`]: a cloneable handle that executes single round trips against the store
//! - [`StoreConnector`]: factory that dials a store URI and returns the first session
//!
//! Sessions are cheap to clone. The [`ConnectionManager`](crate::connection::ConnectionManager)
//! keeps one established session and hands every operation its own clone, which is released
//! when it is dropped.
//!
//! Every method addresses a `(database, collection)` namespace explicitly. Collections that
//! don't exist yet behave as empty and are created on first write.

use async_trait::async_trait;
use bson::Document;
use std::fmt::Debug;

use crate::{error::RecordStoreResult, query::FindOptions};

/// Abstract interface for a session with a document store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`, and clones of one session must be usable from
/// different tasks at the same time without interfering with each other.
///
/// # Consistency
///
/// Sessions are expected to read and write through the primary with the strongest consistency
/// the store offers, so a read issued after a completed write observes that write.
#[async_trait]
pub trait StoreSession: Clone + Send + Sync + Debug {
    /// Returns the documents matching `filter`, honoring skip, limit and sort in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidQuery`](crate::error::RecordStoreError::InvalidQuery)
    /// if the filter or the sort specification cannot be executed, or a backend error.
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> RecordStoreResult<Vec<Document>>;

    /// Inserts a single document. The store assigns an `_id` if the document has none.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::DuplicateKey`](crate::error::RecordStoreError::DuplicateKey)
    /// if the document violates a uniqueness constraint.
    async fn insert(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> RecordStoreResult<()>;

    /// Updates the first document matching `filter`.
    ///
    /// If every key of `update` is an operator (starts with `$`), the operators are applied.
    /// Otherwise the matched document is replaced by `update`, keeping its `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::NotFound`](crate::error::RecordStoreError::NotFound) if no
    /// document matches.
    async fn update(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        update: Document,
    ) -> RecordStoreResult<()>;

    /// Replaces the first document matching `filter`, or inserts `document` if none matches.
    async fn upsert(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        document: Document,
    ) -> RecordStoreResult<()>;

    /// Counts the documents matching `filter`.
    async fn count(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
    ) -> RecordStoreResult<u64>;

    /// Removes every document matching `filter` and returns how many were removed.
    async fn remove(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
    ) -> RecordStoreResult<u64>;

    /// Releases the resources shared by every clone of this session.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> RecordStoreResult<()> {
        Ok(())
    }
}

/// Factory that establishes the initial session with a store.
#[async_trait]
pub trait StoreConnector: Send + Sync + Debug {
    type Session: StoreSession;

    /// Dials the store identified by `uri` and returns an established session.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Initialization`](crate::error::RecordStoreError::Initialization)
    /// if the URI is invalid or the store cannot be reached.
    async fn dial(&self, uri: &str) -> RecordStoreResult<Self::Session>;
}
