//! Record operations on one collection.
//!
//! A [`Collection`] is obtained from [`ConnectionManager::collection`] and runs every operation
//! as a single round trip on its own session clone.
//!
//! Operations report failures in three different ways, depending on what their callers need:
//!
//! - **Logged only**: [`Collection::insert`], [`Collection::get`], [`Collection::update`],
//!   [`Collection::count`] and [`Collection::remove`] log store errors and return an empty or
//!   zero result.
//! - **In-band**: [`Collection::get_sorted`] returns an error record as its only result when
//!   both the sorted and the unsorted fetch fail.
//! - **Returned**: [`Collection::upsert`] stops at the first store error and returns it.
//!
//! # Example
//!
//! ```ignore
//! use recordlayer::{prelude::*, bson::doc};
//!
//! let datasets = manager.collection("chess", "datasets");
//!
//! datasets.insert(vec![Record::from(doc! { "dataset": "/a/b/c" })]).await;
//! let found = datasets.get(&doc! { "dataset": "/a/b/c" }, 0, 1).await;
//! let newest_first = datasets.get_sorted(&doc! {}, &["-created"]).await;
//! ```

use bson::{Document, doc};
use tracing::{debug, warn};

use crate::{
    backend::{StoreConnector, StoreSession},
    connection::ConnectionManager,
    error::{ErrorKind, RecordStoreError, RecordStoreResult},
    query::{FindOptions, Sort},
    record::Record,
};

/// Field that keys a record for [`Collection::upsert`].
pub const DATASET_KEY: &str = "dataset";

/// A handle on one collection of one database.
#[derive(Debug)]
pub struct Collection<'a, C: StoreConnector> {
    database: String,
    name: String,
    manager: &'a ConnectionManager<C>,
}

impl<'a, C: StoreConnector> Collection<'a, C> {
    pub(crate) fn new(database: String, name: String, manager: &'a ConnectionManager<C>) -> Self {
        Self { database, name, manager }
    }

    /// Returns the name of the database holding this collection.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts records one at a time.
    ///
    /// A record the store rejects is logged and skipped; the remaining records are still
    /// inserted. Nothing is reported to the caller.
    pub async fn insert(&self, records: Vec<Record>) {
        let session = match self.manager.connect().await {
            Ok(session) => session,
            Err(err) => {
                warn!(namespace = %self.namespace(), error = %err, "Unable to insert records");
                return;
            }
        };

        for record in records {
            if let Err(err) = session
                .insert(&self.database, &self.name, record.as_document().clone())
                .await
            {
                warn!(
                    namespace = %self.namespace(),
                    record = %record.as_document(),
                    error = %err,
                    "Fail to insert record"
                );
            }
        }
    }

    /// Inserts or replaces records keyed by their `dataset` field.
    ///
    /// Records without a non-empty string `dataset` are logged and skipped; skipping is not a
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the first store error. Records after the failing one are not written, records
    /// before it stay written.
    pub async fn upsert(&self, records: Vec<Record>) -> RecordStoreResult<()> {
        let session = self.manager.connect().await?;

        for record in records {
            let dataset = match record.get_str(DATASET_KEY) {
                Ok(dataset) if !dataset.is_empty() => dataset.to_string(),
                _ => {
                    warn!(
                        namespace = %self.namespace(),
                        record = %record.as_document(),
                        "No dataset in record"
                    );
                    continue;
                }
            };

            let filter = doc! { DATASET_KEY: dataset };

            if let Err(err) = session
                .upsert(&self.database, &self.name, &filter, record.into_document())
                .await
            {
                warn!(
                    namespace = %self.namespace(),
                    filter = %filter,
                    error = %err,
                    "Fail to upsert record"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    /// Returns the records matching `filter`, skipping the first `offset`.
    ///
    /// A positive `limit` bounds the result; zero returns every match. A store error is
    /// logged and yields an empty result.
    pub async fn get(&self, filter: &Document, offset: usize, limit: usize) -> Vec<Record> {
        let options = FindOptions::builder()
            .skip(offset)
            .limit(limit)
            .build();

        match self.find(filter, &options).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    namespace = %self.namespace(),
                    filter = %filter,
                    error = %err,
                    "Unable to get records"
                );
                Vec::new()
            }
        }
    }

    /// Returns the records matching `filter` ordered by `sort_keys`.
    ///
    /// Keys sort ascending unless prefixed with `-`. If the sorted fetch fails, including
    /// because a key is invalid, the records are fetched unsorted instead. If that fails too,
    /// the result is a single [`ErrorKind::DbError`] error record.
    pub async fn get_sorted<S: AsRef<str>>(&self, filter: &Document, sort_keys: &[S]) -> Vec<Record> {
        let session = match self.manager.connect().await {
            Ok(session) => session,
            Err(err) => {
                warn!(namespace = %self.namespace(), error = %err, "Unable to find records");
                return vec![ErrorKind::DbError.record(&err.to_string())];
            }
        };

        let sorted = match Sort::parse_all(sort_keys) {
            Ok(sorts) => {
                let options = FindOptions::builder().sorts(sorts).build();
                session
                    .find(&self.database, &self.name, filter, &options)
                    .await
            }
            Err(err) => Err(err),
        };

        let err = match sorted {
            Ok(documents) => return into_records(documents),
            Err(err) => err,
        };

        warn!(
            namespace = %self.namespace(),
            filter = %filter,
            error = %err,
            "Unable to sort records"
        );

        match session
            .find(&self.database, &self.name, filter, &FindOptions::new())
            .await
        {
            Ok(documents) => into_records(documents),
            Err(err) => {
                warn!(
                    namespace = %self.namespace(),
                    filter = %filter,
                    error = %err,
                    "Unable to find records"
                );
                vec![ErrorKind::DbError.record(&err.to_string())]
            }
        }
    }

    /// Updates the first record matching `filter` with `new_data`.
    ///
    /// `new_data` is either a replacement document or a document of update operators.
    /// Failures, including no match, are logged only.
    pub async fn update(&self, filter: &Document, new_data: Document) {
        let result = match self.manager.connect().await {
            Ok(session) => {
                session
                    .update(&self.database, &self.name, filter, new_data.clone())
                    .await
            }
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            warn!(
                namespace = %self.namespace(),
                filter = %filter,
                data = %new_data,
                error = %err,
                "Unable to update record"
            );
        }
    }

    /// Counts the records matching `filter`.
    ///
    /// A store error is logged and counts as zero.
    pub async fn count(&self, filter: &Document) -> u64 {
        let result = match self.manager.connect().await {
            Ok(session) => session.count(&self.database, &self.name, filter).await,
            Err(err) => Err(err),
        };

        result.unwrap_or_else(|err| {
            warn!(
                namespace = %self.namespace(),
                filter = %filter,
                error = %err,
                "Unable to count records"
            );
            0
        })
    }

    /// Removes every record matching `filter`.
    ///
    /// Matching nothing is not an error. Other failures are logged only.
    pub async fn remove(&self, filter: &Document) {
        let result = match self.manager.connect().await {
            Ok(session) => session.remove(&self.database, &self.name, filter).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(removed) => debug!(namespace = %self.namespace(), removed, "Removed records"),
            Err(RecordStoreError::NotFound(_)) => {}
            Err(err) => warn!(
                namespace = %self.namespace(),
                filter = %filter,
                error = %err,
                "Unable to remove records"
            ),
        }
    }

    async fn find(&self, filter: &Document, options: &FindOptions) -> RecordStoreResult<Vec<Record>> {
        let session = self.manager.connect().await?;
        let documents = session
            .find(&self.database, &self.name, filter, options)
            .await?;

        Ok(into_records(documents))
    }

    fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }
}

fn into_records(documents: Vec<Document>) -> Vec<Record> {
    documents
        .into_iter()
        .map(Record::from)
        .collect()
}
