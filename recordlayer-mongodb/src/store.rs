use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure},
    options::{Acknowledgment, ClientOptions, ReadConcern, ReadPreference, SelectionCriteria, WriteConcern},
};
use tracing::{debug, info};
use recordlayer_core::{
    backend::{StoreConnector, StoreSession},
    error::{RecordStoreError, RecordStoreResult},
    query::FindOptions,
};

use crate::query::translate_find_options;

const DUPLICATE_KEY_CODE: i32 = 11000;
const BAD_VALUE_CODE: i32 = 2;
const FAILED_TO_PARSE_CODE: i32 = 9;


/// A session with a MongoDB deployment.
///
/// Clones share the driver's connection pool.
#[derive(Debug, Clone)]
pub struct MongoDbSession {
    client: Client,
}

impl MongoDbSession {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, database: &str, collection: &str) -> MongoCollection<Document> {
        self.client
            .database(database)
            .collection(collection)
    }
}

#[async_trait]
impl StoreSession for MongoDbSession {
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> RecordStoreResult<Vec<Document>> {
        self.get_collection(database, collection)
            .find(filter.clone())
            .with_options(translate_find_options(options))
            .await
            .map_err(|e| map_error(e, database, collection))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| map_error(e, database, collection))
    }

    async fn insert(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> RecordStoreResult<()> {
        self.get_collection(database, collection)
            .insert_one(document)
            .await
            .map_err(|e| map_error(e, database, collection))?;

        Ok(())
    }

    async fn update(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        update: Document,
    ) -> RecordStoreResult<()> {
        let target = self.get_collection(database, collection);
        let operators = !update.is_empty() && update.keys().all(|k| k.starts_with('$'));

        let result = match operators {
            true => target.update_one(filter.clone(), update).await,
            false => target.replace_one(filter.clone(), update).await,
        };
        let result = result.map_err(|e| map_error(e, database, collection))?;

        if result.matched_count == 0 {
            return Err(RecordStoreError::NotFound(format!(
                "no document in {}.{} matches {}",
                database, collection, filter
            )));
        }

        Ok(())
    }

    async fn upsert(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        document: Document,
    ) -> RecordStoreResult<()> {
        self.get_collection(database, collection)
            .replace_one(filter.clone(), document)
            .upsert(true)
            .await
            .map_err(|e| map_error(e, database, collection))?;

        Ok(())
    }

    async fn count(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
    ) -> RecordStoreResult<u64> {
        self.get_collection(database, collection)
            .count_documents(filter.clone())
            .await
            .map_err(|e| map_error(e, database, collection))
    }

    async fn remove(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
    ) -> RecordStoreResult<u64> {
        Ok(
            self.get_collection(database, collection)
                .delete_many(filter.clone())
                .await
                .map_err(|e| map_error(e, database, collection))?
                .deleted_count
        )
    }

    async fn shutdown(self) -> RecordStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Dials MongoDB deployments with strong consistency settings.
#[derive(Debug, Clone, Default)]
pub struct MongoDbConnector {
    app_name: Option<String>,
}

impl MongoDbConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports `app_name` to the server in the connection handshake.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

#[async_trait]
impl StoreConnector for MongoDbConnector {
    type Session = MongoDbSession;

    async fn dial(&self, uri: &str) -> RecordStoreResult<Self::Session> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| RecordStoreError::Initialization(e.to_string()))?;

        options.selection_criteria = Some(SelectionCriteria::ReadPreference(ReadPreference::Primary));
        options.read_concern = Some(ReadConcern::majority());
        options.write_concern = Some(
            WriteConcern::builder()
                .w(Acknowledgment::Majority)
                .journal(true)
                .build()
        );
        if self.app_name.is_some() {
            options.app_name = self.app_name.clone();
        }

        debug!(hosts = ?options.hosts, "Dialing MongoDB deployment");

        let client = Client::with_options(options)
            .map_err(|e| RecordStoreError::Initialization(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| RecordStoreError::Initialization(e.to_string()))?;

        info!("Connected to MongoDB deployment");

        Ok(MongoDbSession::new(client))
    }
}

fn map_error(err: MongoError, database: &str, collection: &str) -> RecordStoreError {
    match err.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            RecordStoreError::DuplicateKey(
                write_error.message.clone(),
                format!("{}.{}", database, collection),
            )
        }
        MongoErrorKind::Command(command_error)
            if [BAD_VALUE_CODE, FAILED_TO_PARSE_CODE].contains(&command_error.code) =>
        {
            RecordStoreError::InvalidQuery(command_error.message.clone())
        }
        _ => RecordStoreError::Backend(err.to_string()),
    }
}
