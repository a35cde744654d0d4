//! Lazily established, shared store connection.
//!
//! A [`ConnectionManager`] is created once when a service starts and passed by reference to
//! everything that accesses records. It dials the store on first use, keeps that single
//! session, and hands a clone of it to every operation.
//!
//! # Example
//!
//! ```ignore
//! use recordlayer::{connection::ConnectionManager, mongodb::MongoDbConnector};
//!
//! let manager = ConnectionManager::new("mongodb://localhost:27017", MongoDbConnector::new());
//!
//! // Dial eagerly so an unreachable store is reported at startup.
//! manager.establish().await?;
//!
//! let datasets = manager.collection("chess", "datasets");
//! let count = datasets.count(&doc! {}).await;
//! ```

use mea::mutex::Mutex;
use std::fmt;
use tracing::{debug, info};

use crate::{
    backend::{StoreConnector, StoreSession},
    collection::Collection,
    config::StoreConfig,
    error::RecordStoreResult,
};

/// Owner of the store URI and of at most one established session.
///
/// First callers of [`ConnectionManager::connect`] are serialized, so the store is dialed
/// exactly once no matter how many tasks race for the first session.
pub struct ConnectionManager<C: StoreConnector> {
    uri: String,
    connector: C,
    session: Mutex<Option<C::Session>>,
}

impl<C: StoreConnector> fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}

impl<C: StoreConnector> ConnectionManager<C> {
    /// Creates a manager for the store at `uri`. Nothing is dialed yet.
    pub fn new(uri: impl Into<String>, connector: C) -> Self {
        Self {
            uri: uri.into(),
            connector,
            session: Mutex::new(None),
        }
    }

    /// Creates a manager for the store configured in `config`.
    pub fn from_config(config: &StoreConfig, connector: C) -> Self {
        Self::new(config.uri.clone(), connector)
    }

    /// Returns the URI this manager dials.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns a clone of the shared session, dialing the store if no session exists yet.
    ///
    /// The returned clone belongs to the caller and is released when dropped.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the initial dial fails. A later call dials again.
    pub async fn connect(&self) -> RecordStoreResult<C::Session> {
        let mut guard = self.session.lock().await;

        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        debug!("Dialing document store");
        let session = self.connector.dial(&self.uri).await?;
        info!("Established document store session");

        *guard = Some(session.clone());

        Ok(session)
    }

    /// Dials the store now instead of on first use.
    ///
    /// Services call this at startup so that an unreachable store is reported to the hosting
    /// process, which decides whether to retry or abort.
    pub async fn establish(&self) -> RecordStoreResult<()> {
        self.connect().await.map(drop)
    }

    /// Returns `true` once a session has been established.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Returns a handle on one collection of one database.
    pub fn collection<'a>(&'a self, database: &str, collection: &str) -> Collection<'a, C> {
        Collection::new(database.to_string(), collection.to_string(), self)
    }

    /// Tears down the shared session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails to shut down cleanly.
    pub async fn shutdown(self) -> RecordStoreResult<()> {
        let session = self.session.lock().await.take();

        match session {
            Some(session) => {
                info!("Shutting down document store session");
                session.shutdown().await
            }
            None => Ok(()),
        }
    }
}
