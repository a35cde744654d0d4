//! Main recordlayer crate providing schema-less record access over a shared document store
//! connection.
//!
//! This crate is the primary entry point for services that read and write records. It
//! re-exports the core types from the sub-crates and provides access to the store sessions.
//!
//! # Features
//!
//! - **Schema-less records** - Nested documents addressed by dotted paths, rendered as JSON or text
//! - **Typed accessors** - String and integer extraction with strict integer typing
//! - **Error records** - Failures encoded as ordinary records for result sets
//! - **One shared connection** - Dialed lazily, exactly once, and cloned per operation
//! - **Multiple stores** - In-memory and MongoDB sessions behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use recordlayer::{prelude::*, memory::InMemoryConnector, bson::doc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RecordStoreError> {
//!     let manager = ConnectionManager::new("memory://", InMemoryConnector::new());
//!     manager.establish().await?;
//!
//!     let datasets = manager.collection("chess", "datasets");
//!
//!     datasets
//!         .upsert(vec![Record::from_json(r#"{"dataset": "/a/b/c", "run": {"number": 1}}"#)?])
//!         .await?;
//!
//!     for record in datasets.get(&doc! { "dataset": "/a/b/c" }, 0, 1).await {
//!         println!("{}", record.to_json()?);
//!         assert_eq!(record.get_int_value("run.number")?, 1);
//!     }
//!
//!     manager.shutdown().await
//! }
//! ```
//!
//! # Configuration
//!
//! Services usually read the store location from their configuration file:
//!
//! ```ignore
//! use recordlayer::{prelude::*, mongodb::MongoDbConnector};
//!
//! let config = StoreConfig::from_file("server.yaml")?;
//! let manager = ConnectionManager::from_config(&config, MongoDbConnector::new());
//! let records = config.collection(&manager);
//! ```
//!
//! # Stores
//!
//! - [`memory`] - In-memory store for development and testing
//! - [`mongodb`] - MongoDB store (requires `mongodb` feature)

pub mod prelude;

pub use recordlayer_core::{
    accessors, backend, collection, config, connection, error, path, query, record,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory store implementations.
pub mod memory {
    pub use recordlayer_memory::{InMemoryConnector, InMemoryStore, MEMORY_SCHEME};
}

/// MongoDB store implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use recordlayer_mongodb::{MongoDbConnector, MongoDbSession};
}
