//! MongoDB session implementation for recordlayer.
//!
//! This crate provides a MongoDB-based implementation of the `StoreSession` trait over the
//! official async driver.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! recordlayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Consistency
//!
//! Sessions read from and write to the primary only, with majority read concern and
//! majority, journaled write concern. Reads never observe stale data.
//!
//! # Connection
//!
//! Dialing parses the connection string, builds the client and pings the deployment, so an
//! unreachable store is reported by [`ConnectionManager::establish`] instead of by the first
//! query.
//!
//! [`ConnectionManager::establish`]: recordlayer_core::connection::ConnectionManager::establish
//!
//! # Example
//!
//! ```ignore
//! use recordlayer::{prelude::*, mongodb::MongoDbConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ConnectionManager::new("mongodb://localhost:27017", MongoDbConnector::new());
//!     manager.establish().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as recordlayer_mongodb;

pub mod store;
pub mod query;

pub use store::{MongoDbConnector, MongoDbSession};
