//! In-memory document store for recordlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreSession` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Store-style filters** - Equality, comparison, membership and logical operators
//! - **Sorting and pagination** - Multi-key sorts, skip and limit
//! - **Uniqueness** - Store-assigned unique `_id` and optional unique indexes
//!
//! # Quick Start
//!
//! ```ignore
//! use recordlayer::{prelude::*, memory::InMemoryConnector, bson::doc};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = ConnectionManager::new("memory://quickstart", InMemoryConnector::new());
//!     manager.establish().await.unwrap();
//!
//!     let datasets = manager.collection("chess", "datasets");
//!     datasets.insert(vec![Record::from(doc! { "dataset": "/a/b/c" })]).await;
//!
//!     assert_eq!(datasets.count(&doc! {}).await, 1);
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as recordlayer_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryConnector, InMemoryStore, MEMORY_SCHEME};
