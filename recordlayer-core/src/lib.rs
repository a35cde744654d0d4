//! A schema-less document record access layer over a shared document store connection.
//!
//! This crate is the core of the recordlayer project and provides:
//!
//! - **Records** ([`record`]) - The schema-less record value and its JSON and text renderings
//! - **Path resolution** ([`path`]) - Dotted-path lookups through nested documents and sequences
//! - **Typed accessors** ([`accessors`]) - String and integer extraction on top of path resolution
//! - **Error handling** ([`error`]) - Error types, the error taxonomy and error records
//! - **Store sessions** ([`backend`]) - Traits for implementing document store sessions
//! - **Connection management** ([`connection`]) - The lazily dialed, shared store session
//! - **Record operations** ([`collection`]) - Insert, upsert, get, sorted get, update, count, remove
//! - **Find options** ([`query`]) - Skip, limit and sort key parsing
//! - **Configuration** ([`config`]) - Store URI and namespace settings
//!
//! # Example
//!
//! ```ignore
//! use recordlayer::{prelude::*, memory::InMemoryConnector, bson::doc};
//!
//! let manager = ConnectionManager::new("memory://", InMemoryConnector::new());
//! let datasets = manager.collection("chess", "datasets");
//!
//! datasets.insert(vec![Record::from(doc! { "dataset": "/a/b/c", "run": { "number": 1 } })]).await;
//!
//! for record in datasets.get(&doc! {}, 0, 0).await {
//!     println!("{}", record.get_string_value("run.number"));
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as recordlayer_core;

pub mod accessors;
pub mod backend;
pub mod collection;
pub mod config;
pub mod connection;
pub mod error;
pub mod path;
pub mod query;
pub mod record;
