//! Convenient re-exports of commonly used types from recordlayer.
//!
//! ```ignore
//! use recordlayer::prelude::*;
//! ```

pub use recordlayer_core::{
    backend::{StoreConnector, StoreSession},
    collection::{Collection, DATASET_KEY},
    config::StoreConfig,
    connection::ConnectionManager,
    error::{ErrorKind, RecordStoreError, RecordStoreResult, error_record},
    path::{get_value, single_entry},
    query::{FindOptions, Sort, SortDirection},
    record::Record,
};
