//! Translation of recordlayer find options into MongoDB find options.
//!
//! Filters are already MongoDB query documents and are passed through unchanged.

use mongodb::options::FindOptions as MongoFindOptions;

use recordlayer_core::query::{FindOptions, Sort};


/// Builds the driver's find options for a single find round trip.
pub(crate) fn translate_find_options(options: &FindOptions) -> MongoFindOptions {
    let mut translated = MongoFindOptions::default();

    if options.skip > 0 {
        translated.skip = Some(options.skip as u64);
    }
    if let Some(limit) = options.limit {
        translated.limit = Some(limit as i64);
    }
    if !options.sort.is_empty() {
        translated.sort = Some(Sort::to_document(&options.sort));
    }

    translated
}
