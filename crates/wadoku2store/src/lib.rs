pub mod export;
pub mod reshape;
pub mod store;

pub use export::{ExportError, ExportSummary, export, write_entries};
pub use reshape::reshape;
pub use store::{
    CollectionWriter, DEFAULT_COLLECTION, Destination, JsonLinesCollection, SqliteCollection,
    StoreError, WriteMode,
};
