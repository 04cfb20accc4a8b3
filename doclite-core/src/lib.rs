// doclite-core/src/lib.rs
// Embedded in-memory document store with a MongoDB-style API

pub mod client;
pub mod collection;
pub mod config;
pub mod cursor;
pub mod database;
pub mod document;
pub mod error;
pub mod find_options;
pub mod index;
pub mod query;
pub mod update;
pub mod value;
pub mod write_result;

// Public exports
pub use client::Client;
pub use collection::Collection;
pub use config::{ClientConfig, IdGeneration};
pub use cursor::Cursor;
pub use database::Database;
pub use document::{Document, DocumentId, ID_FIELD};
pub use error::{DocLiteError, Result};
pub use find_options::{FindOptions, Projection, SortDirection};
pub use index::{IndexInfo, ID_INDEX_NAME};
pub use query::{FilterBuilder, Query, QueryOperator};
pub use update::{UpdateOperator, UpdateSpec};
pub use value::Value;
pub use write_result::WriteResult;
