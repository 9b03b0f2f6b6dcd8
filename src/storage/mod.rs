//! Storage engine for LocalBrain
//!
//! Keeps the memory collection in process and persists whole-collection
//! snapshots through a pluggable backend.

mod backend;
mod export;
mod json_file;
mod memory;
mod store;

pub use backend::PersistenceBackend;
pub use export::{export_records, parse_import, to_csv, to_json, to_text, CSV_HEADER};
pub use json_file::JsonFileBackend;
pub use memory::InMemoryBackend;
pub use store::{MemoryStore, StoreStats};
