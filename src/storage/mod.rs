//! Persistence for history and collections.
//!
//! The session only needs select-all, insert-one, delete-by-id and
//! delete-all, so [`Store`] is a small synchronous trait; the runtime calls
//! it from the blocking pool.

mod sqlite;

use std::fs;
use std::path::{Path, PathBuf};

use crate::collections::{Collection, CollectionId, CollectionItem, NewCollectionItem};
use crate::error::Result;
use crate::history::{HistoryEntry, HistoryId, NewHistoryEntry};

pub use sqlite::SqliteStore;

const DATA_DIR: &str = ".apiprobe";
pub const DATABASE_FILE: &str = "apiprobe.db";

pub trait Store: Send + Sync + 'static {
    /// Newest first.
    fn list_history(&self) -> Result<Vec<HistoryEntry>>;
    fn insert_history(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry>;
    fn delete_history(&self, id: HistoryId) -> Result<()>;
    fn clear_history(&self) -> Result<()>;

    fn list_collections(&self) -> Result<Vec<Collection>>;
    fn create_collection(&self, name: &str) -> Result<Collection>;
    fn insert_collection_item(&self, item: &NewCollectionItem) -> Result<CollectionItem>;
    fn list_collection_items(&self, collection_id: CollectionId) -> Result<Vec<CollectionItem>>;
}

pub fn default_data_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DATA_DIR)
}

pub fn ensure_data_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}
