//! Named collections of saved request snapshots.

use serde::{Deserialize, Serialize};

use crate::http::request::RequestSpec;

pub type CollectionId = i64;
pub type CollectionItemId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
}

/// A request snapshot saved into exactly one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: CollectionItemId,
    pub collection_id: CollectionId,
    #[serde(flatten)]
    pub request: RequestSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCollectionItem {
    pub collection_id: CollectionId,
    pub request: RequestSpec,
}

/// Trims a user-supplied collection name; blank names are rejected.
pub fn normalize_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    (!name.is_empty()).then(|| name.to_string())
}
