use crate::scene::Element;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryItemStatus {
    Published,
    Unpublished,
}

/// A reusable group of elements from the user's library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    pub status: LibraryItemStatus,
    pub elements: Vec<Rc<Element>>,
    /// Milliseconds since epoch
    pub created: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Library items saved under `key`. Missing or unreadable data yields an
/// empty library.
pub fn library_items_from_storage(store: &dyn KeyValueStore, key: &str) -> Vec<LibraryItem> {
    let json = match store.get(key) {
        Ok(Some(json)) => json,
        Ok(None) => return Vec::new(),
        Err(err) => {
            log::error!("{err}");
            return Vec::new();
        }
    };
    serde_json::from_str(&json).unwrap_or_else(|err| {
        log::error!("ignoring corrupt library `{key}`: {err}");
        Vec::new()
    })
}

pub fn save_library_items(store: &dyn KeyValueStore, key: &str, items: &[LibraryItem]) {
    let result = serde_json::to_string(items)
        .map_err(|err| err.to_string())
        .and_then(|json| store.set(key, &json).map_err(|err| err.to_string()));
    if let Err(message) = result {
        log::error!("failed to save library: {message}");
    }
}
