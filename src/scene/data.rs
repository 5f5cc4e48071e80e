use super::element::{Element, FileId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

/// UI/view state of the canvas, kept as an opaque JSON object.
pub type AppState = serde_json::Map<String, serde_json::Value>;

/// Binary assets referenced by image elements, keyed by file id.
pub type BinaryFiles = HashMap<FileId, BinaryFileData>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryFileData {
    pub id: FileId,
    pub mime_type: String,
    #[serde(rename = "dataURL")]
    pub data_url: String,
    /// Milliseconds since epoch
    pub created: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retrieved: Option<f64>,
}

/// Snapshot of everything the canvas needs to show a drawing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub elements: Vec<Rc<Element>>,
    #[serde(default)]
    pub app_state: AppState,
    #[serde(default)]
    pub files: BinaryFiles,
}

/// App state keys that only make sense for the running page.
const TRANSIENT_APP_STATE_KEYS: &[&str] = &[
    "collaborators",
    "contextMenu",
    "draggingElement",
    "editingElement",
    "errorMessage",
    "fileHandle",
    "height",
    "isLoading",
    "isResizing",
    "isRotating",
    "offsetLeft",
    "offsetTop",
    "openMenu",
    "pasteDialog",
    "resizingElement",
    "selectionElement",
    "toast",
    "width",
];

/// Copy of `app_state` without the keys that must not be persisted.
pub fn clear_app_state_for_local_storage(app_state: &AppState) -> AppState {
    app_state
        .iter()
        .filter(|(key, _)| !TRANSIENT_APP_STATE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Elements that are still part of the drawing.
pub fn non_deleted_elements(elements: &[Rc<Element>]) -> Vec<Rc<Element>> {
    elements
        .iter()
        .filter(|element| !element.is_deleted)
        .cloned()
        .collect()
}
