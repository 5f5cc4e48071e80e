use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub type FileId = String;

/// Kind of drawing element. Only images carry a save status.
///
/// Kinds this crate has no use for are kept verbatim in `Other`, so a scene
/// written by a newer canvas loads and saves back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Rectangle,
    Diamond,
    Ellipse,
    Arrow,
    Line,
    Freedraw,
    Text,
    Image,
    Frame,
    Other(String),
}

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Rectangle => "rectangle",
            ElementKind::Diamond => "diamond",
            ElementKind::Ellipse => "ellipse",
            ElementKind::Arrow => "arrow",
            ElementKind::Line => "line",
            ElementKind::Freedraw => "freedraw",
            ElementKind::Text => "text",
            ElementKind::Image => "image",
            ElementKind::Frame => "frame",
            ElementKind::Other(tag) => tag,
        }
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "rectangle" => ElementKind::Rectangle,
            "diamond" => ElementKind::Diamond,
            "ellipse" => ElementKind::Ellipse,
            "arrow" => ElementKind::Arrow,
            "line" => ElementKind::Line,
            "freedraw" => ElementKind::Freedraw,
            "text" => ElementKind::Text,
            "image" => ElementKind::Image,
            "frame" => ElementKind::Frame,
            _ => ElementKind::Other(tag),
        }
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Whether an image element's backing file has been durably stored.
///
/// Only `Pending` images are ever promoted to `Saved`; any other value,
/// including ones written by a newer canvas, is left alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageStatus {
    Pending,
    Saved,
    Error,
    Other(String),
}

impl From<String> for ImageStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "pending" => ImageStatus::Pending,
            "saved" => ImageStatus::Saved,
            "error" => ImageStatus::Error,
            _ => ImageStatus::Other(status),
        }
    }
}

impl From<ImageStatus> for String {
    fn from(status: ImageStatus) -> Self {
        match status {
            ImageStatus::Pending => "pending".to_string(),
            ImageStatus::Saved => "saved".to_string(),
            ImageStatus::Error => "error".to_string(),
            ImageStatus::Other(status) => status,
        }
    }
}

/// A single element of the drawing scene.
///
/// The canvas owns the live copy; elements are shared as `Rc<Element>` and
/// compared by pointer when deciding whether anything changed. Properties this
/// crate does not interpret are kept in `extra` so they survive a save.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default = "initial_version")]
    pub version: u32,
    #[serde(default)]
    pub version_nonce: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ImageStatus>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn initial_version() -> u32 {
    1
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            angle: 0.0,
            is_deleted: false,
            version: initial_version(),
            version_nonce: random_nonce(),
            file_id: None,
            status: None,
            extra: serde_json::Map::new(),
        }
    }

    /// An image element that already points at a file.
    pub fn is_initialized_image(&self) -> bool {
        self.kind == ElementKind::Image && self.file_id.is_some()
    }
}

/// Field updates accepted by [`new_element_with`]. `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementUpdates {
    pub status: Option<ImageStatus>,
}

impl ElementUpdates {
    pub fn status(status: ImageStatus) -> Self {
        Self {
            status: Some(status),
        }
    }

    fn changes(&self, element: &Element) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| element.status.as_ref() != Some(s))
    }
}

/// Apply `updates` to `element`.
///
/// Returns the very same `Rc` when no update differs from the current value.
/// Otherwise returns a new element with the updates applied, the version
/// bumped and a fresh version nonce.
pub fn new_element_with(element: &Rc<Element>, updates: ElementUpdates) -> Rc<Element> {
    if !updates.changes(element) {
        return Rc::clone(element);
    }

    let mut next = Element::clone(element);
    if let Some(status) = updates.status {
        next.status = Some(status);
    }
    next.version = element.version.wrapping_add(1);
    next.version_nonce = random_nonce();
    Rc::new(next)
}

fn random_nonce() -> u32 {
    let mut bytes = [0u8; 4];
    if let Err(err) = getrandom::getrandom(&mut bytes) {
        log::warn!("no entropy for version nonce: {err}");
    }
    u32::from_le_bytes(bytes)
}
