use crate::scene::{AppState, BinaryFiles, Element};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Replacement scene contents pushed into a live canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneUpdate {
    pub elements: Vec<Rc<Element>>,
}

/// The operations the shell needs from a mounted drawing canvas.
pub trait CanvasApi {
    /// Every element in the live scene, deleted ones included.
    fn scene_elements_including_deleted(&self) -> Vec<Rc<Element>>;

    /// Replace the live elements. The canvas reports the result through its
    /// change callback like any other edit.
    fn update_scene(&self, update: SceneUpdate);
}

/// Payload of the canvas change callback.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneChange {
    pub elements: Vec<Rc<Element>>,
    pub app_state: AppState,
    pub files: BinaryFiles,
}

/// Shared API handle handed out by a canvas once it is mounted.
#[derive(Clone)]
pub struct CanvasHandle(pub Rc<dyn CanvasApi>);

impl PartialEq for CanvasHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CanvasHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CanvasHandle")
    }
}

/// Slot holding the live canvas, if one is mounted.
///
/// Clones share the slot, so callbacks created before the canvas mounts see
/// it once it is set.
#[derive(Clone, Default)]
pub struct CanvasRef {
    slot: Rc<RefCell<Option<Rc<dyn CanvasApi>>>>,
}

impl CanvasRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, api: Rc<dyn CanvasApi>) {
        *self.slot.borrow_mut() = Some(api);
    }

    pub fn clear(&self) {
        self.slot.borrow_mut().take();
    }

    pub fn get(&self) -> Option<Rc<dyn CanvasApi>> {
        self.slot.borrow().clone()
    }
}

impl PartialEq for CanvasRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}
