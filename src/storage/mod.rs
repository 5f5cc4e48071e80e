mod debounce;
mod files;
mod kv;
mod local_data;

pub use debounce::{Debounced, ScheduledTask, Scheduler, TimeoutScheduler};
pub use files::FileStatusStore;
pub use kv::{BrowserStore, KeyValueStore, MemoryStore};
pub use local_data::{LocalData, LocalDataConfig, SaveLock};

use crate::scene::{AppState, BinaryFiles, Element, Scene};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Boxed future that stays on the current thread.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Why the initial scene could not be produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("corrupt entry `{key}`: {message}")]
    Corrupt { key: String, message: String },
}

/// Failure of a single key/value operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("storage backend unavailable")]
    Unavailable,
    #[error("failed to read `{key}`: {message}")]
    Read { key: String, message: String },
    #[error("failed to write `{key}`: {message}")]
    Write { key: String, message: String },
}

impl From<StorageError> for LoadError {
    fn from(err: StorageError) -> Self {
        LoadError::Storage(err.to_string())
    }
}

/// Raw scene data as found in local storage, before materialization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalState {
    pub elements: Option<Vec<Rc<Element>>>,
    pub app_state: Option<AppState>,
}

impl LocalState {
    pub fn is_empty(&self) -> bool {
        self.elements.is_none() && self.app_state.is_none()
    }
}

/// Storage collaborator used by the loader and the reconciler.
pub trait SceneStorage {
    /// Whatever scene data currently exists locally. Never fails; unreadable
    /// data reads as absent.
    fn read_local_state(&self) -> LocalState;

    /// Build a full scene from `raw`. `Ok(None)` means nothing was saved.
    fn materialize_scene(&self, raw: LocalState) -> LocalBoxFuture<'static, Result<Option<Scene>, LoadError>>;

    /// Persist the scene and call `on_done` once the write has happened.
    fn save(
        &self,
        elements: Vec<Rc<Element>>,
        app_state: AppState,
        files: BinaryFiles,
        on_done: Box<dyn FnOnce()>,
    );

    /// True when `element` still reports a pending image whose file is now saved.
    fn should_update_image_element_status(&self, element: &Element) -> bool;

    fn is_save_paused(&self) -> bool;
}
