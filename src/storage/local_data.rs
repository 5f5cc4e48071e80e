use super::{
    BrowserStore, Debounced, FileStatusStore, KeyValueStore, LoadError, LocalBoxFuture,
    LocalState, MemoryStore, SceneStorage, Scheduler, TimeoutScheduler,
};
use crate::scene::{
    clear_app_state_for_local_storage, non_deleted_elements, AppState, BinaryFiles, Element, Scene,
};
use crate::visibility::{BrowserVisibility, PageVisibility};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Storage keys and timings for [`LocalData`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalDataConfig {
    pub elements_key: String,
    pub app_state_key: String,
    pub file_key_prefix: String,
    pub library_key: String,
    pub lang_key: String,
    pub save_debounce_ms: u32,
}

impl Default for LocalDataConfig {
    fn default() -> Self {
        Self {
            elements_key: "excalidraw".to_string(),
            app_state_key: "excalidraw-state".to_string(),
            file_key_prefix: "excalidraw-file:".to_string(),
            library_key: "excalidraw-library".to_string(),
            lang_key: "i18nextLng".to_string(),
            save_debounce_ms: 300,
        }
    }
}

/// Reasons for holding saves back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SaveLock {
    /// Scene is owned by a collaboration session.
    Collaboration,
}

struct SaveRequest {
    elements: Vec<Rc<Element>>,
    app_state: AppState,
    files: BinaryFiles,
    on_done: Box<dyn FnOnce()>,
}

struct Stores {
    config: LocalDataConfig,
    store: Rc<dyn KeyValueStore>,
    files: FileStatusStore,
}

impl Stores {
    fn write(&self, request: SaveRequest) {
        let SaveRequest {
            elements,
            app_state,
            files,
            on_done,
        } = request;

        self.write_data_state(&elements, &app_state);
        let written = self.files.save_files(&elements, &files);
        if !written.is_empty() {
            log::debug!("saved {} file(s)", written.len());
        }
        on_done();
    }

    fn write_data_state(&self, elements: &[Rc<Element>], app_state: &AppState) {
        let elements = non_deleted_elements(elements);
        let app_state = clear_app_state_for_local_storage(app_state);

        for (key, json) in [
            (&self.config.elements_key, serde_json::to_string(&elements)),
            (&self.config.app_state_key, serde_json::to_string(&app_state)),
        ] {
            let result = json
                .map_err(|err| err.to_string())
                .and_then(|json| self.store.set(key, &json).map_err(|err| err.to_string()));
            if let Err(message) = result {
                log::error!("failed to save `{key}`: {message}");
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = match self.store.get(key) {
            Ok(json) => json?,
            Err(err) => {
                log::error!("{err}");
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(err) => {
                log::error!("ignoring corrupt `{key}`: {err}");
                None
            }
        }
    }
}

/// Scene storage in the page's local storage.
///
/// Saves are debounced: overlapping calls collapse into the last one, and only
/// that call's completion callback runs.
pub struct LocalData {
    stores: Rc<Stores>,
    visibility: Rc<dyn PageVisibility>,
    save: Debounced<SaveRequest>,
    locks: RefCell<HashSet<SaveLock>>,
}

impl LocalData {
    pub fn new(
        config: LocalDataConfig,
        store: Rc<dyn KeyValueStore>,
        visibility: Rc<dyn PageVisibility>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let stores = Rc::new(Stores {
            files: FileStatusStore::new(Rc::clone(&store), config.file_key_prefix.clone()),
            store,
            config,
        });
        let save = {
            let stores = Rc::clone(&stores);
            Debounced::new(stores.config.save_debounce_ms, scheduler, move |request| {
                stores.write(request)
            })
        };
        Self {
            stores,
            visibility,
            save,
            locks: RefCell::new(HashSet::new()),
        }
    }

    /// Storage wired to `localStorage`, page visibility and page timers.
    pub fn browser(config: LocalDataConfig) -> Self {
        let store: Rc<dyn KeyValueStore> = match BrowserStore::local() {
            Ok(store) => Rc::new(store),
            Err(err) => {
                log::warn!("{err}, scene will not outlive the page");
                Rc::new(MemoryStore::new())
            }
        };
        Self::new(
            config,
            store,
            Rc::new(BrowserVisibility),
            Rc::new(TimeoutScheduler),
        )
    }

    pub fn config(&self) -> &LocalDataConfig {
        &self.stores.config
    }

    /// Backing key/value store, shared with library and language caching.
    pub fn store(&self) -> Rc<dyn KeyValueStore> {
        Rc::clone(&self.stores.store)
    }

    pub fn files(&self) -> &FileStatusStore {
        &self.stores.files
    }

    pub fn pause_save(&self, lock: SaveLock) {
        self.locks.borrow_mut().insert(lock);
    }

    pub fn resume_save(&self, lock: SaveLock) {
        self.locks.borrow_mut().remove(&lock);
    }

    pub fn is_locked(&self) -> bool {
        !self.locks.borrow().is_empty()
    }

    /// Write a pending save right away, e.g. when the page unloads.
    pub fn flush_save(&self) {
        self.save.flush();
    }

    pub fn cancel_pending_save(&self) {
        self.save.cancel();
    }

    pub fn has_pending_save(&self) -> bool {
        self.save.is_pending()
    }
}

impl SceneStorage for LocalData {
    fn read_local_state(&self) -> LocalState {
        LocalState {
            elements: self.stores.read_json(&self.stores.config.elements_key),
            app_state: self.stores.read_json(&self.stores.config.app_state_key),
        }
    }

    fn materialize_scene(&self, raw: LocalState) -> LocalBoxFuture<'static, Result<Option<Scene>, LoadError>> {
        let stores = Rc::clone(&self.stores);
        Box::pin(async move {
            if raw.is_empty() {
                return Ok(None);
            }
            let elements = raw.elements.unwrap_or_default();
            let files = stores.files.load_files(
                elements
                    .iter()
                    .filter(|e| e.is_initialized_image())
                    .filter_map(|e| e.file_id.as_deref()),
            )?;
            Ok(Some(Scene {
                elements,
                app_state: raw.app_state.unwrap_or_default(),
                files,
            }))
        })
    }

    fn save(
        &self,
        elements: Vec<Rc<Element>>,
        app_state: AppState,
        files: BinaryFiles,
        on_done: Box<dyn FnOnce()>,
    ) {
        self.save.call(SaveRequest {
            elements,
            app_state,
            files,
            on_done,
        });
    }

    fn should_update_image_element_status(&self, element: &Element) -> bool {
        self.stores.files.should_update_image_element_status(element)
    }

    fn is_save_paused(&self) -> bool {
        self.visibility.is_hidden() || self.is_locked()
    }
}
