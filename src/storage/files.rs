use super::{KeyValueStore, LoadError};
use crate::scene::{BinaryFileData, BinaryFiles, Element, FileId, ImageStatus};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Image file persistence plus the record of which files are durably stored.
pub struct FileStatusStore {
    store: Rc<dyn KeyValueStore>,
    key_prefix: String,
    saved: RefCell<HashSet<FileId>>,
    errored: RefCell<HashSet<FileId>>,
}

impl FileStatusStore {
    pub fn new(store: Rc<dyn KeyValueStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            saved: RefCell::new(HashSet::new()),
            errored: RefCell::new(HashSet::new()),
        }
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    pub fn is_file_saved(&self, id: &str) -> bool {
        self.saved.borrow().contains(id)
    }

    pub fn is_file_errored(&self, id: &str) -> bool {
        self.errored.borrow().contains(id)
    }

    fn is_file_handled(&self, id: &str) -> bool {
        self.is_file_saved(id) || self.is_file_errored(id)
    }

    /// Write every file referenced by an initialized image element that has
    /// not been handled yet. Returns the ids written in this call.
    pub fn save_files(&self, elements: &[Rc<Element>], files: &BinaryFiles) -> Vec<FileId> {
        let mut written = Vec::new();
        for element in elements.iter().filter(|e| e.is_initialized_image()) {
            let Some(file_id) = element.file_id.as_deref() else {
                continue;
            };
            if self.is_file_handled(file_id) {
                continue;
            }
            let Some(file) = files.get(file_id) else {
                continue;
            };

            let result = serde_json::to_string(file)
                .map_err(|err| err.to_string())
                .and_then(|json| {
                    self.store
                        .set(&self.key(file_id), &json)
                        .map_err(|err| err.to_string())
                });
            match result {
                Ok(()) => {
                    self.saved.borrow_mut().insert(file_id.to_string());
                    written.push(file_id.to_string());
                }
                Err(message) => {
                    log::error!("failed to save file {file_id}: {message}");
                    self.errored.borrow_mut().insert(file_id.to_string());
                }
            }
        }
        written
    }

    /// Load the given files. Missing entries are skipped; loaded files count
    /// as saved.
    pub fn load_files<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<BinaryFiles, LoadError> {
        let mut files = BinaryFiles::new();
        for id in ids {
            let key = self.key(id);
            let Some(json) = self.store.get(&key)? else {
                log::warn!("file {id} referenced by scene is missing");
                continue;
            };
            let file: BinaryFileData =
                serde_json::from_str(&json).map_err(|err| LoadError::Corrupt {
                    key: key.clone(),
                    message: err.to_string(),
                })?;
            self.saved.borrow_mut().insert(id.to_string());
            files.insert(id.to_string(), file);
        }
        Ok(files)
    }

    pub fn should_update_image_element_status(&self, element: &Element) -> bool {
        element.is_initialized_image()
            && element.status == Some(ImageStatus::Pending)
            && element
                .file_id
                .as_deref()
                .is_some_and(|id| self.is_file_saved(id))
    }
}
