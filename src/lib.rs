mod app;
pub mod canvas;
pub mod lang;
pub mod library;
pub mod loader;
pub mod promise;
pub mod reconciler;
pub mod scene;
pub mod storage;
pub mod visibility;

#[cfg(test)]
mod test_support;

pub use app::{AppShell, AppShellProps, CanvasProps};
pub use canvas::{CanvasApi, CanvasHandle, CanvasRef, SceneChange, SceneUpdate};
pub use loader::{InitialData, InitialScene, InitialScenePromise, LoadPhase, SceneLoader};
pub use promise::{ResolvablePromise, SettleError};
pub use reconciler::{reconcile, reconcile_elements, PersistenceReconciler};
pub use storage::{LoadError, LocalData, LocalDataConfig, SceneStorage};

use wasm_bindgen::prelude::*;

/// Route `log` output to the browser console.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    wasm_logger::init(wasm_logger::Config::default());
}
