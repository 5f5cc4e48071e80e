use crate::canvas::{CanvasHandle, CanvasRef, SceneChange};
use crate::lang::{navigator_languages, LanguageDetector};
use crate::library::{library_items_from_storage, save_library_items, LibraryItem};
use crate::loader::{InitialScenePromise, SceneLoader};
use crate::reconciler::PersistenceReconciler;
use crate::storage::{LocalBoxFuture, LocalData, LocalDataConfig, SceneStorage};
use crate::visibility::BrowserVisibility;
use gloo::events::EventListener;
use std::cell::Cell;
use std::rc::Rc;
use yew::prelude::*;

/// What the shell hands to the embedded drawing canvas.
#[derive(Clone, PartialEq)]
pub struct CanvasProps {
    /// Settles once with the restored scene (or `None`).
    pub initial_data: InitialScenePromise,
    /// Must be called on every scene mutation.
    pub on_change: Callback<SceneChange>,
    /// Called with the canvas API once mounted, and with `None` on unmount.
    pub on_ready: Callback<Option<CanvasHandle>>,
    pub lang_code: String,
    pub library_items: Rc<Vec<LibraryItem>>,
    /// Called with the full library whenever the user edits it.
    pub on_library_change: Callback<Vec<LibraryItem>>,
}

/// Keeps the live canvas reference current and starts the initial scene
/// load when the first canvas mounts.
pub(crate) struct CanvasMount {
    canvas_ref: CanvasRef,
    initial_data: InitialScenePromise,
    loader: SceneLoader,
    load_started: Cell<bool>,
}

impl CanvasMount {
    pub fn new(canvas_ref: CanvasRef, initial_data: InitialScenePromise, loader: SceneLoader) -> Self {
        Self {
            canvas_ref,
            initial_data,
            loader,
            load_started: Cell::new(false),
        }
    }

    /// Returns the load to spawn, only for the first mounted canvas.
    pub fn on_ready(&self, handle: Option<&CanvasHandle>) -> Option<LocalBoxFuture<'static, ()>> {
        let CanvasHandle(api) = match handle {
            Some(handle) => handle,
            None => {
                self.canvas_ref.clear();
                return None;
            }
        };
        self.canvas_ref.set(Rc::clone(api));
        if self.load_started.replace(true) {
            return None;
        }
        let loader = self.loader.clone();
        let initial_data = self.initial_data.clone();
        Some(Box::pin(async move {
            loader.load_into(&initial_data).await;
        }))
    }
}

fn persist_library(storage: &LocalData, items: &[LibraryItem]) {
    save_library_items(&*storage.store(), &storage.config().library_key, items)
}

#[derive(Properties, PartialEq)]
pub struct AppShellProps {
    /// Renders the drawing canvas.
    pub render_canvas: Callback<CanvasProps, Html>,

    #[prop_or_default]
    pub config: LocalDataConfig,
}

/// Application shell: restores the saved scene into the canvas and keeps
/// local storage in sync with it.
#[function_component(AppShell)]
pub fn app_shell(props: &AppShellProps) -> Html {
    let storage = {
        let config = props.config.clone();
        use_memo((), move |_| LocalData::browser(config))
    };
    let initial_data = use_memo((), |_| InitialScenePromise::new());
    let canvas_ref = use_memo((), |_| CanvasRef::new());
    let canvas_api = use_state(|| None::<CanvasHandle>);
    let mount = {
        let storage: Rc<dyn SceneStorage> = storage.clone();
        let initial_data = (*initial_data).clone();
        let canvas_ref = (*canvas_ref).clone();
        use_memo((), move |_| {
            let loader = SceneLoader::new(storage, Rc::new(BrowserVisibility));
            CanvasMount::new(canvas_ref, initial_data, loader)
        })
    };

    let reconciler = {
        let storage: Rc<dyn SceneStorage> = storage.clone();
        let canvas_ref = (*canvas_ref).clone();
        use_memo((), move |_| PersistenceReconciler::new(storage, canvas_ref))
    };

    let library_items = {
        let storage = storage.clone();
        use_memo((), move |_| {
            library_items_from_storage(&*storage.store(), &storage.config().library_key)
        })
    };

    let detector = {
        let storage = storage.clone();
        use_memo((), move |_| {
            LanguageDetector::new(storage.store(), storage.config().lang_key.clone())
        })
    };
    let lang_code = {
        let detector = detector.clone();
        use_state(move || detector.detect(&navigator_languages()))
    };

    // Initial scene, once a canvas is mounted
    use_effect_with((*canvas_api).clone(), move |api| {
        if let Some(load) = mount.on_ready(api.as_ref()) {
            wasm_bindgen_futures::spawn_local(load);
        }
        || ()
    });

    {
        let detector = detector.clone();
        use_effect_with((*lang_code).clone(), move |code| {
            detector.cache_user_language(code);
            || ()
        });
    }

    // Write pending saves before the page goes away or into the background
    {
        let storage = storage.clone();
        use_effect_with((), move |_| {
            let window = gloo_utils::window();
            let document = gloo_utils::document();

            let on_unload = {
                let storage = storage.clone();
                EventListener::new(&window, "beforeunload", move |_| storage.flush_save())
            };
            let on_blur = {
                let storage = storage.clone();
                EventListener::new(&window, "blur", move |_| storage.flush_save())
            };
            let on_hide = {
                let hidden_doc = document.clone();
                EventListener::new(&document, "visibilitychange", move |_| {
                    if hidden_doc.hidden() {
                        storage.flush_save();
                    }
                })
            };

            move || drop((on_unload, on_blur, on_hide))
        });
    }

    let on_change = {
        let reconciler = reconciler.clone();
        Callback::from(move |change: SceneChange| {
            reconciler.on_scene_change(&change.elements, &change.app_state, &change.files)
        })
    };

    let on_ready = {
        let canvas_api = canvas_api.clone();
        Callback::from(move |handle: Option<CanvasHandle>| canvas_api.set(handle))
    };

    let on_library_change = {
        let storage = storage.clone();
        Callback::from(move |items: Vec<LibraryItem>| persist_library(&storage, &items))
    };

    let canvas = props.render_canvas.emit(CanvasProps {
        initial_data: (*initial_data).clone(),
        on_change,
        on_ready,
        lang_code: (*lang_code).clone(),
        library_items: library_items.clone(),
        on_library_change,
    });

    html! {
        <div class="excalidraw-app" style="height: 100%">
            { canvas }
        </div>
    }
}
