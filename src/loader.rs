use crate::promise::ResolvablePromise;
use crate::scene::Scene;
use crate::storage::{LoadError, SceneStorage};
use crate::visibility::PageVisibility;
use std::cell::Cell;
use std::rc::Rc;

/// Initial scene handed to the canvas: `None` when nothing was saved.
pub type InitialData = Result<Option<Rc<Scene>>, LoadError>;

/// Write-once initial data, created once per shell and awaited by the canvas.
pub type InitialScenePromise = ResolvablePromise<InitialData>;

#[derive(Clone, Debug, PartialEq)]
pub struct InitialScene {
    pub scene: Option<Rc<Scene>>,
}

/// Where the loader currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    /// Reading and materializing the stored scene.
    Pending,
    /// Scene was built while the page was hidden; parked until it becomes visible.
    WaitingForVisibility,
    Resolved,
}

/// Resolves the scene the canvas starts with.
///
/// When the page is hidden once a scene is built, that result is thrown away
/// and the whole load runs again after the page becomes visible.
#[derive(Clone)]
pub struct SceneLoader {
    storage: Rc<dyn SceneStorage>,
    visibility: Rc<dyn PageVisibility>,
    phase: Rc<Cell<LoadPhase>>,
    attempts: Rc<Cell<u32>>,
}

impl SceneLoader {
    pub fn new(storage: Rc<dyn SceneStorage>, visibility: Rc<dyn PageVisibility>) -> Self {
        Self {
            storage,
            visibility,
            phase: Rc::new(Cell::new(LoadPhase::Pending)),
            attempts: Rc::new(Cell::new(0)),
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase.get()
    }

    /// Number of load attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    pub async fn initialize_scene(&self) -> Result<InitialScene, LoadError> {
        loop {
            self.phase.set(LoadPhase::Pending);
            self.attempts.set(self.attempts.get() + 1);

            let raw = self.storage.read_local_state();
            let scene = match self.storage.materialize_scene(raw).await {
                Ok(scene) => scene,
                Err(err) => {
                    self.phase.set(LoadPhase::Resolved);
                    return Err(err);
                }
            };

            if self.visibility.is_hidden() {
                log::debug!("page hidden, deferring initial scene until focus");
                self.phase.set(LoadPhase::WaitingForVisibility);
                self.visibility.wait_until_visible().await;
                continue;
            }

            self.phase.set(LoadPhase::Resolved);
            return Ok(InitialScene {
                scene: scene.map(Rc::new),
            });
        }
    }

    /// Run [`initialize_scene`](Self::initialize_scene) and settle `promise`
    /// with its outcome.
    pub async fn load_into(&self, promise: &InitialScenePromise) {
        let data = self.initialize_scene().await.map(|initial| initial.scene);
        match &data {
            Ok(Some(scene)) => log::info!("restored scene with {} element(s)", scene.elements.len()),
            Ok(None) => log::info!("no saved scene"),
            Err(err) => log::error!("failed to load initial scene: {err}"),
        }
        if promise.resolve(data).is_err() {
            log::warn!("initial scene already settled, dropping reload result");
        }
    }
}
