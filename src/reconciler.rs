use crate::canvas::{CanvasApi, CanvasRef, SceneUpdate};
use crate::scene::{new_element_with, AppState, BinaryFiles, Element, ElementUpdates, ImageStatus};
use crate::storage::SceneStorage;
use std::rc::Rc;

/// Mark `element` as saved if `needs_update` says so.
///
/// Returns the same `Rc` when nothing changes, so callers can detect changes
/// with [`Rc::ptr_eq`].
pub fn reconcile(element: &Rc<Element>, needs_update: impl Fn(&Element) -> bool) -> Rc<Element> {
    if needs_update(element) {
        new_element_with(element, ElementUpdates::status(ImageStatus::Saved))
    } else {
        Rc::clone(element)
    }
}

/// Reconcile every element. `None` when no element changed.
pub fn reconcile_elements(
    elements: &[Rc<Element>],
    needs_update: impl Fn(&Element) -> bool,
) -> Option<Vec<Rc<Element>>> {
    let mut did_change = false;
    let reconciled: Vec<_> = elements
        .iter()
        .map(|element| {
            let next = reconcile(element, &needs_update);
            if !Rc::ptr_eq(&next, element) {
                did_change = true;
            }
            next
        })
        .collect();
    did_change.then_some(reconciled)
}

/// Push saved image statuses into the live canvas. Does nothing unless at
/// least one element changed, since every update re-triggers a scene change.
pub fn sync_image_statuses(storage: &dyn SceneStorage, canvas: &dyn CanvasApi) -> bool {
    let elements = canvas.scene_elements_including_deleted();
    match reconcile_elements(&elements, |e| storage.should_update_image_element_status(e)) {
        Some(elements) => {
            log::debug!("marking saved images in scene of {} element(s)", elements.len());
            canvas.update_scene(SceneUpdate { elements });
            true
        }
        None => false,
    }
}

/// Persists every scene change and then reconciles image save status.
#[derive(Clone)]
pub struct PersistenceReconciler {
    storage: Rc<dyn SceneStorage>,
    canvas: CanvasRef,
}

impl PersistenceReconciler {
    pub fn new(storage: Rc<dyn SceneStorage>, canvas: CanvasRef) -> Self {
        Self { storage, canvas }
    }

    pub fn canvas(&self) -> &CanvasRef {
        &self.canvas
    }

    pub fn on_scene_change(&self, elements: &[Rc<Element>], app_state: &AppState, files: &BinaryFiles) {
        // Hot path: skip the rest while saving is paused.
        if self.storage.is_save_paused() {
            return;
        }

        let storage = Rc::downgrade(&self.storage);
        let canvas = self.canvas.clone();
        self.storage.save(
            elements.to_vec(),
            app_state.clone(),
            files.clone(),
            Box::new(move || {
                let (Some(storage), Some(api)) = (storage.upgrade(), canvas.get()) else {
                    return;
                };
                sync_image_statuses(&*storage, &*api);
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{BinaryFileData, ElementKind, Scene};
    use crate::storage::{LoadError, LocalBoxFuture, LocalState};
    use crate::test_support::{image, rectangle, RecordingCanvas};
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;

    /// Storage that records saves and defers their completion to the test.
    #[derive(Default)]
    struct FakeStorage {
        paused: Cell<bool>,
        saves: Cell<u32>,
        completions: RefCell<Vec<Box<dyn FnOnce()>>>,
        needs_update: RefCell<HashSet<String>>,
    }

    impl FakeStorage {
        fn needing_update(ids: &[&str]) -> Rc<Self> {
            let storage = Self::default();
            storage
                .needs_update
                .borrow_mut()
                .extend(ids.iter().map(|id| id.to_string()));
            Rc::new(storage)
        }

        fn complete_saves(&self) {
            let completions = std::mem::take(&mut *self.completions.borrow_mut());
            for on_done in completions {
                on_done();
            }
        }
    }

    impl SceneStorage for FakeStorage {
        fn read_local_state(&self) -> LocalState {
            LocalState::default()
        }

        fn materialize_scene(&self, _: LocalState) -> LocalBoxFuture<'static, Result<Option<Scene>, LoadError>> {
            Box::pin(async { Ok(None) })
        }

        fn save(&self, _: Vec<Rc<Element>>, _: AppState, _: BinaryFiles, on_done: Box<dyn FnOnce()>) {
            self.saves.set(self.saves.get() + 1);
            self.completions.borrow_mut().push(on_done);
        }

        fn should_update_image_element_status(&self, element: &Element) -> bool {
            self.needs_update.borrow().contains(&element.id)
                && element.status == Some(ImageStatus::Pending)
        }

        fn is_save_paused(&self) -> bool {
            self.paused.get()
        }
    }

    fn mounted(storage: &Rc<FakeStorage>, elements: Vec<Rc<Element>>) -> (PersistenceReconciler, Rc<RecordingCanvas>) {
        let canvas = Rc::new(RecordingCanvas::with_elements(elements));
        let canvas_ref = CanvasRef::new();
        canvas_ref.set(canvas.clone());
        (PersistenceReconciler::new(storage.clone(), canvas_ref), canvas)
    }

    fn change(reconciler: &PersistenceReconciler, canvas: &RecordingCanvas) {
        let elements = canvas.scene_elements_including_deleted();
        reconciler.on_scene_change(&elements, &AppState::new(), &BinaryFiles::new());
    }

    #[test]
    fn test_reconcile_identity_contract() {
        let element = image("1", "f1", ImageStatus::Pending, false);

        let untouched = reconcile(&element, |_| false);
        assert!(Rc::ptr_eq(&untouched, &element));

        let saved = reconcile(&element, |_| true);
        assert!(!Rc::ptr_eq(&saved, &element));
        assert_eq!(saved.status, Some(ImageStatus::Saved));

        // Already saved: the rewrite is a no-op and keeps identity.
        let again = reconcile(&saved, |_| true);
        assert!(Rc::ptr_eq(&again, &saved));
    }

    #[test]
    fn test_reconcile_elements_reports_no_change() {
        let elements = vec![rectangle("r"), image("1", "f1", ImageStatus::Pending, false)];
        assert!(reconcile_elements(&elements, |_| false).is_none());
        assert!(reconcile_elements(&[], |_| true).is_none());
    }

    #[test]
    fn test_paused_gate_skips_save() {
        let storage = FakeStorage::needing_update(&["1"]);
        storage.paused.set(true);
        let (reconciler, canvas) = mounted(&storage, vec![image("1", "f1", ImageStatus::Pending, false)]);

        change(&reconciler, &canvas);
        reconciler.on_scene_change(&[], &AppState::new(), &BinaryFiles::new());

        assert_eq!(storage.saves.get(), 0);
        assert!(canvas.updates.borrow().is_empty());
    }

    #[test]
    fn test_update_only_affected_elements() {
        let storage = FakeStorage::needing_update(&["1"]);
        let first = image("1", "f1", ImageStatus::Pending, false);
        let second = image("2", "f2", ImageStatus::Pending, true);
        let (reconciler, canvas) = mounted(&storage, vec![first.clone(), second.clone()]);

        change(&reconciler, &canvas);
        assert_eq!(storage.saves.get(), 1);
        assert!(canvas.updates.borrow().is_empty());

        storage.complete_saves();

        let updates = canvas.updates.borrow();
        assert_eq!(updates.len(), 1);
        let elements = &updates[0].elements;
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].id, "1");
        assert_eq!(elements[0].status, Some(ImageStatus::Saved));
        assert!(!elements[0].is_deleted);
        assert!(!Rc::ptr_eq(&elements[0], &first));
        assert!(Rc::ptr_eq(&elements[1], &second));
        assert_eq!(elements[1].status, Some(ImageStatus::Pending));
        assert!(elements[1].is_deleted);
    }

    #[test]
    fn test_deleted_elements_are_reconciled() {
        let storage = FakeStorage::needing_update(&["gone"]);
        let deleted = image("gone", "f1", ImageStatus::Pending, true);
        let visible = rectangle("r");
        let (reconciler, canvas) = mounted(&storage, vec![visible.clone(), deleted]);

        change(&reconciler, &canvas);
        storage.complete_saves();

        let updates = canvas.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert!(Rc::ptr_eq(&updates[0].elements[0], &visible));
        assert!(updates[0].elements[1].is_deleted);
        assert_eq!(updates[0].elements[1].status, Some(ImageStatus::Saved));
    }

    #[test]
    fn test_no_update_when_nothing_changed() {
        let storage = FakeStorage::needing_update(&[]);
        let (reconciler, canvas) = mounted(
            &storage,
            vec![
                image("1", "f1", ImageStatus::Pending, false),
                image("2", "f2", ImageStatus::Pending, true),
            ],
        );

        change(&reconciler, &canvas);
        storage.complete_saves();

        assert_eq!(storage.saves.get(), 1);
        assert!(canvas.updates.borrow().is_empty());
    }

    #[test]
    fn test_second_pass_after_update_is_quiet() {
        let storage = FakeStorage::needing_update(&["1"]);
        let (reconciler, canvas) = mounted(&storage, vec![image("1", "f1", ImageStatus::Pending, false)]);

        change(&reconciler, &canvas);
        storage.complete_saves();
        // The update fires another change; its pass finds nothing left to do.
        change(&reconciler, &canvas);
        storage.complete_saves();

        assert_eq!(storage.saves.get(), 2);
        assert_eq!(canvas.updates.borrow().len(), 1);
    }

    #[test]
    fn test_completion_without_canvas_is_noop() {
        let storage = FakeStorage::needing_update(&["1"]);
        let canvas_ref = CanvasRef::new();
        let reconciler = PersistenceReconciler::new(storage.clone(), canvas_ref.clone());

        reconciler.on_scene_change(
            &[image("1", "f1", ImageStatus::Pending, false)],
            &AppState::new(),
            &BinaryFiles::new(),
        );
        storage.complete_saves();
        assert_eq!(storage.saves.get(), 1);
    }

    #[test]
    fn test_canvas_mounted_after_save_started() {
        let storage = FakeStorage::needing_update(&["1"]);
        let canvas_ref = CanvasRef::new();
        let reconciler = PersistenceReconciler::new(storage.clone(), canvas_ref.clone());
        reconciler.on_scene_change(&[], &AppState::new(), &BinaryFiles::new());

        let canvas = Rc::new(RecordingCanvas::with_elements(vec![image(
            "1",
            "f1",
            ImageStatus::Pending,
            false,
        )]));
        canvas_ref.set(canvas.clone());
        storage.complete_saves();

        assert_eq!(canvas.updates.borrow().len(), 1);
    }

    #[test]
    fn test_end_to_end_with_local_data() {
        use crate::storage::{LocalData, LocalDataConfig, MemoryStore};
        use crate::test_support::{ManualScheduler, ManualVisibility};

        let scheduler = Rc::new(ManualScheduler::default());
        let data = Rc::new(LocalData::new(
            LocalDataConfig::default(),
            Rc::new(MemoryStore::new()),
            Rc::new(ManualVisibility::default()),
            scheduler.clone(),
        ));
        let mut element = Element::new("img", ElementKind::Image);
        element.file_id = Some("f1".into());
        element.status = Some(ImageStatus::Pending);
        let element = Rc::new(element);

        let canvas = Rc::new(RecordingCanvas::with_elements(vec![element.clone()]));
        let canvas_ref = CanvasRef::new();
        canvas_ref.set(canvas.clone());
        let reconciler = PersistenceReconciler::new(data.clone(), canvas_ref);

        let files = BinaryFiles::from([(
            "f1".to_string(),
            BinaryFileData {
                id: "f1".into(),
                mime_type: "image/png".into(),
                data_url: "data:image/png;base64,AAAA".into(),
                created: 0.0,
                last_retrieved: None,
            },
        )]);
        reconciler.on_scene_change(&[element], &AppState::new(), &files);
        assert!(canvas.updates.borrow().is_empty());

        scheduler.run_all();

        let updates = canvas.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].elements[0].status, Some(ImageStatus::Saved));
    }
}
