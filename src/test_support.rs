//! In-memory collaborators shared by the unit tests.

use crate::canvas::{CanvasApi, SceneUpdate};
use crate::promise::ResolvablePromise;
use crate::scene::{Element, ElementKind, ImageStatus};
use crate::storage::{ScheduledTask, Scheduler};
use crate::visibility::{PageVisibility, VisibilityWait};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

thread_local! {
    static NOOP_WAKER: Waker = Waker::from(Arc::new(NoopWake));
}

/// Poll a future a single time with a waker that does nothing.
pub fn poll_once<F: Future + ?Sized>(future: Pin<&mut F>) -> Poll<F::Output> {
    NOOP_WAKER.with(|waker| {
        let mut cx = Context::from_waker(waker);
        future.poll(&mut cx)
    })
}

pub fn image(id: &str, file_id: &str, status: ImageStatus, is_deleted: bool) -> Rc<Element> {
    let mut element = Element::new(id, ElementKind::Image);
    element.file_id = Some(file_id.to_string());
    element.status = Some(status);
    element.is_deleted = is_deleted;
    Rc::new(element)
}

pub fn rectangle(id: &str) -> Rc<Element> {
    Rc::new(Element::new(id, ElementKind::Rectangle))
}

/// Visibility toggled by hand; every `wait_until_visible` is recorded.
#[derive(Default)]
pub struct ManualVisibility {
    hidden: Cell<bool>,
    waiters: RefCell<Vec<ResolvablePromise<()>>>,
    subscriptions: Cell<usize>,
}

impl ManualVisibility {
    pub fn hidden() -> Self {
        let visibility = Self::default();
        visibility.hidden.set(true);
        visibility
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    /// Fire the "became visible" signal to every current subscriber.
    pub fn focus(&self) {
        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for waiter in waiters {
            let _ = waiter.resolve(());
        }
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.get()
    }

    pub fn live_subscriptions(&self) -> usize {
        self.waiters.borrow().len()
    }
}

impl PageVisibility for ManualVisibility {
    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn wait_until_visible(&self) -> VisibilityWait {
        let signal = ResolvablePromise::new();
        self.subscriptions.set(self.subscriptions.get() + 1);
        self.waiters.borrow_mut().push(signal.clone());
        VisibilityWait::detached(signal)
    }
}

struct ManualTask {
    delay_ms: u32,
    cancelled: Rc<Cell<bool>>,
    run: Box<dyn FnOnce()>,
}

struct CancelOnDrop(Rc<Cell<bool>>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

/// Scheduler whose tasks run only when the test says so.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: RefCell<Vec<ManualTask>>,
}

impl ManualScheduler {
    /// Tasks scheduled and not yet cancelled or run.
    pub fn pending(&self) -> usize {
        self.tasks
            .borrow()
            .iter()
            .filter(|task| !task.cancelled.get())
            .count()
    }

    pub fn run_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        for task in tasks {
            if !task.cancelled.get() {
                (task.run)();
            }
        }
    }

    pub fn last_delay(&self) -> Option<u32> {
        self.tasks
            .borrow()
            .iter()
            .rev()
            .find(|task| !task.cancelled.get())
            .map(|task| task.delay_ms)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> ScheduledTask {
        let cancelled = Rc::new(Cell::new(false));
        self.tasks.borrow_mut().push(ManualTask {
            delay_ms,
            cancelled: Rc::clone(&cancelled),
            run: task,
        });
        ScheduledTask::new(CancelOnDrop(cancelled))
    }
}

/// Canvas that records every scene update it receives.
#[derive(Default)]
pub struct RecordingCanvas {
    pub elements: RefCell<Vec<Rc<Element>>>,
    pub updates: RefCell<Vec<SceneUpdate>>,
}

impl RecordingCanvas {
    pub fn with_elements(elements: Vec<Rc<Element>>) -> Self {
        Self {
            elements: RefCell::new(elements),
            updates: RefCell::new(Vec::new()),
        }
    }
}

impl CanvasApi for RecordingCanvas {
    fn scene_elements_including_deleted(&self) -> Vec<Rc<Element>> {
        self.elements.borrow().clone()
    }

    fn update_scene(&self, update: SceneUpdate) {
        *self.elements.borrow_mut() = update.elements.clone();
        self.updates.borrow_mut().push(update);
    }
}
