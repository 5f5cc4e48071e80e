use gloo::timers::callback::Timeout;
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Handle to a scheduled task. Dropping it cancels the task if it has not run.
pub struct ScheduledTask(Box<dyn Any>);

impl ScheduledTask {
    /// Wrap whatever cancels the task when dropped.
    pub fn new(guard: impl Any) -> Self {
        Self(Box::new(guard))
    }
}

/// Runs a task after a delay on the current thread.
pub trait Scheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> ScheduledTask;
}

/// Page timers (`setTimeout`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> ScheduledTask {
        ScheduledTask::new(Timeout::new(delay_ms, task))
    }
}

struct Inner<T> {
    delay_ms: u32,
    scheduler: Rc<dyn Scheduler>,
    timer: RefCell<Option<ScheduledTask>>,
    pending: RefCell<Option<T>>,
    run: Box<dyn Fn(T)>,
}

impl<T> Inner<T> {
    fn run_pending(&self) {
        let pending = self.pending.borrow_mut().take();
        if let Some(args) = pending {
            (self.run)(args);
        }
    }

    fn clear_timer(&self) {
        let timer = self.timer.borrow_mut().take();
        drop(timer);
    }
}

/// Trailing debounce: only the arguments of the last call within the delay
/// window are run.
///
/// At most one timer is live; each call cancels the one before it.
pub struct Debounced<T> {
    inner: Rc<Inner<T>>,
}

impl<T: 'static> Debounced<T> {
    pub fn new(delay_ms: u32, scheduler: Rc<dyn Scheduler>, run: impl Fn(T) + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                delay_ms,
                scheduler,
                timer: RefCell::new(None),
                pending: RefCell::new(None),
                run: Box::new(run),
            }),
        }
    }

    /// Replace any pending arguments with `args` and restart the delay.
    pub fn call(&self, args: T) {
        if self.inner.pending.borrow_mut().replace(args).is_some() {
            log::trace!("debounced call superseded");
        }
        let weak: Weak<Inner<T>> = Rc::downgrade(&self.inner);
        let timer = self.inner.scheduler.schedule(
            self.inner.delay_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.run_pending();
                }
            }),
        );
        let previous = self.inner.timer.borrow_mut().replace(timer);
        drop(previous);
    }

    /// Run the pending call now, if there is one.
    pub fn flush(&self) {
        self.inner.clear_timer();
        self.inner.run_pending();
    }

    /// Drop the pending call without running it.
    pub fn cancel(&self) {
        self.inner.clear_timer();
        self.inner.pending.borrow_mut().take();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }
}
