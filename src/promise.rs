use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleError {
    #[error("promise already settled")]
    AlreadySettled,
}

struct Slot<T> {
    value: Option<T>,
    wakers: Vec<Waker>,
}

/// Write-once, read-many future.
///
/// Every clone shares the same slot: one side calls [`resolve`](Self::resolve)
/// exactly once, any number of clones can be awaited and each receives a clone
/// of the settled value.
pub struct ResolvablePromise<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> ResolvablePromise<T> {
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                value: None,
                wakers: Vec::new(),
            })),
        }
    }

    /// Settle the promise. A second call leaves the first value in place.
    pub fn resolve(&self, value: T) -> Result<(), SettleError> {
        let wakers = {
            let mut slot = self.slot.borrow_mut();
            if slot.value.is_some() {
                return Err(SettleError::AlreadySettled);
            }
            slot.value = Some(value);
            std::mem::take(&mut slot.wakers)
        };
        // Woken outside the borrow so a waker that polls inline cannot re-enter the slot.
        for waker in wakers {
            waker.wake();
        }
        Ok(())
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().value.is_some()
    }

    /// Number of tasks currently parked on this promise.
    pub fn waiting(&self) -> usize {
        self.slot.borrow().wakers.len()
    }
}

impl<T: Clone> ResolvablePromise<T> {
    /// Settled value, if any, without waiting.
    pub fn peek(&self) -> Option<T> {
        self.slot.borrow().value.clone()
    }
}

impl<T> Default for ResolvablePromise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ResolvablePromise<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> PartialEq for ResolvablePromise<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T> fmt::Debug for ResolvablePromise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvablePromise")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T: Clone> Future for ResolvablePromise<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut slot = self.slot.borrow_mut();
        if let Some(value) = slot.value.as_ref() {
            return Poll::Ready(value.clone());
        }
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
