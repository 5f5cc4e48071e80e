use crate::promise::ResolvablePromise;
use gloo_events::EventListener;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Whether the hosting page is currently shown to the user.
pub trait PageVisibility {
    fn is_hidden(&self) -> bool;

    /// One-shot wait for the page to become visible again.
    fn wait_until_visible(&self) -> VisibilityWait;
}

/// Future for a single "became visible" signal.
///
/// Holds the underlying subscription; dropping the wait unsubscribes.
pub struct VisibilityWait {
    signal: ResolvablePromise<()>,
    _listener: Option<EventListener>,
}

impl VisibilityWait {
    pub fn new(signal: ResolvablePromise<()>, listener: EventListener) -> Self {
        Self {
            signal,
            _listener: Some(listener),
        }
    }

    /// A wait whose signal is resolved by someone else.
    pub fn detached(signal: ResolvablePromise<()>) -> Self {
        Self {
            signal,
            _listener: None,
        }
    }
}

impl Future for VisibilityWait {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.signal).poll(cx)
    }
}

/// The current browser page: `document.hidden` and the window `focus` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserVisibility;

impl PageVisibility for BrowserVisibility {
    fn is_hidden(&self) -> bool {
        gloo_utils::document().hidden()
    }

    fn wait_until_visible(&self) -> VisibilityWait {
        let signal = ResolvablePromise::new();
        let listener = {
            let signal = signal.clone();
            EventListener::once(&gloo_utils::window(), "focus", move |_| {
                let _ = signal.resolve(());
            })
        };
        VisibilityWait::new(signal, listener)
    }
}
