//! Typed lifecycle events and the listeners that observe them.
//!
//! The connection manager publishes `ConnectionEvent`s and the retry
//! executor publishes `RetryEvent`s. Both describe one role, and most of
//! them one concrete address, so listeners can correlate a retry with the
//! connection replacement that caused it.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event about the calls or connection of one role.
pub trait ClientEvent: Send + Sync + fmt::Debug {
    /// Short variant name, e.g. `"Replaced"` or `"Exhausted"`.
    fn kind(&self) -> &'static str;

    /// When the event was emitted.
    fn timestamp(&self) -> Instant;

    /// The role the event concerns.
    fn role(&self) -> &str;

    /// The service address involved, when the event has one.
    ///
    /// For a replacement this is the new address.
    fn address(&self) -> Option<&str>;
}

/// Receives events of one type.
pub trait EventListener<E: ClientEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// Listeners registered on a config, invoked in registration order.
pub struct EventListeners<E: ClientEvent> {
    listeners: Vec<Arc<dyn EventListener<E>>>,
}

impl<E: ClientEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener.
    ///
    /// A listener that panics is skipped; later listeners still run and the
    /// panic never reaches the call path.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener.on_event(event)));
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: ClientEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: ClientEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ClientEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
///
/// The `on_*` builder methods wrap each callback in one of these, filtering
/// for the variant they care about.
pub struct FnListener<E, F> {
    f: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ClientEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
