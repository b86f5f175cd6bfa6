//! Single-threaded input event stream.
//!
//! The application shell publishes raw window input here; scene components
//! subscribe for as long as they are mounted. A [`Subscription`] detaches its
//! listener when dropped, so a torn-down component can never be called back.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Raw input as delivered by the windowing layer (physical pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer moved to a position relative to the viewport's top-left corner
    PointerMoved { x: f64, y: f64 },
    /// Primary pointer button pressed or released
    PointerButton { pressed: bool },
    /// Scroll wheel, positive = away from the user
    Wheel { delta: f32 },
    /// Viewport resized
    Resized { width: u32, height: u32 },
}

type Listener = Box<dyn FnMut(&InputEvent)>;

struct BusInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
    /// Nesting depth of `publish` calls in progress
    dispatching: usize,
    /// Listeners cancelled while their list was checked out for dispatch
    cancelled: Vec<u64>,
}

/// Publish/subscribe channel for [`InputEvent`]s.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct InputBus {
    inner: Rc<RefCell<BusInner>>,
}

impl Default for InputBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                next_id: 0,
                listeners: Vec::new(),
                dispatching: 0,
                cancelled: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays attached until the returned guard drops.
    ///
    /// A listener added during a publish first hears the next event.
    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&InputEvent) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Box::new(listener)));
        log::trace!("input listener {} attached", id);

        Subscription {
            bus: Rc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Deliver an event to every attached listener, in subscription order.
    ///
    /// Listeners may subscribe or cancel subscriptions (their own included)
    /// while the event is delivered. A cancelled listener is not called again,
    /// not even later in the same delivery. An event published from inside a
    /// listener only reaches listeners added during the outer delivery.
    pub fn publish(&self, event: InputEvent) {
        let mut listeners = {
            let mut inner = self.inner.borrow_mut();
            inner.dispatching += 1;
            std::mem::take(&mut inner.listeners)
        };

        for (id, listener) in listeners.iter_mut() {
            if self.inner.borrow().cancelled.contains(id) {
                continue;
            }
            listener(&event);
        }

        let mut inner = self.inner.borrow_mut();
        inner.dispatching -= 1;
        let cancelled = &inner.cancelled;
        listeners.retain(|(id, _)| !cancelled.contains(id));
        if inner.dispatching == 0 {
            inner.cancelled.clear();
        }
        let added = std::mem::replace(&mut inner.listeners, listeners);
        inner.listeners.extend(added);
    }

    /// Number of currently attached listeners. Not meaningful from inside a
    /// listener.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// Guard for an attached listener. Detaches on drop or on [`Subscription::cancel`].
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    id: Option<u64>,
}

impl Subscription {
    /// Detach now. Calling this more than once has no effect.
    pub fn cancel(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        // The bus may already be gone; nothing left to detach from then.
        if let Some(bus) = self.bus.upgrade() {
            let mut inner = bus.borrow_mut();
            inner.listeners.retain(|(lid, _)| *lid != id);
            if inner.dispatching > 0 {
                inner.cancelled.push(id);
            }
            log::trace!("input listener {} detached", id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_publish_reaches_listeners_in_order() {
        let bus = InputBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = order.clone();
        let _a = bus.subscribe(move |_| first.borrow_mut().push("a"));
        let second = order.clone();
        let _b = bus.subscribe(move |_| second.borrow_mut().push("b"));

        bus.publish(InputEvent::PointerButton { pressed: true });
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_drop_detaches_listener() {
        let bus = InputBus::new();
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        let sub = bus.subscribe(move |_| counter.set(counter.get() + 1));
        assert_eq!(bus.listener_count(), 1);

        bus.publish(InputEvent::Wheel { delta: 1.0 });
        drop(sub);
        bus.publish(InputEvent::Wheel { delta: 1.0 });

        assert_eq!(hits.get(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let bus = InputBus::new();
        let mut sub = bus.subscribe(|_| {});
        let _other = bus.subscribe(|_| {});

        sub.cancel();
        sub.cancel();
        assert!(!sub.is_active());
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_listener_can_cancel_during_publish() {
        let bus = InputBus::new();
        let hits = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        // First listener drops the second one's guard
        let victim = slot.clone();
        let _first = bus.subscribe(move |_| {
            victim.borrow_mut().take();
        });
        let counter = hits.clone();
        *slot.borrow_mut() = Some(bus.subscribe(move |_| counter.set(counter.get() + 1)));

        bus.publish(InputEvent::Wheel { delta: 1.0 });
        bus.publish(InputEvent::Wheel { delta: 1.0 });

        assert_eq!(hits.get(), 0);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_listener_can_subscribe_during_publish() {
        let bus = InputBus::new();
        let hits = Rc::new(Cell::new(0));
        let added: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let handle = bus.clone();
        let store = added.clone();
        let counter = hits.clone();
        let _spawner = bus.subscribe(move |_| {
            if store.borrow().is_empty() {
                let counter = counter.clone();
                let sub = handle.subscribe(move |_| counter.set(counter.get() + 1));
                store.borrow_mut().push(sub);
            }
        });

        bus.publish(InputEvent::PointerButton { pressed: true });
        assert_eq!(hits.get(), 0);
        assert_eq!(bus.listener_count(), 2);

        bus.publish(InputEvent::PointerButton { pressed: false });
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = InputBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        // Must not panic
        drop(sub);
    }
}
