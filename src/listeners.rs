//! Player listener registry.
//!
//! Notification passes iterate over a snapshot of the registered listeners, so
//! a callback may add or remove listeners (through a cloned registry handle)
//! without affecting the pass already in flight.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::protocol::PlayerEvent;

pub trait PlayerListener {
    fn on_player_event(&self, event: &PlayerEvent);
}

impl<F> PlayerListener for F
where
    F: Fn(&PlayerEvent),
{
    fn on_player_event(&self, event: &PlayerEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerEntry = (ListenerId, Rc<dyn PlayerListener>);

/// Cheaply clonable handle to one shared listener set.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    entries: Rc<RefCell<Vec<ListenerEntry>>>,
    next_id: Rc<Cell<u64>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Rc<dyn PlayerListener>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Delivers `event` to the listeners registered when the pass begins.
    pub fn notify(&self, event: &PlayerEvent) {
        let snapshot: Vec<Rc<dyn PlayerListener>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener.on_player_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::ListenerRegistry;
    use crate::protocol::PlayerEvent;

    #[test]
    fn test_notify_reaches_every_listener() {
        let registry = ListenerRegistry::new();
        let hits = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let hits = Rc::clone(&hits);
            registry.add(Rc::new(move |_: &PlayerEvent| hits.set(hits.get() + 1)));
        }

        registry.notify(&PlayerEvent::SeekProcessed);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn test_removed_listener_is_not_notified() {
        let registry = ListenerRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = registry.add(Rc::new(move |_: &PlayerEvent| counter.set(counter.get() + 1)));

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.notify(&PlayerEvent::SeekProcessed);
        assert_eq!(hits.get(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_listener_added_during_pass_misses_that_pass() {
        let registry = ListenerRegistry::new();
        let late_hits = Rc::new(Cell::new(0));

        let handle = registry.clone();
        let late = Rc::clone(&late_hits);
        registry.add(Rc::new(move |_: &PlayerEvent| {
            let late = Rc::clone(&late);
            handle.add(Rc::new(move |_: &PlayerEvent| late.set(late.get() + 1)));
        }));

        registry.notify(&PlayerEvent::SeekProcessed);
        assert_eq!(late_hits.get(), 0);
        assert_eq!(registry.len(), 2);

        registry.notify(&PlayerEvent::SeekProcessed);
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_listener_removed_during_pass_still_receives_that_pass() {
        let registry = ListenerRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let second_id = Rc::new(Cell::new(None));

        let handle = registry.clone();
        let id_slot = Rc::clone(&second_id);
        let log = Rc::clone(&seen);
        registry.add(Rc::new(move |_: &PlayerEvent| {
            log.borrow_mut().push("first");
            if let Some(id) = id_slot.get() {
                handle.remove(id);
            }
        }));
        let log = Rc::clone(&seen);
        let id = registry.add(Rc::new(move |_: &PlayerEvent| log.borrow_mut().push("second")));
        second_id.set(Some(id));

        registry.notify(&PlayerEvent::SeekProcessed);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);

        registry.notify(&PlayerEvent::SeekProcessed);
        assert_eq!(*seen.borrow(), vec!["first", "second", "first"]);
    }
}
