//! Revision-tracked observable property bag.
//!
//! # Design
//!
//! [`Object`] stores named [`Value`]s behind interior mutability and is
//! shared as `Rc<Object>`. Observers are keyed by `(property, ObserverId)`;
//! registering the same pair twice replaces the handler.
//!
//! # Invariants
//!
//! 1. `revision` increases by exactly 1 on each effective write.
//! 2. `set(k, v)` where `v` is the same as the current value is a no-op
//!    (no revision bump, no notification).
//! 3. Observers of a property are notified in registration order.
//! 4. While a [`ChangeBatch`] is open, notifications are queued once per
//!    property and delivered, in first-notified order, when the outermost
//!    batch closes.
//!
//! # Failure Modes
//!
//! - **Re-entrant dispatch**: handlers may read the object, write to it and
//!   add or remove observers. Dispatch runs over a snapshot taken before the
//!   first handler; a handler removed mid-dispatch is skipped.
//! - **Unbounded feedback**: a handler that unconditionally writes a new
//!   value to the property it observes recurses without limit.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::observable::{Handler, Observable, ObserverId};
use crate::value::Value;

struct Registration {
    property: Rc<str>,
    observer: ObserverId,
    handler: Handler,
}

/// An observable property bag.
#[derive(Default)]
pub struct Object {
    properties: RefCell<HashMap<String, Value>>,
    revision: Cell<u64>,
    observers: RefCell<Vec<Registration>>,
    batch_depth: Cell<usize>,
    pending: RefCell<Vec<String>>,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.properties.borrow().keys().cloned().collect();
        keys.sort();
        f.debug_struct("Object")
            .field("keys", &keys)
            .field("revision", &self.revision.get())
            .field("observer_count", &self.observers.borrow().len())
            .finish()
    }
}

impl Object {
    /// Create an empty object at revision 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object with initial properties. Initial properties do not
    /// count as mutations: the revision starts at 0.
    #[must_use]
    pub fn with_properties<K, V>(props: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let obj = Self::new();
        obj.properties
            .borrow_mut()
            .extend(props.into_iter().map(|(k, v)| (k.into(), v.into())));
        obj
    }

    /// Write `value` and notify observers of `key` if it changed.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if self.write(key.as_str(), value) {
            self.notify_property_change(&key);
        }
    }

    /// Write `value` without notifying anyone.
    ///
    /// Returns `true` if the stored value changed, in which case the
    /// revision was bumped.
    pub fn write(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        {
            let mut props = self.properties.borrow_mut();
            let unchanged = props.get(&key).map_or(value.is_null(), |old| old.same(&value));
            if unchanged {
                return false;
            }
            props.insert(key, value);
        }
        self.revision.set(self.revision.get() + 1);
        true
    }

    /// Deliver a change notification for `key` to its observers, or queue it
    /// if a batch is open.
    pub fn notify_property_change(&self, key: &str) {
        if self.batch_depth.get() > 0 {
            let mut pending = self.pending.borrow_mut();
            if !pending.iter().any(|k| k == key) {
                pending.push(key.to_string());
            }
            return;
        }
        self.dispatch(key);
    }

    /// Open a change batch. Notifications are held until the returned guard
    /// (and every enclosing one) is dropped.
    #[must_use = "dropping the guard immediately ends the batch"]
    pub fn begin_property_changes(&self) -> ChangeBatch<'_> {
        self.batch_depth.set(self.batch_depth.get() + 1);
        ChangeBatch { object: self }
    }

    /// Whether a change batch is currently open.
    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    /// Number of observers registered for `key`.
    #[must_use]
    pub fn observer_count(&self, key: &str) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|r| &*r.property == key)
            .count()
    }

    /// Number of observers registered across all properties.
    #[must_use]
    pub fn total_observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Whether `observer` is registered for `key`.
    #[must_use]
    pub fn is_observed_by(&self, key: &str, observer: ObserverId) -> bool {
        self.observers
            .borrow()
            .iter()
            .any(|r| r.observer == observer && &*r.property == key)
    }

    /// Property names in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.properties.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn end_property_changes(&self) {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        if depth > 0 {
            return;
        }
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for key in pending {
            self.dispatch(&key);
        }
    }

    fn dispatch(&self, key: &str) {
        // Snapshot so handlers can freely register and unregister.
        let snapshot: Vec<(ObserverId, Handler)> = self
            .observers
            .borrow()
            .iter()
            .filter(|r| &*r.property == key)
            .map(|r| (r.observer, Rc::clone(&r.handler)))
            .collect();

        tracing::trace!(key, observers = snapshot.len(), "property change");

        for (observer, handler) in snapshot {
            if self.is_observed_by(key, observer) {
                handler(key);
            }
        }
    }
}

impl Observable for Object {
    fn get(&self, property: &str) -> Value {
        self.properties
            .borrow()
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    fn add_observer(&self, property: &str, observer: ObserverId, handler: Handler) {
        let mut observers = self.observers.borrow_mut();
        if let Some(existing) = observers
            .iter_mut()
            .find(|r| r.observer == observer && &*r.property == property)
        {
            existing.handler = handler;
            return;
        }
        observers.push(Registration {
            property: Rc::from(property),
            observer,
            handler,
        });
    }

    fn remove_observer(&self, property: &str, observer: ObserverId) {
        self.observers
            .borrow_mut()
            .retain(|r| !(r.observer == observer && &*r.property == property));
    }

    fn revision(&self) -> u64 {
        self.revision.get()
    }
}

/// RAII guard for a change batch on one [`Object`].
///
/// Created by [`Object::begin_property_changes`]. Queued notifications are
/// delivered when the outermost guard drops.
pub struct ChangeBatch<'a> {
    object: &'a Object,
}

impl fmt::Debug for ChangeBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBatch")
            .field("depth", &self.object.batch_depth.get())
            .finish()
    }
}

impl Drop for ChangeBatch<'_> {
    fn drop(&mut self) {
        self.object.end_property_changes();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
