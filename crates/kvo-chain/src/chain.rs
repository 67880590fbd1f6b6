//! Property chains: one observing link per key-path segment.
//!
//! # Design
//!
//! Links live in a fixed `Vec` indexed root (0) to tail (N-1); "next" is
//! simply `index + 1`. Each link owns an [`ObserverId`] issued at
//! construction and registers a handler on its observed object under that
//! id. Handlers capture a `Weak` reference to the chain, so observed objects
//! never keep a chain alive. Links in turn hold their observed objects (and
//! plain records) weakly, so a chain never keeps the graph alive either; an
//! object dropped by its owners reads as `Null`.
//!
//! ```text
//!   root ──org──▶ O1 ──plan──▶ P1 ──name──▶ "Alpha"
//!   link 0        link 1        link 2 (tail, fires callback)
//! ```
//!
//! # Propagation
//!
//! `property_did_change(i)` reads the link's property and hands the result
//! to link `i + 1` via `object_did_change`. That call swaps registrations if
//! the object changed and recurses. The tail invokes the callback instead.
//! Null values propagate like any other: downstream links end up observing
//! `Null` and the callback fires with a `Null` value.
//!
//! # Failure Modes
//!
//! - **Destroyed chain**: every operation on a destroyed chain is a no-op.
//! - **Re-entrant callback**: the callback may mutate observed objects or
//!   destroy the chain. No borrow is held while it runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use kvo_core::{Handler, KeyPath, Observable, ObserverId, Record, Result, Value};

use crate::config::ChainConfig;

/// Notification delivered to a chain's callback.
#[derive(Debug, Clone, Copy)]
pub struct ChainChange<'a> {
    /// The object the tail link observes (the owner of the leaf property).
    pub object: &'a Value,
    /// The leaf property name.
    pub property: &'a str,
    /// The leaf value just read.
    pub value: &'a Value,
    /// `object`'s revision, if it is observable.
    pub revision: Option<u64>,
}

/// Terminal callback of a chain.
pub type ChainCallback = Rc<dyn Fn(&ChainChange<'_>)>;

/// Non-owning view of the value a link observes.
enum Observed {
    Object(Weak<dyn Observable>),
    Record(Weak<Record>),
    /// Null and scalars. Nothing to own.
    Scalar(Value),
}

impl Default for Observed {
    fn default() -> Self {
        Self::Scalar(Value::Null)
    }
}

impl Observed {
    fn new(value: &Value) -> Self {
        match value {
            Value::Object(obj) => Self::Object(Rc::downgrade(obj)),
            Value::Record(rec) => Self::Record(Rc::downgrade(rec)),
            other => Self::Scalar(other.clone()),
        }
    }

    /// Upgrade to a usable value. Dead references read as `Null`.
    fn value(&self) -> Value {
        match self {
            Self::Object(weak) => weak.upgrade().map_or(Value::Null, Value::Object),
            Self::Record(weak) => weak.upgrade().map_or(Value::Null, Value::Record),
            Self::Scalar(value) => value.clone(),
        }
    }
}

struct Link {
    observer: ObserverId,
    object: Observed,
}

struct ChainInner {
    path: KeyPath,
    links: RefCell<Vec<Link>>,
    callback: RefCell<Option<ChainCallback>>,
    destroyed: Cell<bool>,
}

impl ChainInner {
    fn property(&self, index: usize) -> &str {
        &self.path.segments()[index]
    }

    fn handler(self: &Rc<Self>, index: usize) -> Handler {
        let weak: Weak<Self> = Rc::downgrade(self);
        Rc::new(move |_: &str| {
            if let Some(chain) = weak.upgrade() {
                chain.property_did_change(index);
            }
        })
    }

    /// Point link `index` at `new_object`.
    ///
    /// Registration is only touched when the object actually differs, but
    /// the link always re-reads its property so everything downstream is
    /// re-evaluated.
    fn object_did_change(self: &Rc<Self>, index: usize, new_object: Value) {
        if self.destroyed.get() {
            return;
        }
        let (observer, old_object) = {
            let links = self.links.borrow();
            let link = &links[index];
            (link.observer, link.object.value())
        };

        if !old_object.same(&new_object) {
            let property = self.property(index);
            if let Some(old) = old_object.as_observable() {
                old.remove_observer(property, observer);
            }
            self.links.borrow_mut()[index].object = Observed::new(&new_object);
            if let Some(new) = new_object.as_observable() {
                new.add_observer(property, observer, self.handler(index));
            }
            tracing::trace!(
                link = index,
                property,
                observable = new_object.as_observable().is_some(),
                "link re-pointed"
            );
        }

        self.property_did_change(index);
    }

    fn property_did_change(self: &Rc<Self>, index: usize) {
        if self.destroyed.get() {
            return;
        }
        let object = self.links.borrow()[index].object.value();
        let property = self.property(index);
        let value = object.get(property);

        if index + 1 < self.path.depth() {
            self.object_did_change(index + 1, value);
            return;
        }

        let callback = self.callback.borrow().clone();
        if let Some(callback) = callback {
            let revision = object.as_observable().map(|obj| obj.revision());
            callback(&ChainChange {
                object: &object,
                property,
                value: &value,
                revision,
            });
        }
    }

    fn teardown(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        let detached: Vec<(ObserverId, Value)> = self
            .links
            .borrow_mut()
            .iter_mut()
            .map(|link| (link.observer, std::mem::take(&mut link.object).value()))
            .collect();

        // Tail first, mirroring a recursive post-order teardown.
        for (index, (observer, object)) in detached.iter().enumerate().rev() {
            if let Some(obj) = object.as_observable() {
                obj.remove_observer(self.property(index), *observer);
            }
        }
        self.callback.borrow_mut().take();

        tracing::debug!(path = %self.path, "chain destroyed");
    }
}

/// A live observation of a key path rooted at one value.
///
/// Dropping the chain destroys it.
pub struct PropertyChain {
    inner: Rc<ChainInner>,
}

impl PropertyChain {
    /// Observe `path` from `root`, invoking `callback` on every future change.
    ///
    /// # Errors
    ///
    /// [`KvoError::InvalidArgument`](kvo_core::KvoError::InvalidArgument) if
    /// `path` is empty or has an empty segment.
    pub fn create<F>(root: impl Into<Value>, path: &str, callback: F) -> Result<Self>
    where
        F: Fn(&ChainChange<'_>) + 'static,
    {
        Self::create_with_config(root, path, &ChainConfig::default(), callback)
    }

    /// [`create`](Self::create) with explicit options.
    ///
    /// # Errors
    ///
    /// As for [`create`](Self::create), using `config.separator`.
    pub fn create_with_config<F>(
        root: impl Into<Value>,
        path: &str,
        config: &ChainConfig,
        callback: F,
    ) -> Result<Self>
    where
        F: Fn(&ChainChange<'_>) + 'static,
    {
        let path = KeyPath::parse_with(path, config.separator)?;
        Ok(Self::from_key_path(
            root,
            path,
            config.prime_silently,
            Rc::new(callback),
        ))
    }

    /// Build a chain over an already-validated path.
    #[must_use]
    pub fn from_key_path(
        root: impl Into<Value>,
        path: KeyPath,
        prime_silently: bool,
        callback: ChainCallback,
    ) -> Self {
        let links = (0..path.depth())
            .map(|_| Link {
                observer: ObserverId::fresh(),
                object: Observed::default(),
            })
            .collect();
        let inner = Rc::new(ChainInner {
            path,
            links: RefCell::new(links),
            callback: RefCell::new(None),
            destroyed: Cell::new(false),
        });

        if prime_silently {
            inner.object_did_change(0, root.into());
            *inner.callback.borrow_mut() = Some(callback);
        } else {
            *inner.callback.borrow_mut() = Some(callback);
            inner.object_did_change(0, root.into());
        }

        tracing::debug!(path = %inner.path, links = inner.path.depth(), "chain created");
        Self { inner }
    }

    /// Re-point the root link at `root` and propagate down the chain.
    pub fn object_did_change(&self, root: impl Into<Value>) {
        self.inner.object_did_change(0, root.into());
    }

    /// Re-read the root link's property and propagate, as if the root object
    /// had reported a change.
    pub fn property_did_change(&self) {
        self.inner.property_did_change(0);
    }

    /// Unregister every link and drop the callback. Safe to call repeatedly.
    pub fn destroy(&self) {
        self.inner.teardown();
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// The observed path.
    #[must_use]
    pub fn path(&self) -> &KeyPath {
        &self.inner.path
    }

    /// Number of links. Equal to the path's segment count.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.path.depth()
    }

    /// Property watched by link `index`.
    #[must_use]
    pub fn property(&self, index: usize) -> Option<&str> {
        self.inner.path.segments().get(index).map(String::as_str)
    }

    /// Object currently observed by link `index`.
    #[must_use]
    pub fn observed_object(&self, index: usize) -> Option<Value> {
        self.inner
            .links
            .borrow()
            .get(index)
            .map(|link| link.object.value())
    }

    /// Identity token link `index` registers under.
    #[must_use]
    pub fn observer_id(&self, index: usize) -> Option<ObserverId> {
        self.inner.links.borrow().get(index).map(|link| link.observer)
    }

    /// Current leaf value, read from the tail's observed object.
    #[must_use]
    pub fn value(&self) -> Value {
        let tail = self.depth() - 1;
        let object = self.inner.links.borrow()[tail].object.value();
        object.get(self.inner.property(tail))
    }
}

impl fmt::Debug for PropertyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChain")
            .field("path", &self.inner.path.to_string())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

impl Drop for PropertyChain {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use kvo_core::{KvoError, Object};

    fn noop(_: &ChainChange<'_>) {}

    fn counting() -> (Rc<Cell<u32>>, impl Fn(&ChainChange<'_>) + 'static) {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        (count, move |_: &ChainChange<'_>| {
            count_clone.set(count_clone.get() + 1)
        })
    }

    #[test]
    fn empty_path_is_invalid_argument() {
        let err = PropertyChain::create(Value::Null, "", noop).unwrap_err();
        assert!(matches!(err, KvoError::InvalidArgument { .. }));
    }

    #[test]
    fn one_link_per_segment() {
        let chain = PropertyChain::create(Value::Null, "a.b.c", noop).unwrap();
        assert_eq!(chain.depth(), 3);
        assert_eq!(chain.property(0), Some("a"));
        assert_eq!(chain.property(2), Some("c"));
        assert_eq!(chain.property(3), None);
        assert!(chain.observed_object(3).is_none());
    }

    #[test]
    fn observer_ids_are_distinct_per_link() {
        let chain = PropertyChain::create(Value::Null, "a.b", noop).unwrap();
        assert_ne!(chain.observer_id(0), chain.observer_id(1));
    }

    #[test]
    fn priming_registers_without_firing() {
        let leaf = Rc::new(Object::with_properties([("b", 1i64)]));
        let root = Rc::new(Object::with_properties([("a", Value::from(&leaf))]));
        let (count, cb) = counting();

        let chain = PropertyChain::create(&root, "a.b", cb).unwrap();
        assert_eq!(count.get(), 0);
        assert_eq!(root.observer_count("a"), 1);
        assert_eq!(leaf.observer_count("b"), 1);
        assert!(chain.observed_object(1).unwrap().same(&Value::from(&leaf)));
        assert_eq!(chain.value().as_int(), Some(1));
    }

    #[test]
    fn loud_priming_fires_once() {
        let root = Rc::new(Object::with_properties([("a", 7i64)]));
        let (count, cb) = counting();
        let cfg = ChainConfig::new().with_prime_silently(false);
        let _chain = PropertyChain::create_with_config(&root, "a", &cfg, cb).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn custom_separator() {
        let root = Rc::new(Object::with_properties([("a.b", 1i64)]));
        let cfg = ChainConfig::new().with_separator('/');
        let chain = PropertyChain::create_with_config(&root, "a.b", &cfg, noop).unwrap();
        assert_eq!(chain.depth(), 1);
        assert_eq!(chain.value().as_int(), Some(1));
    }

    #[test]
    fn callback_receives_object_property_value_revision() {
        let leaf = Rc::new(Object::with_properties([("name", "Alpha")]));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let leaf_value = Value::from(&leaf);

        let _chain = PropertyChain::create(&leaf, "name", move |change| {
            seen_clone.borrow_mut().push((
                change.object.same(&leaf_value),
                change.property.to_string(),
                change.value.as_str().map(str::to_string),
                change.revision,
            ));
        })
        .unwrap();

        leaf.set("name", "Beta");
        assert_eq!(
            *seen.borrow(),
            vec![(true, "name".to_string(), Some("Beta".to_string()), Some(1))]
        );
    }

    #[test]
    fn plain_records_resolve_but_are_not_observed() {
        let root = Value::from(Record::new([("a", Record::new([("b", 5i64)]))]));
        let (count, cb) = counting();
        let chain = PropertyChain::create(root.clone(), "a.b", cb).unwrap();
        assert_eq!(chain.value().as_int(), Some(5));
        assert!(chain.observed_object(1).unwrap().as_record().is_some());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn revision_is_none_for_plain_tail() {
        let rec = Rc::new(Record::new([("b", 5i64)]));
        let root = Rc::new(Object::with_properties([("a", Rc::clone(&rec))]));
        let revisions = Rc::new(RefCell::new(Vec::new()));
        let revisions_clone = Rc::clone(&revisions);
        let _chain = PropertyChain::create(&root, "a.b", move |change| {
            revisions_clone.borrow_mut().push(change.revision);
        })
        .unwrap();

        root.notify_property_change("a");
        assert_eq!(*revisions.borrow(), vec![None]);
    }

    #[test]
    fn same_object_does_not_reregister_but_still_fires() {
        let root = Rc::new(Object::with_properties([("a", 1i64)]));
        let (count, cb) = counting();
        let chain = PropertyChain::create(&root, "a", cb).unwrap();

        chain.object_did_change(&root);
        assert_eq!(root.observer_count("a"), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn root_repoint_moves_registration() {
        let first = Rc::new(Object::with_properties([("a", 1i64)]));
        let second = Rc::new(Object::with_properties([("a", 2i64)]));
        let last = Rc::new(Cell::new(0i64));
        let last_clone = Rc::clone(&last);
        let chain = PropertyChain::create(&first, "a", move |change| {
            last_clone.set(change.value.as_int().unwrap_or(-1));
        })
        .unwrap();

        chain.object_did_change(&second);
        assert_eq!(first.observer_count("a"), 0);
        assert_eq!(second.observer_count("a"), 1);
        assert_eq!(last.get(), 2);

        chain.object_did_change(Value::Null);
        assert_eq!(second.observer_count("a"), 0);
        assert_eq!(last.get(), -1);
    }

    #[test]
    fn manual_property_did_change_fires() {
        let root = Rc::new(Object::with_properties([("a", 1i64)]));
        let (count, cb) = counting();
        let chain = PropertyChain::create(&root, "a", cb).unwrap();
        chain.property_did_change();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn destroy_is_idempotent_and_silences() {
        let leaf = Rc::new(Object::with_properties([("b", 1i64)]));
        let root = Rc::new(Object::with_properties([("a", Value::from(&leaf))]));
        let (count, cb) = counting();
        let chain = PropertyChain::create(&root, "a.b", cb).unwrap();

        chain.destroy();
        assert!(chain.is_destroyed());
        assert_eq!(root.total_observer_count(), 0);
        assert_eq!(leaf.total_observer_count(), 0);
        assert!(chain.observed_object(0).unwrap().is_null());

        chain.destroy();
        leaf.set("b", 2i64);
        chain.object_did_change(&root);
        assert_eq!(count.get(), 0);
        assert_eq!(root.total_observer_count(), 0);
        assert!(chain.value().is_null());
    }

    #[test]
    fn drop_destroys() {
        let root = Rc::new(Object::with_properties([("a", 1i64)]));
        {
            let _chain = PropertyChain::create(&root, "a", noop).unwrap();
            assert_eq!(root.observer_count("a"), 1);
        }
        assert_eq!(root.observer_count("a"), 0);
    }

    #[test]
    fn callback_may_destroy_chain() {
        let root = Rc::new(Object::with_properties([("a", 1i64)]));
        let slot: Rc<RefCell<Option<PropertyChain>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let chain = PropertyChain::create(&root, "a", move |_| {
            if let Some(chain) = slot_clone.borrow().as_ref() {
                chain.destroy();
            }
        })
        .unwrap();
        *slot.borrow_mut() = Some(chain);

        root.set("a", 2i64);
        assert_eq!(root.observer_count("a"), 0);
        assert!(slot.borrow().as_ref().is_some_and(PropertyChain::is_destroyed));
    }

    #[test]
    fn links_do_not_own_observed_objects() {
        let leaf = Rc::new(Object::with_properties([("b", 1i64)]));
        let root = Rc::new(Object::with_properties([("a", Value::from(&leaf))]));
        let weak_root = Rc::downgrade(&root);
        let weak_leaf = Rc::downgrade(&leaf);
        let (count, cb) = counting();
        let chain = PropertyChain::create(&root, "a.b", cb).unwrap();

        drop(leaf);
        assert_eq!(Rc::strong_count(&root), 1);
        drop(root);
        assert!(weak_root.upgrade().is_none());
        assert!(weak_leaf.upgrade().is_none());

        assert!(chain.observed_object(0).unwrap().is_null());
        assert!(chain.observed_object(1).unwrap().is_null());
        assert!(chain.value().is_null());
        assert_eq!(count.get(), 0);

        chain.destroy();
        assert!(chain.is_destroyed());
    }

    #[test]
    fn dropped_intermediate_reads_null_and_repoint_recovers() {
        let mid = Rc::new(Object::with_properties([("b", 1i64)]));
        let root = Rc::new(Object::new());
        root.write("a", Value::from(&mid));
        let chain = PropertyChain::create(&root, "a.b", noop).unwrap();

        // Detach silently and drop: the link's reference goes dead.
        root.write("a", Value::Null);
        drop(mid);
        assert!(chain.observed_object(1).unwrap().is_null());

        let fresh = Rc::new(Object::with_properties([("b", 2i64)]));
        root.set("a", Value::from(&fresh));
        assert_eq!(fresh.observer_count("b"), 1);
        assert_eq!(chain.value().as_int(), Some(2));
    }

    #[test]
    fn self_referencing_path() {
        let node = Rc::new(Object::new());
        node.set("next", Value::from(&node));
        node.set("name", "loop");
        let chain = PropertyChain::create(&node, "next.next.name", noop).unwrap();
        assert_eq!(node.observer_count("next"), 2);
        assert_eq!(node.observer_count("name"), 1);
        assert_eq!(chain.value().as_str(), Some("loop"));

        chain.destroy();
        assert_eq!(node.total_observer_count(), 0);
        // Break the cycle so the test does not leak.
        node.set("next", Value::Null);
    }

    #[test]
    fn debug_format() {
        let chain = PropertyChain::create(Value::Null, "a.b", noop).unwrap();
        let dbg = format!("{chain:?}");
        assert!(dbg.contains("PropertyChain"));
        assert!(dbg.contains("a.b"));
    }
}
