//! The observable capability.
//!
//! Anything that can be watched by a chain implements [`Observable`]. The
//! contract is deliberately small:
//!
//! | Operation         | Contract                                              |
//! |-------------------|-------------------------------------------------------|
//! | `get`             | synchronous read, `Value::Null` when missing          |
//! | `add_observer`    | one registration per `(property, ObserverId)`         |
//! | `remove_observer` | removes that registration, no-op when absent          |
//! | `revision`        | monotonic counter, bumped on every effective mutation |
//!
//! Handlers run synchronously on the caller's stack. Implementations must
//! not hold interior borrows while a handler runs, since handlers routinely
//! read the object and add or remove observers.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::Value;

/// Change handler. Receives the name of the property that changed.
pub type Handler = Rc<dyn Fn(&str)>;

/// Identity token for one observer registration.
///
/// Tokens are issued explicitly (one per chain link, for example) and passed
/// to both `add_observer` and `remove_observer`, so removing one observer
/// never disturbs another observer of the same property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Issue a token that no other call to `fresh` will return.
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw token value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// A value source that supports live change observation.
pub trait Observable: fmt::Debug {
    /// Read `property`. Missing properties read as [`Value::Null`].
    fn get(&self, property: &str) -> Value;

    /// Register `handler` under `(property, observer)`.
    ///
    /// Registering the same pair again replaces the previous handler.
    fn add_observer(&self, property: &str, observer: ObserverId, handler: Handler);

    /// Remove the registration for `(property, observer)`, if any.
    fn remove_observer(&self, property: &str, observer: ObserverId);

    /// Monotonic mutation counter.
    fn revision(&self) -> u64;
}
