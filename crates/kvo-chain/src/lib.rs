#![forbid(unsafe_code)]

//! Chained key-path observation.
//!
//! A [`PropertyChain`] watches a dotted path such as `"org.plan.name"` from a
//! root value. Every segment is a link observing one object; when any link's
//! property changes, the links below it are re-pointed at the newly resolved
//! objects and the terminal callback fires with the current leaf value.
//!
//! # Invariants
//!
//! 1. A chain over an N-segment path has exactly N links for its lifetime.
//! 2. Each link is registered on at most one object, its current observed
//!    object, and always unregisters before switching.
//! 3. Construction primes every link without invoking the callback (unless
//!    [`ChainConfig::with_prime_silently`] turns that off).
//! 4. After [`PropertyChain::destroy`] no object holds a registration from
//!    any link, and further calls are no-ops.

pub mod chain;
pub mod config;

pub use chain::{ChainCallback, ChainChange, PropertyChain};
pub use config::ChainConfig;
pub use kvo_core::{KeyPath, KvoError, Result, Value};
