#![forbid(unsafe_code)]

//! Core: values, observable objects, and key paths.
//!
//! # Role in kvo
//! `kvo-core` defines the observable capability that chained observation
//! (`kvo-chain`) is written against, plus a concrete object model that
//! implements it.
//!
//! # Primary responsibilities
//! - **Value**: the dynamic value type stored in properties.
//! - **Observable**: `get` / `add_observer` / `remove_observer` / `revision`.
//! - **Object**: a shared, revision-tracked property bag with change batching.
//! - **Record**: a plain, read-only field map that cannot be observed.
//! - **KeyPath**: dotted path parsing and one-shot resolution.

pub mod error;
pub mod object;
pub mod observable;
pub mod path;
pub mod record;
pub mod value;

pub use error::{KvoError, Result};
pub use object::{ChangeBatch, Object};
pub use observable::{Handler, Observable, ObserverId};
pub use path::{DEFAULT_SEPARATOR, KeyPath, get_path};
pub use record::Record;
pub use value::{Source, Value};
