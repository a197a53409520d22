//! Property accessors and compute-once lazy materialization.
//!
//! The crate is layered bottom-up:
//!
//! - [`cell::BackingCell`] holds at most one value together with its presence flag.
//! - [`accessor`] puts a read/(optional) write surface in front of a cell, a computed
//!   expression or a [`lazy::Lazy`], applying validation rules, transforms and change hooks.
//! - [`lazy::Lazy`] runs a producer at most once (successfully) no matter how many threads
//!   ask for the value first, and hands every reader the same instance.
//!
//! [`singleton`] builds process-wide slots on top of [`lazy::Lazy`]. Most consumers will
//! declare properties through [`utils::conf::PropertyDecl`] and expose them through the
//! traits re-exported below.

pub mod accessor;
pub mod cell;
pub mod lazy;
pub mod singleton;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod utils;

pub use accessor::{Accessor, WriteAccessor};
pub use cell::BackingCell;
pub use lazy::{Lazy, MaterializerState};
pub use singleton::Singleton;
pub use utils::conf::PropertyDecl;
pub use utils::error::{ProducerFailure, PropError, PropResult, ValidationError};
