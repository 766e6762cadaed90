//! # Record Model
//!
//! The data that flows between pipeline stages: keys, node classes, and the
//! tagged records of the tab-separated wire format.
//!
//! Design rule: NO substrate types, NO phase logic here. This module is pure
//! data — no I/O, no state, no async.

pub mod key;
pub mod record;

pub use key::{NodeKey, NodeClass, ROOT_KEY, CONJUNCTION_PREFIX};
pub use record::{Record, Edge, KeyedRecord};

/// Substituted for an exact-zero contribution in the conjunction combine.
pub const EPSILON: f64 = 1e-9;

/// Scores below this are clamped to 0 by the aggregate and dropped by the
/// extractor.
pub const MIN_SCORE: f64 = 1e-8;
