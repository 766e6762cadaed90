//! # Execution Substrate
//!
//! The consumed interface of the distributed batch layer. The engine needs
//! exactly four primitives over named datasets of tab-separated `(key, value)`
//! pairs — `map`, `sort`, `reduce`, `scatter` — plus durable read/write of
//! intermediate pass output.
//!
//! Phase logic never touches a dataset directly; it is handed in as a
//! [`MapFn`] or [`ReduceFn`] and applied by whatever implementation sits
//! behind the trait. [`MemorySubstrate`] is the single-partition reference
//! implementation used for tests and embedding.

mod memory;

pub use memory::MemorySubstrate;

use async_trait::async_trait;
use serde::Serialize;

use crate::{Error, Result};

// ============================================================================
// Phase function contracts
// ============================================================================

/// Output collector handed to phase functions.
///
/// Emitted pairs become the phase's output dataset. Rejected records are
/// record-level issues absorbed locally: the substrate logs and counts them,
/// and the phase keeps going.
#[derive(Debug, Default)]
pub struct Emit {
    pairs: Vec<(String, String)>,
    rejected: Vec<Error>,
}

impl Emit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one output pair.
    pub fn pair(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Report a record-level issue. The record is dropped; the phase is not.
    pub fn reject(&mut self, err: Error) {
        self.rejected.push(err);
    }

    pub(crate) fn take(self) -> (Vec<(String, String)>, Vec<Error>) {
        (self.pairs, self.rejected)
    }
}

/// A per-record transform. Must be pure: any record can be retried or
/// replayed in isolation.
pub trait MapFn: Send + Sync {
    /// Process one `(key, value)` pair. `Err` is reserved for structural
    /// failures; bad records go through [`Emit::reject`].
    fn apply(&self, key: &str, value: &str, out: &mut Emit) -> Result<()>;
}

/// A per-group fold. The substrate guarantees each call covers exactly one
/// key's records, in input order; nothing carries over between groups.
pub trait ReduceFn: Send + Sync {
    fn apply(&self, key: &str, pairs: &[(String, String)], out: &mut Emit) -> Result<()>;
}

// ============================================================================
// Stats
// ============================================================================

/// Accounting for one map or reduce application over a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseStats {
    pub records_in: u64,
    pub records_out: u64,
    /// Records dropped because they failed to parse.
    pub malformed: u64,
    /// Records dropped because they sat in a group keyed by another node.
    pub mismatched: u64,
}

impl PhaseStats {
    pub(crate) fn absorb(&mut self, err: &Error) {
        match err {
            Error::KeyMismatch { .. } => self.mismatched += 1,
            _ => self.malformed += 1,
        }
    }
}

// ============================================================================
// The Substrate trait
// ============================================================================

/// Batch-execution primitives over named datasets.
///
/// Implementations distribute work however they like; the contract is only
/// that `reduce` input grouped by key was previously `sort`ed, and that a
/// dataset written (or produced by a primitive) is durably readable until
/// deleted.
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Write a dataset, replacing any previous content under that name.
    async fn write(&self, dataset: &str, pairs: Vec<(String, String)>) -> Result<()>;

    /// Read a full dataset. Missing dataset is a structural failure.
    async fn read(&self, dataset: &str) -> Result<Vec<(String, String)>>;

    /// Apply `f` to every pair of `input`, writing emissions to `output`.
    async fn map(&self, f: &dyn MapFn, input: &str, output: &str) -> Result<PhaseStats>;

    /// Stable sort of `input` by key into `output`.
    async fn sort(&self, input: &str, output: &str) -> Result<()>;

    /// Apply `f` once per key group of the (sorted) `input`, writing
    /// emissions to `output`.
    async fn reduce(&self, f: &dyn ReduceFn, input: &str, output: &str) -> Result<PhaseStats>;

    /// Redistribute `input` across partitions into `output`.
    async fn scatter(&self, input: &str, output: &str) -> Result<()>;

    /// Drop a dataset. Deleting a missing dataset is not an error.
    async fn delete(&self, dataset: &str) -> Result<()>;
}
