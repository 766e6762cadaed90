//! # halo-rs — Spreading-Activation Engine
//!
//! Computes per-node activation scores over a large directed weighted concept
//! graph by flooding confidence outward from the root node `"/"`, expressed as
//! a fixed number of distributed map/sort/reduce passes.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `Substrate` is the contract between the engine and the
//!    execution layer (in-memory for tests, a cluster in production)
//! 2. **Clean DTOs**: `NodeKey`, `Record`, `KeyedRecord` cross all boundaries
//! 3. **Pure phases**: map is a per-record function, aggregate is a per-group
//!    fold; neither retains state across records or groups
//! 4. **Bounded cost**: a configured pass count, never a convergence loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use halo::Engine;
//!
//! # async fn example() -> halo::Result<()> {
//! let edges = std::io::BufReader::new(std::fs::File::open("edges.json")?);
//!
//! // Three passes of propagation over an in-memory substrate.
//! let engine = Engine::open_memory();
//! let result = engine.run(edges).await?;
//!
//! for (key, score) in &result.scores {
//!     println!("{key}\t{score}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Record Stream
//!
//! Every stage boundary speaks the same tab-separated key-value format:
//!
//! | Value | Shape |
//! |-------|-------|
//! | Node | `NODE\t<score>` |
//! | Edge | `edge\t<relation>\t<destination>\t<weight>\t<carried>` |
//!
//! The grouping key travels as the separate key half of each pair. An edge
//! whose source score is not yet resolved carries `-` in the last field and
//! stays dormant until an aggregate stamps it.

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod loader;
pub mod phase;
pub mod substrate;
pub mod controller;
pub mod extract;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    NodeKey, NodeClass, Record, Edge, KeyedRecord,
    ROOT_KEY, CONJUNCTION_PREFIX, EPSILON, MIN_SCORE,
};

// ============================================================================
// Re-exports: Substrate
// ============================================================================

pub use substrate::{
    Substrate, MemorySubstrate, MapFn, ReduceFn, Emit, PhaseStats,
};

// ============================================================================
// Re-exports: Controller / Extractor
// ============================================================================

pub use controller::{EngineConfig, PassState, RunReport};
pub use extract::ScoreTable;

use std::io::BufRead;
use tracing::{info, warn};

// ============================================================================
// Top-level Engine handle
// ============================================================================

/// The primary entry point. An `Engine` wraps an execution substrate and
/// drives load → N × (map → shuffle → aggregate) → extract.
pub struct Engine<S: Substrate> {
    substrate: S,
    config: EngineConfig,
}

/// Final output of a run: the surviving scores plus per-pass accounting.
#[derive(Debug, Clone)]
pub struct ActivationResult {
    pub scores: ScoreTable,
    pub report: RunReport,
}

impl<S: Substrate> Engine<S> {
    /// Create an Engine with the given substrate and default configuration.
    pub fn with_substrate(substrate: S) -> Self {
        Self { substrate, config: EngineConfig::default() }
    }

    /// Create an Engine with an explicit configuration.
    pub fn with_config(substrate: S, config: EngineConfig) -> Self {
        Self { substrate, config }
    }

    /// Run the full activation pipeline over a stream of JSON edge
    /// descriptors (one `{start, end, type, weight?}` object per line).
    pub async fn run<R: BufRead>(&self, edges: R) -> Result<ActivationResult> {
        // Phase 1: Load — seed the root and turn descriptors into records.
        let loaded = loader::load_edges(edges)?;
        for err in &loaded.skipped {
            warn!(%err, "skipped edge descriptor");
        }

        let init = self.config.dataset("init");
        self.substrate.write(&init, loaded.into_pairs()).await?;

        // Phase 2: Iterate — N map/sort/reduce passes.
        let report = controller::run_passes(&self.substrate, &self.config).await?;

        // Phase 3: Extract — filter the final pass's node scores.
        let pairs = self.substrate.read(report.final_dataset()).await?;
        let scores = extract::extract_scores(&pairs);
        info!(passes = report.passes.len(), nodes = scores.len(), "activation run complete");

        Ok(ActivationResult { scores, report })
    }

    /// Access the underlying substrate (for advanced use).
    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// The configuration this engine runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// In-memory engine for testing and embedding.
impl Engine<MemorySubstrate> {
    pub fn open_memory() -> Self {
        Self::with_substrate(MemorySubstrate::new())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A line (or edge descriptor) does not parse into the expected shape.
    /// Record-level: the offending record is dropped, the batch continues.
    #[error("malformed record: {reason}: {line:?}")]
    MalformedRecord { line: String, reason: String },

    /// A record was grouped under a key that is not its own. Record-level:
    /// the record is excluded from the fold and reported, never silently
    /// replaced by a sentinel.
    #[error("key mismatch: record keyed {found:?} in group {group:?}")]
    KeyMismatch { group: String, found: String },

    /// An intermediate dataset is missing or unreadable. Structural: fatal.
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// The execution substrate failed. Structural: fatal.
    #[error("substrate error: {0}")]
    Substrate(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
