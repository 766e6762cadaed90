//! Iteration controller: drives N map → shuffle → aggregate passes.
//!
//! Each pass consumes the previous pass's aggregate output in full. Nothing
//! but the record stream crosses a pass boundary, so any pass can be replayed
//! from its stored input; the controller keeps every pass's reduce output
//! around for exactly that reason and deletes only superseded intermediates.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::phase::{ActivationMap, ActivationReduce};
use crate::substrate::{PhaseStats, Substrate};
use crate::Result;

// ============================================================================
// Configuration
// ============================================================================

/// Engine configuration. The pass count bounds cost; there is no convergence
/// check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of propagation passes. After k passes, scores reflect every
    /// path of length ≤ k from the root. Typical values are 3–5.
    pub passes: u32,
    /// Prefix under which all datasets of a run are named.
    pub namespace: String,
    /// Keep every intermediate dataset instead of only each pass's reduce
    /// output.
    pub keep_intermediate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            passes: 3,
            namespace: "activation".to_string(),
            keep_intermediate: false,
        }
    }
}

impl EngineConfig {
    pub fn with_passes(passes: u32) -> Self {
        Self { passes, ..Self::default() }
    }

    /// Name of a run-level dataset, e.g. `activation/init`.
    pub fn dataset(&self, name: &str) -> String {
        format!("{}/{name}", self.namespace)
    }

    /// Name of a per-pass stage dataset, e.g. `activation/pass_2/reduced`.
    pub fn pass_dataset(&self, pass: u32, stage: &str) -> String {
        format!("{}/pass_{pass}/{stage}", self.namespace)
    }
}

// ============================================================================
// Pass state machine
// ============================================================================

/// Controller state. `Running(i)` covers pass *i* from its map through the
/// durable materialization of its aggregate output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Init,
    Running(u32),
    Done,
}

/// Accounting for one completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass: u32,
    pub map: PhaseStats,
    pub reduce: PhaseStats,
}

/// Accounting for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub passes: Vec<PassReport>,
    final_dataset: String,
}

impl RunReport {
    /// The dataset holding the final pass's aggregate output.
    pub fn final_dataset(&self) -> &str {
        &self.final_dataset
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Run all configured passes. Expects the loader's output at
/// `config.dataset("init")`; returns once the final aggregate output is
/// materialized.
pub async fn run_passes<S: Substrate>(substrate: &S, config: &EngineConfig) -> Result<RunReport> {
    let mut state = PassState::Init;
    let mut input = config.dataset("init");
    let mut passes = Vec::new();

    loop {
        state = match state {
            PassState::Init if config.passes == 0 => PassState::Done,
            PassState::Init => PassState::Running(1),
            PassState::Running(pass) => {
                let report = run_pass(substrate, config, pass, &input).await?;
                input = config.pass_dataset(pass, "reduced");
                passes.push(report);
                if pass == config.passes {
                    PassState::Done
                } else {
                    PassState::Running(pass + 1)
                }
            }
            PassState::Done => break,
        };
    }

    Ok(RunReport { passes, final_dataset: input })
}

/// One pass: map → sort → scatter → reduce, then drop the superseded
/// intermediates. The reduce output is the pass's durable replay point and is
/// always retained.
async fn run_pass<S: Substrate>(
    substrate: &S,
    config: &EngineConfig,
    pass: u32,
    input: &str,
) -> Result<PassReport> {
    let mapped = config.pass_dataset(pass, "mapped");
    let shuffled = config.pass_dataset(pass, "shuffled");
    let scattered = config.pass_dataset(pass, "scattered");
    let reduced = config.pass_dataset(pass, "reduced");

    let map = substrate.map(&ActivationMap, input, &mapped).await?;
    substrate.sort(&mapped, &shuffled).await?;
    substrate.scatter(&shuffled, &scattered).await?;
    let reduce = substrate.reduce(&ActivationReduce, &scattered, &reduced).await?;

    if !config.keep_intermediate {
        substrate.delete(&mapped).await?;
        substrate.delete(&shuffled).await?;
        substrate.delete(&scattered).await?;
    }

    info!(
        pass,
        records_in = map.records_in,
        records_out = reduce.records_out,
        malformed = map.malformed + reduce.malformed,
        mismatched = reduce.mismatched,
        "pass complete"
    );
    Ok(PassReport { pass, map, reduce })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_naming() {
        let config = EngineConfig::default();
        assert_eq!(config.dataset("init"), "activation/init");
        assert_eq!(config.pass_dataset(2, "reduced"), "activation/pass_2/reduced");
    }

    #[test]
    fn test_config_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.passes, 3);
        assert_eq!(config.namespace, "activation");
        assert!(!config.keep_intermediate);
    }
}
