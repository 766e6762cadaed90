//! Aggregate phase: fold one key group into one score.
//!
//! The fold is strictly per group. [`aggregate_group`] takes an explicit set
//! of keyed records and never retains anything across calls, so any group can
//! be re-reduced in isolation and yields identical output every time.

use smallvec::SmallVec;

use crate::model::{EPSILON, Edge, KeyedRecord, MIN_SCORE, NodeClass, NodeKey, Record};
use crate::substrate::{Emit, ReduceFn};
use crate::{Error, Result};

// ============================================================================
// Combination rules
// ============================================================================

/// Parallel combine of two contributions, exact-zero inputs floored at ε.
///
/// Commutative and associative for positive inputs; never divides by zero.
/// `conjunction_pair(0.0, x)` is a small positive value, not zero.
pub fn conjunction_pair(a: f64, b: f64) -> f64 {
    1.0 / (1.0 / a.max(EPSILON) + 1.0 / b.max(EPSILON))
}

/// Conjunction aggregate over a full contribution set:
/// `1 / Σ(1/max(vᵢ, ε))`, clamped to 0 below `MIN_SCORE`.
///
/// An empty set means "no information yet" and aggregates to 0.
pub fn combine_conjunction(contributions: &[f64]) -> f64 {
    if contributions.is_empty() {
        return 0.0;
    }
    let reciprocal_sum: f64 = contributions.iter().map(|v| 1.0 / v.max(EPSILON)).sum();
    let combined = 1.0 / reciprocal_sum;
    if combined < MIN_SCORE { 0.0 } else { combined }
}

fn combine_normal(contributions: &[f64]) -> f64 {
    contributions.iter().sum()
}

// ============================================================================
// Per-group fold
// ============================================================================

/// Everything one group fold produces.
#[derive(Debug)]
pub struct GroupOutcome {
    /// The group's edges re-stamped with the fresh score, then exactly one
    /// node record, all keyed by the group key.
    pub records: Vec<KeyedRecord>,
    /// The folded score for this key.
    pub aggregate: f64,
    /// Records excluded because their own key was not the group's.
    pub mismatches: Vec<Error>,
}

/// Fold one key group: split contributions from edges, combine by node
/// class, pin the root at 1.0, stamp the score onto every edge.
///
/// Pure and deterministic. A record keyed differently than `key` is a
/// `KeyMismatch`: it is left out of the fold and surfaced in the outcome
/// rather than folded under the wrong key or swallowed.
pub fn aggregate_group(key: &NodeKey, records: &[KeyedRecord]) -> GroupOutcome {
    let mut contributions: SmallVec<[f64; 8]> = SmallVec::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut mismatches = Vec::new();

    for keyed in records {
        if keyed.key != *key {
            mismatches.push(Error::KeyMismatch {
                group: key.as_str().to_string(),
                found: keyed.key.as_str().to_string(),
            });
            continue;
        }
        match &keyed.record {
            Record::Node { score } => contributions.push(*score),
            Record::Edge(edge) => edges.push(edge.clone()),
        }
    }

    let mut aggregate = match key.class() {
        NodeClass::Normal => combine_normal(&contributions),
        NodeClass::Conjunction => combine_conjunction(&contributions),
    };
    if key.is_root() {
        aggregate = 1.0;
    }

    let mut records = Vec::with_capacity(edges.len() + 1);
    for mut edge in edges {
        edge.carried = Some(aggregate);
        records.push(KeyedRecord::new(key.clone(), Record::Edge(edge)));
    }
    records.push(KeyedRecord::new(key.clone(), Record::node(aggregate)));

    GroupOutcome { records, aggregate, mismatches }
}

// ============================================================================
// Substrate adapter
// ============================================================================

/// The per-group reduce function, applied once per pass after the shuffle.
pub struct ActivationReduce;

impl ReduceFn for ActivationReduce {
    fn apply(&self, key: &str, pairs: &[(String, String)], out: &mut Emit) -> Result<()> {
        let group_key = NodeKey::new(key);
        let mut records = Vec::with_capacity(pairs.len());
        for (record_key, value) in pairs {
            match KeyedRecord::parse(record_key, value) {
                Ok(record) => records.push(record),
                Err(err) => out.reject(err),
            }
        }

        let outcome = aggregate_group(&group_key, &records);
        for err in outcome.mismatches {
            out.reject(err);
        }
        for record in &outcome.records {
            let (k, v) = record.to_pair();
            out.pair(k, v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: &str, score: f64) -> KeyedRecord {
        KeyedRecord::new(key, Record::node(score))
    }

    fn edge(key: &str, dest: &str, weight: f64) -> KeyedRecord {
        KeyedRecord::new(key, Record::Edge(Edge::new("IsA", dest, weight)))
    }

    #[test]
    fn test_normal_sums_contributions() {
        let key = NodeKey::new("/c/en/cat");
        let group = [node("/c/en/cat", 0.25), node("/c/en/cat", 0.5), node("/c/en/cat", 0.125)];
        let outcome = aggregate_group(&key, &group);
        assert!((outcome.aggregate - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_conjunction_parallel_combine() {
        let key = NodeKey::new("/conjunction/x");
        let group = [node("/conjunction/x", 2.0), node("/conjunction/x", 4.0)];
        let outcome = aggregate_group(&key, &group);
        // 1 / (1/2 + 1/4)
        assert!((outcome.aggregate - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_conjunction_zero_contribution_is_not_an_error() {
        let key = NodeKey::new("/conjunction/x");
        let group = [node("/conjunction/x", 0.0), node("/conjunction/x", 2.0)];
        let outcome = aggregate_group(&key, &group);
        // The zero contribution dominates through its ε floor; the combined
        // value lands below the clamp and resolves to 0.
        assert_eq!(outcome.aggregate, 0.0);
        assert!(outcome.mismatches.is_empty());
    }

    #[test]
    fn test_empty_group_is_no_information() {
        for uri in ["/c/en/cat", "/conjunction/x"] {
            let key = NodeKey::new(uri);
            let outcome = aggregate_group(&key, &[]);
            assert_eq!(outcome.aggregate, 0.0);
        }
    }

    #[test]
    fn test_root_overrides_fold() {
        let key = NodeKey::root();
        let group = [node("/", 0.2), node("/", 0.3)];
        let outcome = aggregate_group(&key, &group);
        assert_eq!(outcome.aggregate, 1.0);
    }

    #[test]
    fn test_edges_restamped_and_node_emitted_last() {
        let key = NodeKey::new("/c/en/cat");
        let group = [
            node("/c/en/cat", 0.5),
            edge("/c/en/cat", "/c/en/feline", 0.5),
            node("/c/en/cat", 0.5),
        ];
        let outcome = aggregate_group(&key, &group);
        assert_eq!(outcome.records.len(), 2);
        match &outcome.records[0].record {
            Record::Edge(e) => assert_eq!(e.carried, Some(1.0)),
            other => panic!("expected edge first, got {other:?}"),
        }
        assert_eq!(outcome.records[1].record, Record::node(1.0));
    }

    #[test]
    fn test_key_mismatch_surfaced_and_excluded() {
        let key = NodeKey::new("/c/en/cat");
        let group = [
            node("/c/en/cat", 0.5),
            node("/c/en/dog", 100.0),
            edge("/c/en/cat", "/c/en/feline", 1.0),
        ];
        let outcome = aggregate_group(&key, &group);
        assert_eq!(outcome.mismatches.len(), 1);
        assert!(matches!(outcome.mismatches[0], Error::KeyMismatch { .. }));
        // The stray contribution did not corrupt the fold.
        assert_eq!(outcome.aggregate, 0.5);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let key = NodeKey::new("/conjunction/x");
        let group = [
            node("/conjunction/x", 2.0),
            edge("/conjunction/x", "/c/en/cat", 1.0),
            node("/conjunction/x", 4.0),
        ];
        let first = aggregate_group(&key, &group);
        let second = aggregate_group(&key, &group);
        assert_eq!(first.aggregate, second.aggregate);
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn test_non_negative_given_non_negative_inputs() {
        let key = NodeKey::new("/c/en/cat");
        let group = [node("/c/en/cat", 0.0), node("/c/en/cat", 1.5), node("/c/en/cat", 0.25)];
        assert!(aggregate_group(&key, &group).aggregate >= 0.0);
    }

    #[test]
    fn test_reduce_adapter_rejects_drift_and_garbage() {
        let pairs = vec![
            ("/c/en/cat".to_string(), "NODE\t0.5".to_string()),
            ("/c/en/dog".to_string(), "NODE\t9".to_string()),
            ("/c/en/cat".to_string(), "not a record".to_string()),
        ];
        let mut emit = Emit::new();
        ActivationReduce.apply("/c/en/cat", &pairs, &mut emit).unwrap();
        let (out, rejected) = emit.take();

        assert_eq!(rejected.len(), 2);
        assert_eq!(out, vec![("/c/en/cat".to_string(), "NODE\t0.5".to_string())]);
    }

    #[test]
    fn test_pair_combine_handles_zero() {
        let v = conjunction_pair(0.0, 2.0);
        assert!(v > 0.0);
        assert!(v < 1e-8);
    }
}
