//! In-memory execution substrate.
//!
//! This is the reference implementation of `Substrate`. Datasets are plain
//! vectors of pairs in a HashMap protected by RwLock.
//!
//! ## Limitations
//!
//! - **Single partition**: `scatter()` is an identity copy. There is nothing
//!   to redistribute.
//! - **No durability**: datasets live as long as the process. A run cannot be
//!   resumed across restarts.
//! - **Sequential phases**: `map` and `reduce` walk the dataset in order on
//!   one thread. The phase functions are pure, so a parallel implementation
//!   is free to split the work however it likes.
//!
//! Use this substrate for:
//! - Testing the loader, phases, and controller end to end
//! - Embedding the engine in applications that fit a graph in memory
//! - Validating correctness before running against a real cluster

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{Emit, MapFn, PhaseStats, ReduceFn, Substrate};
use crate::{Error, Result};

/// Single-partition in-memory dataset store.
#[derive(Clone, Default)]
pub struct MemorySubstrate {
    datasets: Arc<RwLock<HashMap<String, Vec<(String, String)>>>>,
}

impl MemorySubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all datasets currently held. Test/debug helper.
    pub fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn get(&self, dataset: &str) -> Result<Vec<(String, String)>> {
        self.datasets
            .read()
            .get(dataset)
            .cloned()
            .ok_or_else(|| Error::DatasetNotFound(dataset.to_string()))
    }

    fn put(&self, dataset: &str, pairs: Vec<(String, String)>) {
        self.datasets.write().insert(dataset.to_string(), pairs);
    }

    fn drain_emit(emit: Emit, out: &mut Vec<(String, String)>, stats: &mut PhaseStats) {
        let (pairs, rejected) = emit.take();
        stats.records_out += pairs.len() as u64;
        out.extend(pairs);
        for err in rejected {
            stats.absorb(&err);
            warn!(%err, "dropped record");
        }
    }
}

#[async_trait]
impl Substrate for MemorySubstrate {
    async fn write(&self, dataset: &str, pairs: Vec<(String, String)>) -> Result<()> {
        debug!(dataset, records = pairs.len(), "write");
        self.put(dataset, pairs);
        Ok(())
    }

    async fn read(&self, dataset: &str) -> Result<Vec<(String, String)>> {
        self.get(dataset)
    }

    async fn map(&self, f: &dyn MapFn, input: &str, output: &str) -> Result<PhaseStats> {
        let pairs = self.get(input)?;
        let mut stats = PhaseStats { records_in: pairs.len() as u64, ..Default::default() };
        let mut out = Vec::with_capacity(pairs.len());

        for (key, value) in &pairs {
            let mut emit = Emit::new();
            f.apply(key, value, &mut emit)?;
            Self::drain_emit(emit, &mut out, &mut stats);
        }

        debug!(input, output, ?stats, "map");
        self.put(output, out);
        Ok(stats)
    }

    async fn sort(&self, input: &str, output: &str) -> Result<()> {
        let mut pairs = self.get(input)?;
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(input, output, records = pairs.len(), "sort");
        self.put(output, pairs);
        Ok(())
    }

    async fn reduce(&self, f: &dyn ReduceFn, input: &str, output: &str) -> Result<PhaseStats> {
        let pairs = self.get(input)?;
        let mut stats = PhaseStats { records_in: pairs.len() as u64, ..Default::default() };
        let mut out = Vec::with_capacity(pairs.len());

        // Fold strictly within each same-key run of the sorted input. No
        // accumulator survives a group boundary.
        let mut rest = pairs.as_slice();
        while let Some((first, _)) = rest.first() {
            let run = rest.iter().take_while(|(k, _)| k == first).count();
            let (group, tail) = rest.split_at(run);
            let mut emit = Emit::new();
            f.apply(first, group, &mut emit)?;
            Self::drain_emit(emit, &mut out, &mut stats);
            rest = tail;
        }

        debug!(input, output, ?stats, "reduce");
        self.put(output, out);
        Ok(stats)
    }

    /// Single partition: redistribution degenerates to a copy.
    async fn scatter(&self, input: &str, output: &str) -> Result<()> {
        let pairs = self.get(input)?;
        self.put(output, pairs);
        Ok(())
    }

    async fn delete(&self, dataset: &str) -> Result<()> {
        self.datasets.write().remove(dataset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperMap;
    impl MapFn for UpperMap {
        fn apply(&self, key: &str, value: &str, out: &mut Emit) -> Result<()> {
            out.pair(key, value.to_uppercase());
            Ok(())
        }
    }

    struct CountReduce;
    impl ReduceFn for CountReduce {
        fn apply(&self, key: &str, pairs: &[(String, String)], out: &mut Emit) -> Result<()> {
            out.pair(key, pairs.len().to_string());
            Ok(())
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_map_applies_per_record() {
        let sub = MemorySubstrate::new();
        sub.write("in", pairs(&[("a", "x"), ("b", "y")])).await.unwrap();

        let stats = sub.map(&UpperMap, "in", "out").await.unwrap();
        assert_eq!(stats.records_in, 2);
        assert_eq!(stats.records_out, 2);
        assert_eq!(sub.read("out").await.unwrap(), pairs(&[("a", "X"), ("b", "Y")]));
    }

    #[tokio::test]
    async fn test_sort_is_stable_by_key() {
        let sub = MemorySubstrate::new();
        sub.write("in", pairs(&[("b", "1"), ("a", "2"), ("b", "0"), ("a", "1")]))
            .await
            .unwrap();

        sub.sort("in", "out").await.unwrap();
        assert_eq!(
            sub.read("out").await.unwrap(),
            pairs(&[("a", "2"), ("a", "1"), ("b", "1"), ("b", "0")])
        );
    }

    #[tokio::test]
    async fn test_reduce_folds_per_group() {
        let sub = MemorySubstrate::new();
        sub.write("in", pairs(&[("a", "x"), ("a", "y"), ("b", "z")])).await.unwrap();

        sub.reduce(&CountReduce, "in", "out").await.unwrap();
        assert_eq!(sub.read("out").await.unwrap(), pairs(&[("a", "2"), ("b", "1")]));
    }

    #[tokio::test]
    async fn test_missing_dataset_is_fatal() {
        let sub = MemorySubstrate::new();
        let err = sub.read("nope").await.unwrap_err();
        assert!(matches!(err, Error::DatasetNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let sub = MemorySubstrate::new();
        sub.delete("nope").await.unwrap();
    }
}
