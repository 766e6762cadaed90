//! GraphLoader: raw edge descriptors → the engine's initial record stream.
//!
//! Input is newline-delimited JSON, one `{start, end, type, weight?}` object
//! per line. Each descriptor becomes an `Edge` record keyed by its start node.
//! The root is seeded with score 1.0 and every other referenced key with 0.
//!
//! A descriptor that fails to parse, or that lacks `start` or `end`, is
//! skipped and reported; the rest of the batch is unaffected.

use std::io::BufRead;

use hashbrown::HashSet;
use serde::Deserialize;

use crate::model::{Edge, KeyedRecord, NodeKey, Record};
use crate::{Error, Result};

/// Collaborator input format: one raw edge per JSON line.
///
/// All fields are optional at the parse level so a missing endpoint surfaces
/// as a `MalformedRecord` for that line alone rather than a batch failure.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEdge {
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(rename = "type")]
    pub relation: Option<String>,
    pub weight: Option<f64>,
}

/// Loader output: the seeded record stream plus the descriptors it skipped.
#[derive(Debug)]
pub struct LoadOutput {
    pub records: Vec<KeyedRecord>,
    pub skipped: Vec<Error>,
}

impl LoadOutput {
    /// The `(key, value)` pairs to write as the initial dataset.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.records.iter().map(KeyedRecord::to_pair).collect()
    }
}

/// Read descriptors from `input` and build the initial record stream.
///
/// Only an unreadable input stream is fatal; malformed descriptors are
/// collected in `LoadOutput::skipped`.
pub fn load_edges<R: BufRead>(input: R) -> Result<LoadOutput> {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut referenced: Vec<NodeKey> = Vec::new();

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_descriptor(&line) {
            Ok((start, edge)) => {
                for key in [&start, &edge.destination] {
                    if seen.insert(key.as_str().to_string()) {
                        referenced.push(key.clone());
                    }
                }
                records.push(KeyedRecord::new(start, Record::Edge(edge)));
            }
            Err(err) => skipped.push(err),
        }
    }

    // Seed scores: 1.0 at the root, 0 everywhere else. The root seed is
    // emitted even for graphs that never mention "/" explicitly.
    if !seen.contains("/") {
        referenced.push(NodeKey::root());
    }
    for key in referenced {
        let score = if key.is_root() { 1.0 } else { 0.0 };
        records.push(KeyedRecord::new(key, Record::node(score)));
    }

    Ok(LoadOutput { records, skipped })
}

fn parse_descriptor(line: &str) -> Result<(NodeKey, Edge)> {
    let raw: RawEdge = serde_json::from_str(line).map_err(|e| Error::MalformedRecord {
        line: line.to_string(),
        reason: format!("invalid JSON: {e}"),
    })?;

    let start = raw.start.ok_or_else(|| missing(line, "start"))?;
    let end = raw.end.ok_or_else(|| missing(line, "end"))?;
    let relation = raw.relation.unwrap_or_default();
    let weight = raw.weight.unwrap_or(1.0);

    let start = NodeKey::new(start);
    let mut edge = Edge::new(relation, end, weight);
    // Root-sourced edges are resolvable immediately; everything else defers
    // until a pass has computed the source's score.
    if start.is_root() {
        edge.carried = Some(1.0);
    }
    Ok((start, edge))
}

fn missing(line: &str, fields: &str) -> Error {
    Error::MalformedRecord {
        line: line.to_string(),
        reason: format!("missing {fields}"),
    }
}
