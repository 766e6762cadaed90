//! Tagged records and the tab-separated wire codec.
//!
//! Every stage boundary exchanges `(key, value)` pairs of text. The value is
//! one of two shapes:
//!
//! - `NODE\t<score>` — a score, or a contribution to one
//! - `edge\t<relation>\t<destination>\t<weight>\t<carried>` — an edge carrying
//!   its source's last aggregated score (`-` while unresolved)
//!
//! Parsing is total over well-formed lines and returns `MalformedRecord` for
//! everything else; callers drop the record and keep going.

use super::NodeKey;
use crate::{Error, Result};

/// Wire tag for node values.
const NODE_TAG: &str = "NODE";
/// Wire tag for edge values. Lowercase is historical and deliberate.
const EDGE_TAG: &str = "edge";
/// Wire form of an unresolved carried score.
const UNRESOLVED: &str = "-";

/// A directed weighted edge. Persists across passes unchanged except for
/// `carried`, which each aggregate re-stamps with the source's fresh score.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub relation: String,
    pub destination: NodeKey,
    pub weight: f64,
    /// The source's score as of the last aggregate, or `None` if no pass has
    /// resolved it yet. A deferred edge emits no contribution.
    pub carried: Option<f64>,
}

impl Edge {
    pub fn new(relation: impl Into<String>, destination: impl Into<NodeKey>, weight: f64) -> Self {
        Self {
            relation: relation.into(),
            destination: destination.into(),
            weight,
            carried: None,
        }
    }

    pub fn with_carried(mut self, score: f64) -> Self {
        self.carried = Some(score);
        self
    }

    /// The contribution this edge sends to its destination, if its source
    /// score is resolved.
    pub fn contribution(&self) -> Option<f64> {
        self.carried.map(|s| self.weight * s)
    }
}

/// The unit flowing between stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Node { score: f64 },
    Edge(Edge),
}

impl Record {
    pub fn node(score: f64) -> Self {
        Record::Node { score }
    }

    /// Parse a wire value. The grouping key is not part of the value.
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split('\t');
        match parts.next() {
            Some(NODE_TAG) => {
                let score = parse_score(value, parts.next())?;
                expect_end(value, parts.next())?;
                Ok(Record::Node { score })
            }
            Some(EDGE_TAG) => {
                let relation = field(value, parts.next(), "relation")?;
                let destination = field(value, parts.next(), "destination")?;
                let weight = parse_score(value, parts.next())?;
                let carried = match field(value, parts.next(), "carried score")? {
                    UNRESOLVED => None,
                    raw => Some(parse_score(value, Some(raw))?),
                };
                expect_end(value, parts.next())?;
                Ok(Record::Edge(Edge {
                    relation: relation.to_string(),
                    destination: NodeKey::new(destination),
                    weight,
                    carried,
                }))
            }
            _ => Err(malformed(value, "unknown record tag")),
        }
    }

    /// Serialize to the wire value.
    pub fn to_wire(&self) -> String {
        match self {
            Record::Node { score } => format!("{NODE_TAG}\t{score}"),
            Record::Edge(e) => {
                let carried = match e.carried {
                    Some(s) => s.to_string(),
                    None => UNRESOLVED.to_string(),
                };
                format!(
                    "{EDGE_TAG}\t{}\t{}\t{}\t{carried}",
                    e.relation,
                    e.destination.as_str(),
                    e.weight,
                )
            }
        }
    }
}

/// A record together with the key it is grouped under.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    pub key: NodeKey,
    pub record: Record,
}

impl KeyedRecord {
    pub fn new(key: impl Into<NodeKey>, record: Record) -> Self {
        Self { key: key.into(), record }
    }

    pub fn parse(key: &str, value: &str) -> Result<Self> {
        Ok(Self::new(key, Record::parse(value)?))
    }

    /// The `(key, value)` pair this record travels as.
    pub fn to_pair(&self) -> (String, String) {
        (self.key.as_str().to_string(), self.record.to_wire())
    }
}

fn malformed(line: &str, reason: &str) -> Error {
    Error::MalformedRecord { line: line.to_string(), reason: reason.to_string() }
}

fn field<'a>(line: &str, part: Option<&'a str>, name: &str) -> Result<&'a str> {
    part.ok_or_else(|| malformed(line, &format!("missing {name} field")))
}

fn parse_score(line: &str, part: Option<&str>) -> Result<f64> {
    let raw = field(line, part, "score")?;
    let score: f64 = raw
        .parse()
        .map_err(|_| malformed(line, "score is not a number"))?;
    if score.is_nan() {
        return Err(malformed(line, "score is NaN"));
    }
    Ok(score)
}

fn expect_end(line: &str, part: Option<&str>) -> Result<()> {
    match part {
        None => Ok(()),
        Some(_) => Err(malformed(line, "trailing fields")),
    }
}
