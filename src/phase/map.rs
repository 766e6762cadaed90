//! Map phase: one hop of propagation per record.

use crate::model::{Record, ROOT_KEY};
use crate::substrate::{Emit, MapFn};
use crate::Result;

/// The per-record map function, applied once per pass.
///
/// - The root's node record passes through with its score forced to 1.0.
/// - Every other node record is dropped: non-root scores are recomputed each
///   pass from that pass's contributions, and carrying the previous score
///   forward would count it twice.
/// - An edge is re-emitted unchanged under its source key, so it persists
///   into the next pass. If its carried source score is resolved it also
///   emits a `Node{weight × score}` contribution under its destination key;
///   a deferred edge contributes nothing until an aggregate stamps it.
pub struct ActivationMap;

impl MapFn for ActivationMap {
    fn apply(&self, key: &str, value: &str, out: &mut Emit) -> Result<()> {
        let record = match Record::parse(value) {
            Ok(record) => record,
            Err(err) => {
                out.reject(err);
                return Ok(());
            }
        };

        match record {
            Record::Node { .. } if key == ROOT_KEY => {
                out.pair(ROOT_KEY, Record::node(1.0).to_wire());
            }
            Record::Node { .. } => {}
            Record::Edge(edge) => {
                out.pair(key, value);
                if let Some(contribution) = edge.contribution() {
                    out.pair(edge.destination.as_str(), Record::node(contribution).to_wire());
                }
            }
        }
        Ok(())
    }
}
