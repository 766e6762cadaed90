//! ResultExtractor: the final pass's node records, filtered and tabulated.

use tracing::warn;

use crate::model::{MIN_SCORE, Record};

/// The produced interface: node key → surviving activation score.
pub type ScoreTable = hashbrown::HashMap<String, f64>;

/// Filter the final record stream into a score table.
///
/// Pure, deterministic: keeps `Node` scores at or above `MIN_SCORE`, ignores
/// edges, drops malformed lines with a warning.
pub fn extract_scores(pairs: &[(String, String)]) -> ScoreTable {
    let mut scores = ScoreTable::new();
    for (key, value) in pairs {
        match Record::parse(value) {
            Ok(Record::Node { score }) if score >= MIN_SCORE => {
                scores.insert(key.clone(), score);
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "dropped record from final output"),
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_keeps_scores_and_drops_noise() {
        let input = pairs(&[
            ("/", "NODE\t1"),
            ("/c/en/cat", "NODE\t0.5"),
            ("/c/en/cat", "edge\tIsA\t/c/en/feline\t0.5\t1"),
            ("/c/en/ghost", "NODE\t0.000000001"),
            ("/c/en/broken", "NODE\tbogus"),
        ]);
        let scores = extract_scores(&input);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["/"], 1.0);
        assert_eq!(scores["/c/en/cat"], 0.5);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let scores = extract_scores(&pairs(&[("/c/en/faint", "NODE\t0.00000001")]));
        assert_eq!(scores["/c/en/faint"], 1e-8);
    }
}
