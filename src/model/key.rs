//! Node keys and their combination class.

use serde::{Deserialize, Serialize};

/// Canonical key of the root node, the sole propagation source.
pub const ROOT_KEY: &str = "/";

/// Keys under this prefix combine contributions as a logical AND.
pub const CONJUNCTION_PREFIX: &str = "/conjunction";

/// How a node folds the contributions arriving at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    /// Arithmetic sum of contributions.
    Normal,
    /// Parallel combine `1 / Σ(1/vᵢ)` — the score of an AND of justifications.
    Conjunction,
}

impl NodeClass {
    /// Resolve the class from a key string. Called once at key construction,
    /// never per aggregate.
    pub fn of(uri: &str) -> Self {
        if uri.starts_with(CONJUNCTION_PREFIX) {
            NodeClass::Conjunction
        } else {
            NodeClass::Normal
        }
    }
}

/// A URI-like node key with its combination class resolved up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    uri: String,
    class: NodeClass,
}

impl NodeKey {
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let class = NodeClass::of(&uri);
        Self { uri, class }
    }

    /// The root node `"/"`.
    pub fn root() -> Self {
        Self::new(ROOT_KEY)
    }

    pub fn is_root(&self) -> bool {
        self.uri == ROOT_KEY
    }

    pub fn class(&self) -> NodeClass {
        self.class
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn into_string(self) -> String {
        self.uri
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl From<&str> for NodeKey {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for NodeKey {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_resolution() {
        assert_eq!(NodeKey::new("/c/en/cat").class(), NodeClass::Normal);
        assert_eq!(NodeKey::new("/conjunction/17").class(), NodeClass::Conjunction);
        assert_eq!(NodeKey::new("/").class(), NodeClass::Normal);
    }

    #[test]
    fn test_root() {
        assert!(NodeKey::root().is_root());
        assert!(!NodeKey::new("/c/en/cat").is_root());
        assert_eq!(NodeKey::root().as_str(), ROOT_KEY);
    }
}
