//! Filter exactness classification.

use serde::{Deserialize, Serialize};

/// How faithfully a rendered query fragment reproduces a traversal predicate.
///
/// Variants are declared worst-first so the derived ordering puts `Full` on
/// top; [`Support::join`] is therefore the minimum of its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Support {
    /// No safe fragment exists; the predicate is evaluated in-process only.
    None,
    /// The fragment is a superset filter; matches must be re-checked.
    Partial,
    /// The fragment is equivalent to the predicate for every row.
    Full,
}

impl Support {
    /// Combine two classifications, keeping the worse one.
    pub fn join(self, other: Support) -> Support {
        self.min(other)
    }

    /// Join over an iterator of classifications. An empty input is `Full`.
    pub fn join_all<I: IntoIterator<Item = Support>>(supports: I) -> Support {
        supports.into_iter().fold(Support::Full, Support::join)
    }

    /// Whether a fragment with this classification may be rendered at all.
    pub fn is_pushable(self) -> bool {
        self != Support::None
    }

    /// Whether the fragment is exact.
    pub fn is_full(self) -> bool {
        self == Support::Full
    }
}

impl std::fmt::Display for Support {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Support::Full => write!(f, "FULL"),
            Support::Partial => write!(f, "PARTIAL"),
            Support::None => write!(f, "NONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keeps_worse() {
        assert_eq!(Support::Full.join(Support::Full), Support::Full);
        assert_eq!(Support::Full.join(Support::Partial), Support::Partial);
        assert_eq!(Support::Partial.join(Support::None), Support::None);
        assert_eq!(Support::None.join(Support::Full), Support::None);
    }

    #[test]
    fn test_join_all() {
        assert_eq!(Support::join_all([]), Support::Full);
        assert_eq!(
            Support::join_all([Support::Full, Support::Partial, Support::Full]),
            Support::Partial
        );
    }

    #[test]
    fn test_ordering() {
        assert!(Support::Full > Support::Partial);
        assert!(Support::Partial > Support::None);
        assert!(Support::Partial.is_pushable());
        assert!(!Support::None.is_pushable());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Support::Partial).unwrap();
        assert_eq!(json, "\"PARTIAL\"");
    }
}
