//! Base relation and foreign-key edge descriptors.

use std::fmt;

use serde::Serialize;

/// A base table taking part in the chain join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Relation {
    /// Relation name (`R<idx>` for loaded graphs).
    pub name: String,
    /// Zero-based position in the chain.
    pub idx: usize,
    /// Number of rows in the relation.
    pub cardinality: u64,
}

impl Relation {
    /// Create a new relation descriptor.
    pub fn new(name: impl Into<String>, idx: usize, cardinality: u64) -> Self {
        Self {
            name: name.into(),
            idx,
            cardinality,
        }
    }

    /// Canonical name for the relation at chain position `idx`.
    pub fn chain_name(idx: usize) -> String {
        format!("R{}", idx)
    }

    /// Check whether `other` sits directly after this relation in the chain.
    pub fn precedes(&self, other: &Relation) -> bool {
        self.idx + 1 == other.idx
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}):{}", self.name, self.idx, self.cardinality)
    }
}

/// A foreign-key edge between two chain-adjacent relations.
///
/// `foreign` carries the key that references the key of `primary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    /// Relation holding the referenced key.
    pub primary: Relation,
    /// Relation holding the foreign key.
    pub foreign: Relation,
}

impl JoinCondition {
    /// Create a new join condition.
    pub fn new(primary: Relation, foreign: Relation) -> Self {
        Self { primary, foreign }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.foreign.name, self.primary.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_display() {
        let rel = Relation::new("R0", 0, 50);
        assert_eq!(rel.to_string(), "R0(0):50");
    }

    #[test]
    fn test_chain_name() {
        assert_eq!(Relation::chain_name(0), "R0");
        assert_eq!(Relation::chain_name(12), "R12");
    }

    #[test]
    fn test_precedes() {
        let r0 = Relation::new("R0", 0, 10);
        let r1 = Relation::new("R1", 1, 10);
        let r2 = Relation::new("R2", 2, 10);

        assert!(r0.precedes(&r1));
        assert!(r1.precedes(&r2));
        assert!(!r0.precedes(&r2));
        assert!(!r1.precedes(&r0));
    }

    #[test]
    fn test_join_condition_display() {
        let cond = JoinCondition::new(Relation::new("R4", 4, 5), Relation::new("R3", 3, 100));
        assert_eq!(cond.to_string(), "R3 -> R4");
    }

    #[test]
    fn test_relation_serialization() {
        let rel = Relation::new("R1", 1, 10);
        let json = serde_json::to_string(&rel).unwrap();
        assert_eq!(json, r#"{"name":"R1","idx":1,"cardinality":10}"#);
    }
}
