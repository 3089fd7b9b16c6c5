//! Builds a join graph from its three-line text description.
//!
//! ```text
//! 3          relation count
//! 50,10,20   cardinalities in chain order
//! R0,R1      relation carrying the foreign key of each edge
//! ```

use std::collections::HashMap;
use std::path::Path;

use log::{debug, trace};

use super::error::{LoadError, LoadResult};
use super::graph::JoinGraph;
use super::types::{JoinCondition, Relation};

/// Build a join graph from the input lines. Lines past the third are ignored.
pub fn load_graph<S: AsRef<str>>(lines: &[S]) -> LoadResult<JoinGraph> {
    if lines.len() < 3 {
        return Err(LoadError::MissingLines { found: lines.len() });
    }

    let count_line = lines[0].as_ref().trim();
    let num_relations: usize = count_line
        .parse()
        .map_err(|_| LoadError::InvalidRelationCount(count_line.to_string()))?;
    if num_relations == 0 {
        return Err(LoadError::InvalidRelationCount(count_line.to_string()));
    }

    let relations = parse_relations(lines[1].as_ref(), num_relations)?;
    let join_conditions = parse_foreign_keys(lines[2].as_ref(), &relations)?;

    for condition in &join_conditions {
        trace!("Join condition {}", condition);
    }
    debug!(
        "Loaded join graph with {} relations and {} join conditions",
        relations.len(),
        join_conditions.len()
    );

    Ok(JoinGraph::from_parts(relations, join_conditions))
}

/// Build a join graph from a complete text description.
pub fn load_graph_from_str(text: &str) -> LoadResult<JoinGraph> {
    let lines: Vec<&str> = text.lines().collect();
    load_graph(&lines)
}

/// Read and build a join graph from a file.
pub fn load_graph_from_path(path: impl AsRef<Path>) -> LoadResult<JoinGraph> {
    let text = std::fs::read_to_string(path.as_ref())?;
    load_graph_from_str(&text)
}

fn parse_relations(line: &str, num_relations: usize) -> LoadResult<Vec<Relation>> {
    let cardinalities: Vec<&str> = line.split(',').map(str::trim).collect();
    if cardinalities.len() != num_relations {
        return Err(LoadError::CardinalityCountMismatch {
            expected: num_relations,
            found: cardinalities.len(),
        });
    }

    cardinalities
        .into_iter()
        .enumerate()
        .map(|(idx, value)| -> LoadResult<Relation> {
            let cardinality = value.parse().map_err(|_| LoadError::InvalidCardinality {
                position: idx,
                value: value.to_string(),
            })?;
            Ok(Relation::new(Relation::chain_name(idx), idx, cardinality))
        })
        .collect()
}

fn parse_foreign_keys(line: &str, relations: &[Relation]) -> LoadResult<Vec<JoinCondition>> {
    let line = line.trim();
    // A blank line lists no edges, which is what a single relation needs.
    let names: Vec<&str> = if line.is_empty() {
        Vec::new()
    } else {
        line.split(',').map(str::trim).collect()
    };

    let expected = relations.len() - 1;
    if names.len() != expected {
        return Err(LoadError::ForeignKeyCountMismatch {
            expected,
            found: names.len(),
        });
    }

    let name_to_idx: HashMap<&str, usize> = relations
        .iter()
        .map(|r| (r.name.as_str(), r.idx))
        .collect();

    names
        .into_iter()
        .enumerate()
        .map(|(edge, name)| -> LoadResult<JoinCondition> {
            let foreign_idx = *name_to_idx
                .get(name)
                .ok_or_else(|| LoadError::UnknownRelation(name.to_string()))?;
            let (left, right) = (&relations[edge], &relations[edge + 1]);
            if foreign_idx == left.idx {
                Ok(JoinCondition::new(right.clone(), left.clone()))
            } else if foreign_idx == right.idx {
                Ok(JoinCondition::new(left.clone(), right.clone()))
            } else {
                Err(LoadError::ForeignKeyNotOnEdge {
                    edge,
                    name: name.to_string(),
                })
            }
        })
        .collect()
}
