//! Navigation path finder
//!
//! Shortest route between two entities over the relationship graph. Edges
//! count as undirected with unit weight; each step records whether it was
//! walked against the edge's declared direction so the access pattern can be
//! rendered correctly.

use crate::error::{QueryError, QueryResult};
use crate::model::{Cardinality, EdgeIdx, EntityIdx};
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::collections::VecDeque;

/// One traversed relationship
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    /// Declaration index of the edge
    pub edge: EdgeIdx,
    /// Entity this step leaves
    pub from: String,
    /// Entity this step arrives at
    pub to: String,
    pub label: String,
    /// Access pattern in the edge's declared direction
    pub access: String,
    pub cardinality: Cardinality,
    /// Walked from the edge's target back to its source
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationPath {
    pub from: String,
    pub to: String,
    pub steps: Vec<PathStep>,
}

impl NavigationPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Find a minimum-hop path from `from` to `to`.
///
/// Among equal-length paths the one whose edge declaration indices are
/// lexicographically smallest is returned, so the result is stable across
/// reloads of the same input.
pub fn find_path(snapshot: &Snapshot, from: &str, to: &str) -> QueryResult<NavigationPath> {
    let source = snapshot
        .entity_idx(from)
        .ok_or_else(|| QueryError::not_found(from))?;
    let target = snapshot
        .entity_idx(to)
        .ok_or_else(|| QueryError::not_found(to))?;

    let mut path = NavigationPath {
        from: from.to_string(),
        to: to.to_string(),
        steps: Vec::new(),
    };
    if source == target {
        return Ok(path);
    }

    let distance = distances_from(snapshot, target);
    if distance[source].is_none() {
        return Err(QueryError::NoPathFound {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    // Walk downhill; adjacency lists are in edge declaration order, so the
    // first qualifying neighbor carries the smallest edge index.
    let mut current = source;
    while current != target {
        let Some(remaining) = distance[current] else {
            break;
        };
        let Some(&(edge, next)) = snapshot
            .neighbors(current)
            .iter()
            .find(|(_, n)| distance[*n] == Some(remaining - 1))
        else {
            break;
        };

        path.steps.push(make_step(snapshot, edge, current, next));
        current = next;
    }

    log::debug!("path {} -> {}: {} steps", from, to, path.steps.len());
    Ok(path)
}

/// Hop distance from `target` to every entity, `None` if unreachable
fn distances_from(snapshot: &Snapshot, target: EntityIdx) -> Vec<Option<usize>> {
    let mut distance = vec![None; snapshot.entities().len()];
    let mut queue = VecDeque::new();
    distance[target] = Some(0);
    queue.push_back(target);

    while let Some(node) = queue.pop_front() {
        let next_distance = distance[node].map(|d| d + 1);
        for &(_, neighbor) in snapshot.neighbors(node) {
            if distance[neighbor].is_none() {
                distance[neighbor] = next_distance;
                queue.push_back(neighbor);
            }
        }
    }
    distance
}

fn make_step(snapshot: &Snapshot, edge: EdgeIdx, at: EntityIdx, next: EntityIdx) -> PathStep {
    let relationship = snapshot.edge_at(edge);
    let (declared_from, _) = snapshot.edge_endpoints(edge);
    PathStep {
        edge,
        from: snapshot.entity_at(at).id.clone(),
        to: snapshot.entity_at(next).id.clone(),
        label: relationship.label.clone(),
        access: relationship.access.clone(),
        cardinality: relationship.cardinality,
        reversed: declared_from != at,
    }
}

/// Render a traversal snippet: `x = a.B` for single-valued steps,
/// `for x in a.B:` (with nested indentation) for collections. Reversed steps
/// become a comment because the access pattern only reads forwards.
pub fn render_snippet(path: &NavigationPath) -> String {
    let mut lines = Vec::new();
    let mut indent = 0;

    for step in &path.steps {
        let pad = " ".repeat(indent * 4);
        let var = variable_name(&step.to);
        if step.reversed {
            lines.push(format!(
                "{pad}# {var}: owner of {} (inverse of {})",
                variable_name(&step.from),
                step.access
            ));
            continue;
        }
        match step.cardinality {
            Cardinality::One => lines.push(format!("{pad}{var} = {}", step.access)),
            Cardinality::Many => {
                lines.push(format!("{pad}for {var} in {}:", step.access));
                indent += 1;
            }
        }
    }
    lines.join("\n")
}

/// `LexEntry` -> `lex_entry`
fn variable_name(entity_id: &str) -> String {
    let mut out = String::with_capacity(entity_id.len() + 4);
    let mut prev_lower = false;
    for ch in entity_id.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else if ch.is_alphanumeric() {
            out.push(ch);
            prev_lower = true;
        } else {
            out.push('_');
            prev_lower = false;
        }
    }
    out
}
