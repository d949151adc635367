//! Router connectivity graphs.
//!
//! Generators follow the usual graph-library conventions for node
//! numbering so a topology name plus its arguments always describes the
//! same graph.

use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};

/// Undirected simple graph over nodes `0..node_count`.
///
/// Edges are stored once, as `(low, high)` pairs in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterGraph {
    node_count: usize,
    edges: Vec<(usize, usize)>,
}

impl RouterGraph {
    /// Build a graph from an arbitrary edge list; duplicates and
    /// reversed pairs collapse, self-loops are dropped.
    pub fn with_edges(
        node_count: usize,
        edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> TopologyResult<Self> {
        let mut set = BTreeSet::new();
        for (a, b) in edges {
            if a >= node_count || b >= node_count {
                return Err(TopologyError::InvalidEdge {
                    from: a,
                    to: b,
                    nodes: node_count,
                });
            }
            if a != b {
                set.insert((a.min(b), a.max(b)));
            }
        }
        Ok(Self {
            node_count,
            edges: set.into_iter().collect(),
        })
    }

    pub fn nodes(&self) -> Range<usize> {
        0..self.node_count
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Neighbors of `node` in ascending order.
    pub fn neighbors(&self, node: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .edges
            .iter()
            .filter_map(|&(a, b)| {
                if a == node {
                    Some(b)
                } else if b == node {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable();
        out
    }

    pub fn degree(&self, node: usize) -> usize {
        self.edges
            .iter()
            .filter(|&&(a, b)| a == node || b == node)
            .count()
    }
}

/// Supported graph generators with their sizing arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    /// `complete_graph(n)`
    Complete(usize),
    /// `cycle_graph(n)`
    Cycle(usize),
    /// `path_graph(n)`
    Path(usize),
    /// `star_graph(n)`: one hub and `n` leaves.
    Star(usize),
    /// `grid_2d_graph(rows, cols)`
    Grid2d(usize, usize),
    /// `balanced_tree(branching, height)`
    BalancedTree(usize, usize),
}

impl TopologyKind {
    pub fn parse(name: &str, args: &[u32]) -> TopologyResult<Self> {
        let expected = match name {
            "complete_graph" | "cycle_graph" | "path_graph" | "star_graph" => 1,
            "grid_2d_graph" | "balanced_tree" => 2,
            other => return Err(TopologyError::UnknownKind(other.to_string())),
        };
        if args.len() != expected {
            return Err(TopologyError::Arity {
                kind: name.to_string(),
                expected,
                got: args.len(),
            });
        }
        let a = args[0] as usize;
        Ok(match name {
            "complete_graph" => TopologyKind::Complete(a),
            "cycle_graph" => TopologyKind::Cycle(a),
            "path_graph" => TopologyKind::Path(a),
            "star_graph" => TopologyKind::Star(a),
            "grid_2d_graph" => TopologyKind::Grid2d(a, args[1] as usize),
            _ => TopologyKind::BalancedTree(a, args[1] as usize),
        })
    }

    pub fn generate(&self) -> TopologyResult<RouterGraph> {
        match *self {
            TopologyKind::Complete(n) => RouterGraph::with_edges(
                n,
                (0..n).flat_map(|a| (a + 1..n).map(move |b| (a, b))),
            ),
            TopologyKind::Cycle(n) => {
                RouterGraph::with_edges(n, (0..n).map(|a| (a, (a + 1) % n)))
            }
            TopologyKind::Path(n) => {
                RouterGraph::with_edges(n, (1..n).map(|b| (b - 1, b)))
            }
            TopologyKind::Star(leaves) => {
                RouterGraph::with_edges(leaves + 1, (1..=leaves).map(|leaf| (0, leaf)))
            }
            TopologyKind::Grid2d(rows, cols) => {
                let idx = |r: usize, c: usize| r * cols + c;
                let mut edges = Vec::new();
                for r in 0..rows {
                    for c in 0..cols {
                        if r + 1 < rows {
                            edges.push((idx(r, c), idx(r + 1, c)));
                        }
                        if c + 1 < cols {
                            edges.push((idx(r, c), idx(r, c + 1)));
                        }
                    }
                }
                RouterGraph::with_edges(rows * cols, edges)
            }
            TopologyKind::BalancedTree(branching, height) => {
                // Level sizes are branching^level; nodes are numbered breadth-first.
                let too_large =
                    || TopologyError::TooLarge(format!("balanced_tree({branching}, {height})"));
                let mut total = 0usize;
                let mut level = 1usize;
                for depth in 0..=height {
                    total = total.checked_add(level).ok_or_else(too_large)?;
                    if depth < height {
                        level = level.checked_mul(branching).ok_or_else(too_large)?;
                    }
                }
                let edges = (1..total).map(|child| ((child - 1) / branching.max(1), child));
                RouterGraph::with_edges(total, edges)
            }
        }
    }
}

/// Build the graph for a named topology.
pub fn build(kind: &str, args: &[u32]) -> TopologyResult<RouterGraph> {
    TopologyKind::parse(kind, args)?.generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_graph_has_all_pairs() {
        let g = build("complete_graph", &[4]).unwrap();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edges().len(), 6);
        for node in g.nodes() {
            assert_eq!(g.degree(node), 3);
        }
    }

    #[test]
    fn cycle_and_path() {
        let cycle = build("cycle_graph", &[5]).unwrap();
        assert_eq!(cycle.edges().len(), 5);
        assert_eq!(cycle.neighbors(0), vec![1, 4]);

        let path = build("path_graph", &[5]).unwrap();
        assert_eq!(path.edges().len(), 4);
        assert_eq!(path.degree(0), 1);
        assert_eq!(path.degree(2), 2);
    }

    #[test]
    fn two_node_cycle_collapses_to_one_edge() {
        let cycle = build("cycle_graph", &[2]).unwrap();
        assert_eq!(cycle.edges(), &[(0, 1)]);
        let single = build("cycle_graph", &[1]).unwrap();
        assert!(single.edges().is_empty());
    }

    #[test]
    fn star_has_hub_plus_leaves() {
        let star = build("star_graph", &[3]).unwrap();
        assert_eq!(star.node_count(), 4);
        assert_eq!(star.degree(0), 3);
    }

    #[test]
    fn grid_and_tree_sizes() {
        let grid = build("grid_2d_graph", &[2, 3]).unwrap();
        assert_eq!(grid.node_count(), 6);
        assert_eq!(grid.edges().len(), 7);

        let tree = build("balanced_tree", &[2, 2]).unwrap();
        assert_eq!(tree.node_count(), 7);
        assert_eq!(tree.edges().len(), 6);
        assert_eq!(tree.neighbors(0), vec![1, 2]);
        assert_eq!(tree.neighbors(2), vec![0, 5, 6]);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(matches!(
            build("petersen_graph", &[]),
            Err(TopologyError::UnknownKind(k)) if k == "petersen_graph"
        ));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(
            build("complete_graph", &[1, 2]),
            Err(TopologyError::Arity { expected: 1, got: 2, .. })
        ));
    }

    #[test]
    fn oversized_balanced_tree_is_rejected() {
        assert!(matches!(
            build("balanced_tree", &[u32::MAX, 3]),
            Err(TopologyError::TooLarge(_))
        ));
        assert_eq!(build("balanced_tree", &[1, 3]).unwrap().node_count(), 4);
    }

    #[test]
    fn out_of_range_edge_is_rejected() {
        assert!(RouterGraph::with_edges(2, [(0, 2)]).is_err());
    }
}
