//! Router → machine assignment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::graph::RouterGraph;

/// How routers are spread over machines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementPolicy {
    /// `node_i → machines[i mod len(machines)]`
    #[default]
    RoundRobin,
}

/// Node → machine mapping plus its reverse index.
///
/// A machine hosts several routers when there are more nodes than
/// machines; a router's position in its machine's list decides its ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterPlacement {
    node_to_machine: Vec<String>,
    machine_to_nodes: BTreeMap<String, Vec<usize>>,
}

impl RouterPlacement {
    pub fn machine_of(&self, node: usize) -> Option<&str> {
        self.node_to_machine.get(node).map(String::as_str)
    }

    pub fn nodes_on(&self, machine: &str) -> &[usize] {
        self.machine_to_nodes
            .get(machine)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Index of `node` among the routers of its machine.
    pub fn position(&self, node: usize) -> Option<usize> {
        let machine = self.machine_of(node)?;
        self.nodes_on(machine).iter().position(|&n| n == node)
    }

    pub fn machines(&self) -> impl Iterator<Item = &String> {
        self.machine_to_nodes.keys()
    }
}

/// Assign every node of `graph` to one of `machines`.
pub fn place(
    graph: &RouterGraph,
    machines: &[String],
    policy: PlacementPolicy,
) -> TopologyResult<RouterPlacement> {
    if machines.is_empty() {
        return Err(TopologyError::NoMachines("routers".to_string()));
    }
    let mut node_to_machine = Vec::with_capacity(graph.node_count());
    let mut machine_to_nodes: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for node in graph.nodes() {
        let machine = match policy {
            PlacementPolicy::RoundRobin => &machines[node % machines.len()],
        };
        node_to_machine.push(machine.clone());
        machine_to_nodes.entry(machine.clone()).or_default().push(node);
    }
    Ok(RouterPlacement {
        node_to_machine,
        machine_to_nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;

    fn machines(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_robin_wraps_around() {
        let graph = build("complete_graph", &[5]).unwrap();
        let placement = place(&graph, &machines(&["m1", "m2"]), PlacementPolicy::RoundRobin).unwrap();
        assert_eq!(placement.machine_of(0), Some("m1"));
        assert_eq!(placement.machine_of(1), Some("m2"));
        assert_eq!(placement.machine_of(4), Some("m1"));
        assert_eq!(placement.nodes_on("m1"), &[0, 2, 4]);
        assert_eq!(placement.nodes_on("m2"), &[1, 3]);
        assert_eq!(placement.position(4), Some(2));
        assert_eq!(placement.position(3), Some(1));
    }

    #[test]
    fn more_machines_than_nodes_leaves_some_idle() {
        let graph = build("path_graph", &[2]).unwrap();
        let placement = place(&graph, &machines(&["a", "b", "c"]), PlacementPolicy::default()).unwrap();
        assert_eq!(placement.machines().count(), 2);
        assert!(placement.nodes_on("c").is_empty());
    }

    #[test]
    fn no_machines_is_an_error() {
        let graph = build("complete_graph", &[2]).unwrap();
        assert!(matches!(
            place(&graph, &[], PlacementPolicy::RoundRobin),
            Err(TopologyError::NoMachines(_))
        ));
    }
}
