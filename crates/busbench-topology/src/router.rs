//! Listener and connector synthesis for a router mesh.
//!
//! Each router gets one inter-router listener and one client-facing
//! listener. Routers sharing a machine are told apart by their position in
//! the machine's node list, which offsets both base ports. Every graph edge
//! becomes exactly one connector, owned by one of its two endpoints.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::graph::{RouterGraph, build};
use crate::placement::{PlacementPolicy, RouterPlacement, place};

pub const INTER_ROUTER_BASE_PORT: u16 = 6000;
pub const NORMAL_BASE_PORT: u16 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListenerRole {
    InterRouter,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub host: String,
    pub port: u16,
    pub role: ListenerRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticate_peer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_mechanisms: Option<String>,
}

/// Outgoing link to another router's inter-router listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub host: String,
    pub port: u16,
    pub role: ListenerRole,
}

/// Configuration of one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConf {
    pub router_id: String,
    pub node: usize,
    pub machine: String,
    pub listeners: Vec<Listener>,
    pub connectors: Vec<Connector>,
}

impl RouterConf {
    /// The listener agents connect to.
    pub fn normal_listener(&self) -> Option<&Listener> {
        self.listeners
            .iter()
            .find(|l| l.role == ListenerRole::Normal)
    }
}

fn offset_port(base: u16, position: usize, machine: &str) -> TopologyResult<u16> {
    u16::try_from(position)
        .ok()
        .and_then(|p| base.checked_add(p))
        .ok_or_else(|| TopologyError::PortRange(machine.to_string()))
}

/// `(machine, position)` of a node, failing on nodes the placement misses.
fn locate<'a>(placement: &'a RouterPlacement, node: usize) -> TopologyResult<(&'a str, usize)> {
    let machine = placement
        .machine_of(node)
        .ok_or_else(|| TopologyError::NoMachines(format!("router{node}")))?;
    let position = placement
        .position(node)
        .ok_or_else(|| TopologyError::NoMachines(format!("router{node}")))?;
    Ok((machine, position))
}

/// Produce one `RouterConf` per node of `graph`, in node order.
pub fn materialize(
    graph: &RouterGraph,
    placement: &RouterPlacement,
) -> TopologyResult<Vec<RouterConf>> {
    let mut routers = Vec::with_capacity(graph.node_count());
    for node in graph.nodes() {
        let (machine, position) = locate(placement, node)?;
        let listeners = vec![
            Listener {
                host: machine.to_string(),
                port: offset_port(INTER_ROUTER_BASE_PORT, position, machine)?,
                role: ListenerRole::InterRouter,
                authenticate_peer: None,
                sasl_mechanisms: None,
            },
            Listener {
                host: machine.to_string(),
                port: offset_port(NORMAL_BASE_PORT, position, machine)?,
                role: ListenerRole::Normal,
                authenticate_peer: Some("no".to_string()),
                sasl_mechanisms: Some("ANONYMOUS".to_string()),
            },
        ];
        routers.push(RouterConf {
            router_id: format!("router{node}"),
            node,
            machine: machine.to_string(),
            listeners,
            connectors: Vec::new(),
        });
    }

    for &(a, b) in graph.edges() {
        let (machine_a, _) = locate(placement, a)?;
        let (machine_b, _) = locate(placement, b)?;
        let (owner, target) = if (machine_a, a) <= (machine_b, b) {
            (a, b)
        } else {
            (b, a)
        };
        let (target_machine, target_position) = locate(placement, target)?;
        let connector = Connector {
            host: target_machine.to_string(),
            port: offset_port(INTER_ROUTER_BASE_PORT, target_position, target_machine)?,
            role: ListenerRole::InterRouter,
        };
        routers[owner].connectors.push(connector);
    }

    debug!(
        routers = routers.len(),
        connectors = graph.edges().len(),
        "materialized router mesh"
    );
    Ok(routers)
}

/// A router graph together with its placement and per-router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterTopology {
    pub graph: RouterGraph,
    pub placement: RouterPlacement,
    pub routers: Vec<RouterConf>,
}

impl RouterTopology {
    /// `build` + round-robin `place` + `materialize`.
    pub fn generate(kind: &str, args: &[u32], machines: &[String]) -> TopologyResult<Self> {
        let graph = build(kind, args)?;
        let placement = place(&graph, machines, PlacementPolicy::RoundRobin)?;
        let routers = materialize(&graph, &placement)?;
        Ok(Self {
            graph,
            placement,
            routers,
        })
    }

    pub fn connector_count(&self) -> usize {
        self.routers.iter().map(|r| r.connectors.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn machines(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn complete_graph_of_four_yields_one_connector_per_edge() {
        let topo = RouterTopology::generate("complete_graph", &[4], &machines(&["m1", "m2"])).unwrap();
        assert_eq!(topo.routers.len(), 4);
        assert_eq!(topo.connector_count(), 6);

        // Each node takes part in 3 links, counting both ends of a connector.
        let mut participations = vec![0usize; 4];
        for router in &topo.routers {
            for connector in &router.connectors {
                let target = topo
                    .routers
                    .iter()
                    .find(|r| {
                        r.machine == connector.host
                            && r.listeners
                                .iter()
                                .any(|l| l.role == ListenerRole::InterRouter && l.port == connector.port)
                    })
                    .unwrap();
                participations[router.node] += 1;
                participations[target.node] += 1;
            }
        }
        assert_eq!(participations, vec![3, 3, 3, 3]);
        assert_eq!(participations.iter().sum::<usize>(), 12);

        for router in &topo.routers {
            assert!(router.normal_listener().is_some());
        }
    }

    #[test]
    fn ports_follow_position_on_machine() {
        let topo = RouterTopology::generate("path_graph", &[3], &machines(&["m1", "m2"])).unwrap();
        // node 0 and 2 share m1.
        let r2 = &topo.routers[2];
        assert_eq!(r2.router_id, "router2");
        assert_eq!(r2.machine, "m1");
        assert_eq!(r2.listeners[0].port, 6001);
        assert_eq!(r2.normal_listener().unwrap().port, 5001);
        assert_eq!(r2.normal_listener().unwrap().sasl_mechanisms.as_deref(), Some("ANONYMOUS"));
    }

    #[test]
    fn listener_addresses_are_unique_per_machine() {
        let topo = RouterTopology::generate("complete_graph", &[7], &machines(&["a", "b", "c"])).unwrap();
        let mut seen = BTreeSet::new();
        for router in &topo.routers {
            for listener in &router.listeners {
                assert!(seen.insert((listener.host.clone(), listener.port)));
            }
        }
        assert_eq!(seen.len(), 14);
    }

    #[test]
    fn connector_is_owned_by_smaller_machine_node_pair() {
        // node 1 sits on "a", node 0 on "b": the edge belongs to node 1.
        let topo = RouterTopology::generate("path_graph", &[2], &machines(&["b", "a"])).unwrap();
        assert!(topo.routers[0].connectors.is_empty());
        assert_eq!(topo.routers[1].connectors.len(), 1);
        assert_eq!(topo.routers[1].connectors[0].host, "b");
        assert_eq!(topo.routers[1].connectors[0].port, 6000);
    }

    #[test]
    fn listener_roles_serialize_like_the_router_config() {
        let topo = RouterTopology::generate("path_graph", &[1], &machines(&["m"])).unwrap();
        let json = serde_json::to_value(&topo.routers[0]).unwrap();
        assert_eq!(json["listeners"][0]["role"], "inter-router");
        assert_eq!(json["listeners"][1]["role"], "normal");
        assert_eq!(json["listeners"][1]["authenticatePeer"], "no");
        assert!(json["listeners"][0].get("saslMechanisms").is_none());
    }
}
