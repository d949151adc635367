//! Shard placement planner.
//!
//! For every role of a shard, agent `i` gets the effective index
//! `i + offset`; its machine, topic and bus endpoint are picked from their
//! pools by that index modulo the pool size. The shard's controller is
//! the only agent wired to every data-plane endpoint.

use std::collections::BTreeMap;

use busbench_core::{BusEndpoint, MachineRoles};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::agent::{AgentDescriptor, AgentKind, AgentSettings};
use crate::error::{PlacementError, PlacementResult};
use crate::layout::ShardRequest;

pub const ROLE_CLIENT: &str = "ombt-client";
pub const ROLE_SERVER: &str = "ombt-server";
pub const ROLE_CONTROL: &str = "ombt-control";
pub const ROLE_BUS: &str = "bus";
pub const ROLE_BUS_CLIENT: &str = "bus-client";
pub const ROLE_BUS_SERVER: &str = "bus-server";

/// Machines and endpoints available to one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testbed {
    pub client_machines: Vec<String>,
    pub server_machines: Vec<String>,
    pub controller_machines: Vec<String>,
    /// Bus endpoints clients connect to.
    pub client_endpoints: Vec<BusEndpoint>,
    /// Bus endpoints servers connect to.
    pub server_endpoints: Vec<BusEndpoint>,
    /// Every data-plane endpoint.
    pub bus_endpoints: Vec<BusEndpoint>,
    /// One per control-bus replica, i.e. per shard.
    pub control_endpoints: Vec<BusEndpoint>,
}

impl Testbed {
    /// Derive pools from provisioned roles. Client-side endpoints are the
    /// ones listening on `bus-client` machines when that role exists,
    /// otherwise on `bus` machines; likewise for servers.
    pub fn from_roles(
        roles: &MachineRoles,
        bus_endpoints: Vec<BusEndpoint>,
        control_endpoints: Vec<BusEndpoint>,
    ) -> Self {
        let machines = |role: &str| roles.get(role).cloned().unwrap_or_default();
        let reachable = |role: &str| -> Vec<BusEndpoint> {
            let hosts = roles
                .get(role)
                .or_else(|| roles.get(ROLE_BUS))
                .cloned()
                .unwrap_or_default();
            bus_endpoints
                .iter()
                .filter(|e| hosts.contains(&e.machine))
                .cloned()
                .collect()
        };
        Self {
            client_machines: machines(ROLE_CLIENT),
            server_machines: machines(ROLE_SERVER),
            controller_machines: machines(ROLE_CONTROL),
            client_endpoints: reachable(ROLE_BUS_CLIENT),
            server_endpoints: reachable(ROLE_BUS_SERVER),
            bus_endpoints: bus_endpoints.clone(),
            control_endpoints,
        }
    }

    /// Number of shards, one per control-bus replica.
    pub fn shards(&self) -> usize {
        self.control_endpoints.len()
    }
}

/// Agents of a run grouped by agent type, then by machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    agents: BTreeMap<String, BTreeMap<String, Vec<AgentDescriptor>>>,
}

impl RunPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, agent: AgentDescriptor) {
        self.agents
            .entry(agent.kind.as_str().to_string())
            .or_default()
            .entry(agent.machine.clone())
            .or_default()
            .push(agent);
    }

    /// Append every agent of `other`, keeping per-machine order.
    pub fn merge(&mut self, other: RunPlan) {
        for agent in other.into_agents() {
            self.insert(agent);
        }
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.values().flat_map(|m| m.values().flatten())
    }

    pub fn into_agents(self) -> impl Iterator<Item = AgentDescriptor> {
        self.agents
            .into_values()
            .flat_map(|m| m.into_values().flatten())
    }

    /// Agents of one type on one machine.
    pub fn on(&self, agent_type: &str, machine: &str) -> &[AgentDescriptor] {
        self.agents
            .get(agent_type)
            .and_then(|m| m.get(machine))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self, agent_type: &str) -> usize {
        self.agents
            .get(agent_type)
            .map(|m| m.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.agents().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plain nested JSON for the configuration applier, each agent
    /// carrying its launch command.
    pub fn to_vars(&self) -> serde_json::Result<Value> {
        let mut out = serde_json::Map::new();
        for (agent_type, machines) in &self.agents {
            let mut per_machine = serde_json::Map::new();
            for (machine, agents) in machines {
                let mut list = Vec::with_capacity(agents.len());
                for agent in agents {
                    let mut value = serde_json::to_value(agent)?;
                    if let Value::Object(map) = &mut value {
                        map.insert("command".to_string(), Value::String(agent.launch_command()));
                    }
                    list.push(value);
                }
                per_machine.insert(machine.clone(), Value::Array(list));
            }
            out.insert(agent_type.clone(), Value::Object(per_machine));
        }
        Ok(Value::Object(out))
    }
}

struct RoleSpec<'a> {
    kind: AgentKind,
    count: u32,
    offset: u32,
    machines: &'a [String],
    pool: &'a str,
    endpoints: &'a [BusEndpoint],
    /// Wire the agent to every endpoint rather than one.
    all_endpoints: bool,
}

/// Place every agent of one shard.
pub fn plan_shard(
    request: &ShardRequest,
    testbed: &Testbed,
    settings: &AgentSettings,
    iteration: &str,
) -> PlacementResult<Vec<AgentDescriptor>> {
    if request.topics.is_empty() {
        return Ok(Vec::new());
    }
    let control = testbed
        .control_endpoints
        .get(request.shard)
        .cloned()
        .ok_or(PlacementError::NoControlEndpoint(request.shard))?;
    let control_pool = [control];

    let specs = [
        RoleSpec {
            kind: settings.client(),
            count: request.clients,
            offset: request.client_offset,
            machines: &testbed.client_machines,
            pool: ROLE_CLIENT,
            endpoints: &testbed.client_endpoints,
            all_endpoints: false,
        },
        RoleSpec {
            kind: settings.server(),
            count: request.servers,
            offset: request.server_offset,
            machines: &testbed.server_machines,
            pool: ROLE_SERVER,
            endpoints: &testbed.server_endpoints,
            all_endpoints: false,
        },
        RoleSpec {
            kind: settings.controller(),
            count: 1,
            offset: request.shard as u32,
            machines: &testbed.controller_machines,
            pool: ROLE_CONTROL,
            endpoints: &testbed.bus_endpoints,
            all_endpoints: true,
        },
    ];

    let mut agents = Vec::new();
    for spec in &specs {
        if spec.count == 0 {
            continue;
        }
        let role = spec.kind.as_str();
        if spec.machines.is_empty() {
            return Err(PlacementError::EmptyMachinePool {
                role: role.to_string(),
                pool: spec.pool.to_string(),
                count: spec.count,
            });
        }
        if spec.endpoints.is_empty() {
            return Err(PlacementError::NoBusEndpoints {
                role: role.to_string(),
                count: spec.count,
            });
        }
        for local in 0..spec.count as usize {
            let index = local + spec.offset as usize;
            let topic = &request.topics[index % request.topics.len()];
            let machine = &spec.machines[index % spec.machines.len()];
            let bus_agents = if spec.all_endpoints {
                spec.endpoints.to_vec()
            } else {
                vec![spec.endpoints[index % spec.endpoints.len()].clone()]
            };
            let control_agents = vec![control_pool[local % control_pool.len()].clone()];
            let agent_id = format!("{role}-{local}-{topic}-{iteration}-{}", spec.offset);
            agents.push(AgentDescriptor::new(
                agent_id,
                spec.kind.clone(),
                request.shard,
                topic.clone(),
                machine.clone(),
                settings.timeout,
                bus_agents,
                control_agents,
            ));
        }
    }
    debug!(
        shard = request.shard,
        clients = request.clients,
        servers = request.servers,
        agents = agents.len(),
        "planned shard"
    );
    Ok(agents)
}

/// Place all shards of a run as one batch.
pub fn plan(
    requests: &[ShardRequest],
    testbed: &Testbed,
    settings: &AgentSettings,
    iteration: &str,
) -> PlacementResult<RunPlan> {
    let mut run = RunPlan::new();
    for request in requests {
        for agent in plan_shard(request, testbed, settings, iteration)? {
            run.insert(agent);
        }
    }
    info!(
        iteration,
        shards = requests.len(),
        agents = run.len(),
        "run plan ready"
    );
    Ok(run)
}
