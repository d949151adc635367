//! Broker agent layouts for a whole bus deployment.

use busbench_core::{BrokerKind, BusEndpoint, DriverConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{TopologyError, TopologyResult};
use crate::router::{RouterConf, RouterTopology};

pub const RABBITMQ_BASE_PORT: u16 = 5672;
pub const RABBITMQ_MANAGEMENT_BASE_PORT: u16 = 15672;

/// Another member of a rabbitmq cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPeer {
    pub agent_id: String,
    pub machine: String,
}

/// One rabbitmq instance. Several may share a machine on distinct ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RabbitMqConf {
    pub agent_id: String,
    pub port: u16,
    pub management_port: u16,
    pub machine: String,
    /// Empty in standalone mode.
    #[serde(default)]
    pub cluster_nodes: Vec<ClusterPeer>,
}

/// Configuration of one bus agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "broker", rename_all = "snake_case")]
pub enum BusConf {
    Rabbitmq(RabbitMqConf),
    Qdr(RouterConf),
}

impl BusConf {
    pub fn agent_id(&self) -> &str {
        match self {
            BusConf::Rabbitmq(conf) => &conf.agent_id,
            BusConf::Qdr(conf) => &conf.router_id,
        }
    }

    pub fn machine(&self) -> &str {
        match self {
            BusConf::Rabbitmq(conf) => &conf.machine,
            BusConf::Qdr(conf) => &conf.machine,
        }
    }

    /// Client-facing endpoint; a router without a normal listener has none.
    pub fn endpoint(&self) -> Option<BusEndpoint> {
        match self {
            BusConf::Rabbitmq(conf) => Some(BusEndpoint {
                agent_id: conf.agent_id.clone(),
                machine: conf.machine.clone(),
                port: conf.port,
                transport: BrokerKind::Rabbitmq.transport(),
            }),
            BusConf::Qdr(conf) => conf.normal_listener().map(|listener| BusEndpoint {
                agent_id: conf.router_id.clone(),
                machine: listener.host.clone(),
                port: listener.port,
                transport: BrokerKind::Qdr.transport(),
            }),
        }
    }
}

/// Lay out every agent of the bus described by `driver` on `machines`.
///
/// `context` distinguishes several buses (e.g. `bus`, `control-bus`) in
/// rabbitmq agent ids.
pub fn generate_bus_conf(
    driver: &DriverConfig,
    machines: &[String],
    context: &str,
) -> TopologyResult<Vec<BusConf>> {
    if machines.is_empty() {
        return Err(TopologyError::NoMachines(context.to_string()));
    }
    let confs = match driver.broker_kind()? {
        BrokerKind::Rabbitmq => rabbitmq_layout(driver, machines, context)?,
        BrokerKind::Qdr => {
            let topology = driver.topology.as_deref().ok_or_else(|| {
                TopologyError::UnknownKind(format!("missing topology for {context}"))
            })?;
            RouterTopology::generate(topology, &driver.args, machines)?
                .routers
                .into_iter()
                .map(BusConf::Qdr)
                .collect()
        }
    };
    info!(
        context,
        broker = %driver.kind,
        agents = confs.len(),
        "generated bus configuration"
    );
    Ok(confs)
}

fn rabbitmq_layout(
    driver: &DriverConfig,
    machines: &[String],
    context: &str,
) -> TopologyResult<Vec<BusConf>> {
    let number = driver
        .number
        .map(|n| n as usize)
        .unwrap_or(machines.len());
    let mut brokers = Vec::with_capacity(number);
    for index in 0..number {
        let offset =
            u16::try_from(index).map_err(|_| TopologyError::PortRange(context.to_string()))?;
        let port = RABBITMQ_BASE_PORT
            .checked_add(offset)
            .ok_or_else(|| TopologyError::PortRange(context.to_string()))?;
        let management_port = RABBITMQ_MANAGEMENT_BASE_PORT
            .checked_add(offset)
            .ok_or_else(|| TopologyError::PortRange(context.to_string()))?;
        brokers.push(RabbitMqConf {
            agent_id: format!("rabbitmq-{context}-{index}"),
            port,
            management_port,
            machine: machines[index % machines.len()].clone(),
            cluster_nodes: Vec::new(),
        });
    }
    if driver.is_cluster() {
        let peers: Vec<ClusterPeer> = brokers
            .iter()
            .map(|b| ClusterPeer {
                agent_id: b.agent_id.clone(),
                machine: b.machine.clone(),
            })
            .collect();
        debug!(context, peers = peers.len(), "rabbitmq cluster mode");
        for broker in &mut brokers {
            broker.cluster_nodes = peers.clone();
        }
    }
    Ok(brokers.into_iter().map(BusConf::Rabbitmq).collect())
}
