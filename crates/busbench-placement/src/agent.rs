//! Benchmark agents and their launch commands.

use busbench_core::{BusEndpoint, ConfigResult, Defaults, ParameterSet, connection_url};
use serde::{Deserialize, Serialize};

/// Log path inside the agent container.
pub const CONTAINER_LOG: &str = "/home/ombt/ombt-data/agent.log";
/// Host directory the container log is mounted from.
pub const HOST_LOG_DIR: &str = "/tmp/ombt-data";

/// Role-specific part of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent_type", rename_all = "kebab-case")]
pub enum AgentKind {
    #[serde(rename = "rpc-client")]
    Client,
    #[serde(rename = "rpc-server")]
    Server { executor: String },
    Controller {
        call_type: String,
        nbr_calls: u32,
        pause: f64,
        length: u32,
    },
}

impl AgentKind {
    /// Name used in agent ids, run plans and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Client => "rpc-client",
            AgentKind::Server { .. } => "rpc-server",
            AgentKind::Controller { .. } => "controller",
        }
    }
}

/// Settings shared by every agent of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub timeout: u32,
    pub executor: String,
    pub call_type: String,
    pub nbr_calls: u32,
    pub pause: f64,
    pub length: u32,
}

impl AgentSettings {
    /// Read the settings from a combination already filled with defaults.
    pub fn from_params(params: &ParameterSet) -> ConfigResult<Self> {
        Ok(Self {
            timeout: params.require_u32("timeout")?,
            executor: params.require_str("executor")?.to_string(),
            call_type: params.require_str("call_type")?.to_string(),
            nbr_calls: params.require_u32("nbr_calls")?,
            pause: params.require_f64("pause")?,
            length: params.require_u32("length")?,
        })
    }

    pub fn from_defaults(defaults: &Defaults) -> Self {
        Self {
            timeout: defaults.timeout,
            executor: defaults.executor.clone(),
            call_type: defaults.call_type.clone(),
            nbr_calls: defaults.nbr_calls,
            pause: defaults.pause,
            length: defaults.length,
        }
    }

    pub fn client(&self) -> AgentKind {
        AgentKind::Client
    }

    pub fn server(&self) -> AgentKind {
        AgentKind::Server {
            executor: self.executor.clone(),
        }
    }

    pub fn controller(&self) -> AgentKind {
        AgentKind::Controller {
            call_type: self.call_type.clone(),
            nbr_calls: self.nbr_calls,
            pause: self.pause,
            length: self.length,
        }
    }
}

/// One agent instance, fully placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_id: String,
    #[serde(flatten)]
    pub kind: AgentKind,
    pub shard: usize,
    pub topic: String,
    pub machine: String,
    pub timeout: u32,
    /// Data-plane endpoints: one for clients and servers, all of them for
    /// a controller.
    pub bus_agents: Vec<BusEndpoint>,
    pub control_agents: Vec<BusEndpoint>,
    pub docker_log: String,
    pub log: String,
}

impl AgentDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_id: String,
        kind: AgentKind,
        shard: usize,
        topic: String,
        machine: String,
        timeout: u32,
        bus_agents: Vec<BusEndpoint>,
        control_agents: Vec<BusEndpoint>,
    ) -> Self {
        let log = format!("{HOST_LOG_DIR}/{agent_id}.log");
        Self {
            agent_id,
            kind,
            shard,
            topic,
            machine,
            timeout,
            bus_agents,
            control_agents,
            docker_log: CONTAINER_LOG.to_string(),
            log,
        }
    }

    /// Command line passed to the agent container.
    pub fn launch_command(&self) -> String {
        let mut command = vec![
            "--debug".to_string(),
            "--unique".to_string(),
            format!("--timeout {}", self.timeout),
            format!("--topic {}", self.topic),
        ];
        if let Some(control) = connection_url(&self.control_agents) {
            command.push(format!("--control {control}"));
        }
        if let Some(url) = connection_url(&self.bus_agents) {
            command.push(format!("--url {url}"));
        }
        command.push(self.kind.as_str().to_string());
        match &self.kind {
            AgentKind::Client => {}
            AgentKind::Server { executor } => command.push(format!("--executor {executor}")),
            AgentKind::Controller {
                call_type,
                nbr_calls,
                pause,
                length,
            } => {
                command.push(format!("--output {}", self.docker_log));
                command.push(call_type.clone());
                command.push(format!("--calls {nbr_calls}"));
                command.push(format!("--pause {pause:?}"));
                command.push(format!("--length {length}"));
            }
        }
        command.join(" ")
    }
}
