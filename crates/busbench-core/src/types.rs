//! Shared types used across busbench crates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Role name → machine aliases, as returned by the provisioner.
pub type MachineRoles = BTreeMap<String, Vec<String>>;

/// Broker implementation deployed for a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    Rabbitmq,
    Qdr,
}

impl BrokerKind {
    pub fn transport(&self) -> Transport {
        match self {
            BrokerKind::Rabbitmq => Transport::Rabbit,
            BrokerKind::Qdr => Transport::Amqp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerKind::Rabbitmq => "rabbitmq",
            BrokerKind::Qdr => "qdr",
        }
    }
}

impl FromStr for BrokerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rabbitmq" => Ok(BrokerKind::Rabbitmq),
            "qdr" => Ok(BrokerKind::Qdr),
            other => Err(ConfigError::UnknownBroker(other.to_string())),
        }
    }
}

impl fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL scheme agents use to reach a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Rabbit,
    Amqp,
}

impl Transport {
    pub fn scheme(&self) -> &'static str {
        match self {
            Transport::Rabbit => "rabbit",
            Transport::Amqp => "amqp",
        }
    }
}

/// Client-facing endpoint of one bus agent (broker or router).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEndpoint {
    pub agent_id: String,
    pub machine: String,
    pub port: u16,
    pub transport: Transport,
}

impl BusEndpoint {
    /// `machine:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.machine, self.port)
    }
}

/// Build a connection URL over several endpoints sharing a transport.
///
/// Returns `None` for an empty slice.
pub fn connection_url(endpoints: &[BusEndpoint]) -> Option<String> {
    let first = endpoints.first()?;
    let hosts: Vec<String> = endpoints.iter().map(BusEndpoint::address).collect();
    Some(format!("{}://{}", first.transport.scheme(), hosts.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(machine: &str, port: u16) -> BusEndpoint {
        BusEndpoint {
            agent_id: format!("{machine}-{port}"),
            machine: machine.to_string(),
            port,
            transport: Transport::Amqp,
        }
    }

    #[test]
    fn broker_kind_parses_known_names() {
        assert_eq!("qdr".parse::<BrokerKind>().unwrap(), BrokerKind::Qdr);
        assert_eq!(
            "rabbitmq".parse::<BrokerKind>().unwrap().transport(),
            Transport::Rabbit
        );
        assert!(matches!(
            "zeromq".parse::<BrokerKind>(),
            Err(ConfigError::UnknownBroker(name)) if name == "zeromq"
        ));
    }

    #[test]
    fn connection_url_joins_hosts() {
        let url = connection_url(&[endpoint("m1", 5000), endpoint("m2", 5001)]).unwrap();
        assert_eq!(url, "amqp://m1:5000,m2:5001");
        assert!(connection_url(&[]).is_none());
    }
}
