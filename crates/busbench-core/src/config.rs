//! busbench.toml configuration parser.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defaults::Defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::params::ParameterSpace;
use crate::types::{BrokerKind, MachineRoles};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Parameter space per test case name.
    #[serde(default)]
    pub campaign: BTreeMap<String, ParameterSpace>,
    #[serde(default)]
    pub drivers: BTreeMap<String, DriverConfig>,
    /// Named network constraint sets, opaque to busbench.
    #[serde(default)]
    pub traffic: BTreeMap<String, Value>,
    /// Image registry settings forwarded to the applier.
    #[serde(default)]
    pub registry: Value,
    #[serde(default, rename = "static")]
    pub static_provider: Option<StaticConfig>,
    #[serde(default)]
    pub defaults: Defaults,
}

/// Broker deployment settings for one driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// `rabbitmq` or `qdr`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "DriverConfig::default_mode")]
    pub mode: String,
    /// Number of broker instances (rabbitmq); defaults to one per machine.
    #[serde(default)]
    pub number: Option<u32>,
    /// Router graph generator name (qdr).
    #[serde(default)]
    pub topology: Option<String>,
    /// Sizing arguments for the graph generator.
    #[serde(default)]
    pub args: Vec<u32>,
}

impl DriverConfig {
    fn default_mode() -> String {
        "standalone".to_string()
    }

    /// The fixed control-bus deployment: one standalone rabbitmq per machine.
    pub fn control_bus() -> Self {
        Self {
            kind: "rabbitmq".to_string(),
            mode: Self::default_mode(),
            number: None,
            topology: None,
            args: Vec::new(),
        }
    }

    pub fn broker_kind(&self) -> ConfigResult<BrokerKind> {
        self.kind.parse()
    }

    pub fn is_cluster(&self) -> bool {
        self.mode == "cluster"
    }
}

/// Machines for the built-in static provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    pub roles: MachineRoles,
    #[serde(default)]
    pub networks: Value,
}

impl CampaignConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parameter space declared for a test case.
    pub fn space(&self, test: &str) -> ConfigResult<&ParameterSpace> {
        self.campaign.get(test).ok_or_else(|| {
            ConfigError::MalformedSpace(format!("no [campaign.{test}] table in configuration"))
        })
    }

    /// Driver settings, falling back to the control-bus layout when the
    /// driver is not declared.
    pub fn driver(&self, name: &str) -> DriverConfig {
        self.drivers
            .get(name)
            .cloned()
            .unwrap_or_else(DriverConfig::control_bus)
    }

    /// Constraint set named `name`, with `default_delay` replaced when given.
    pub fn traffic(&self, name: &str, delay_override: Option<&str>) -> ConfigResult<Value> {
        let mut constraints = self.traffic.get(name).cloned().ok_or_else(|| {
            ConfigError::InvalidValue {
                dimension: "traffic".to_string(),
                reason: format!("no [traffic.{name}] table in configuration"),
            }
        })?;
        if let (Some(delay), Value::Object(map)) = (delay_override, &mut constraints) {
            map.insert("default_delay".to_string(), Value::String(delay.to_string()));
        }
        Ok(constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamValue;

    const SAMPLE: &str = r#"
registry = { type = "internal" }

[defaults]
timeout = 120

[campaign.test_case_1]
nbr_clients = [1, 10, 20]
nbr_servers = [1, 2]
driver = ["broker", "router"]
call_type = ["rpc-call"]
nbr_calls = 1000
pause = 0.0

[drivers.broker]
type = "rabbitmq"
mode = "cluster"
number = 3

[drivers.router]
type = "qdr"
topology = "complete_graph"
args = [4]

[traffic.slow]
enable = true
default_delay = "20ms"
default_rate = "1gbit"

[static.roles]
bus = ["m1", "m2"]
control-bus = ["m3"]
"#;

    #[test]
    fn parses_full_sample() {
        let config = CampaignConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.defaults.timeout, 120);
        let space = config.space("test_case_1").unwrap();
        assert_eq!(space.dimension("nbr_clients").map(<[_]>::len), Some(3));
        assert_eq!(
            space.dimension("nbr_calls"),
            Some(&[ParamValue::Int(1000)][..])
        );

        let broker = config.driver("broker");
        assert_eq!(broker.broker_kind().unwrap(), BrokerKind::Rabbitmq);
        assert!(broker.is_cluster());
        assert_eq!(broker.number, Some(3));

        let router = config.driver("router");
        assert_eq!(router.broker_kind().unwrap(), BrokerKind::Qdr);
        assert_eq!(router.args, vec![4]);

        let roles = &config.static_provider.as_ref().unwrap().roles;
        assert_eq!(roles["control-bus"], vec!["m3".to_string()]);
    }

    #[test]
    fn unknown_driver_falls_back_to_control_bus() {
        let config = CampaignConfig::default();
        assert_eq!(config.driver("nope"), DriverConfig::control_bus());
    }

    #[test]
    fn traffic_delay_override() {
        let config = CampaignConfig::from_toml_str(SAMPLE).unwrap();
        let constraints = config.traffic("slow", Some("50ms")).unwrap();
        assert_eq!(constraints["default_delay"], "50ms");
        assert_eq!(constraints["default_rate"], "1gbit");
        assert!(config.traffic("missing", None).is_err());
    }

    #[test]
    fn missing_campaign_table_is_a_config_error() {
        let config = CampaignConfig::default();
        assert!(matches!(
            config.space("test_case_9"),
            Err(ConfigError::MalformedSpace(_))
        ));
    }

    #[test]
    fn parse_errors_are_reported() {
        assert!(matches!(
            CampaignConfig::from_toml_str("[campaign\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
