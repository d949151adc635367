//! Default campaign parameters.

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;

/// Immutable defaults applied when a dimension is absent.
///
/// Loaded once from the `[defaults]` table of `busbench.toml` (every field
/// optional) and handed to whatever builds parameter sets; the sweep and
/// placement code never reach for process-wide constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Driver name looked up under `[drivers]`.
    pub driver: String,
    pub nbr_clients: u32,
    pub nbr_servers: u32,
    pub nbr_topics: u32,
    pub call_type: String,
    pub nbr_calls: u32,
    /// Pause between calls, in seconds.
    pub pause: f64,
    /// Agent timeout, in seconds.
    pub timeout: u32,
    /// Container image of the benchmark agents.
    pub version: String,
    pub backup_dir: String,
    /// Message length in bytes.
    pub length: u32,
    pub executor: String,
    /// Sleep between incremental steps, in seconds.
    pub iteration_pause: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            driver: "broker".to_string(),
            nbr_clients: 1,
            nbr_servers: 1,
            nbr_topics: 1,
            call_type: "rpc-call".to_string(),
            nbr_calls: 100,
            pause: 0.0,
            timeout: 60,
            version: "msimonin/ombt:singleton".to_string(),
            backup_dir: "backup".to_string(),
            length: 1024,
            executor: "threading".to_string(),
            iteration_pause: 1.0,
        }
    }
}

impl Defaults {
    /// Fill every dimension missing from `params` with its default.
    pub fn fill(&self, params: &ParameterSet) -> ParameterSet {
        let mut filled = ParameterSet::new()
            .with("driver", self.driver.as_str())
            .with("nbr_clients", self.nbr_clients)
            .with("nbr_servers", self.nbr_servers)
            .with("nbr_topics", self.nbr_topics)
            .with("call_type", self.call_type.as_str())
            .with("nbr_calls", self.nbr_calls)
            .with("pause", self.pause)
            .with("timeout", self.timeout)
            .with("version", self.version.as_str())
            .with("length", self.length)
            .with("executor", self.executor.as_str());
        filled.merge(params);
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamValue;

    #[test]
    fn fill_keeps_explicit_values() {
        let params = ParameterSet::new().with("nbr_clients", 42);
        let filled = Defaults::default().fill(&params);
        assert_eq!(filled.get("nbr_clients"), Some(&ParamValue::Int(42)));
        assert_eq!(filled.get("timeout"), Some(&ParamValue::Int(60)));
        assert_eq!(filled.get("executor"), Some(&ParamValue::from("threading")));
    }

    #[test]
    fn partial_table_overrides_single_fields() {
        let defaults: Defaults = toml::from_str("timeout = 3600\n").unwrap();
        assert_eq!(defaults.timeout, 3600);
        assert_eq!(defaults.nbr_calls, 100);
    }
}
