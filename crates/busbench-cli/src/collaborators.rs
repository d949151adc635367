//! Collaborators bundled with the CLI.
//!
//! Machines come from the `[static]` table of the configuration. The
//! applier and the network emulator do not touch the testbed themselves:
//! they write each action's variables to `<env>/actions/NNNN-<action>.json`
//! for an external configuration tool to execute.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::bail;
use busbench_campaign::{ConfigurationApplier, ExecutionError, NetworkEmulator, Provisioner};
use busbench_core::{CampaignConfig, MachineRoles, StaticConfig};
use serde_json::{Value, json};
use tracing::debug;

pub const ACTIONS_DIR: &str = "actions";

/// Machines listed in the configuration file.
pub struct StaticProvider {
    conf: StaticConfig,
}

impl StaticProvider {
    pub fn from_config(config: &CampaignConfig) -> anyhow::Result<Self> {
        let Some(conf) = config.static_provider.clone() else {
            bail!("no [static] table in configuration");
        };
        Ok(Self { conf })
    }
}

impl Provisioner for StaticProvider {
    fn init(&mut self, _force_redeploy: bool) -> Result<(MachineRoles, Value), ExecutionError> {
        if self.conf.roles.values().all(Vec::is_empty) {
            return Err(ExecutionError::new("provision", "static provider lists no machines"));
        }
        Ok((self.conf.roles.clone(), self.conf.networks.clone()))
    }
}

/// Numbered JSON files under `<env>/actions`.
#[derive(Debug, Clone)]
pub struct ActionLog {
    dir: PathBuf,
}

impl ActionLog {
    pub fn new(env_dir: &Path) -> anyhow::Result<Self> {
        let dir = env_dir.join(ACTIONS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn record(&self, action: &str, vars: &Value) -> Result<PathBuf, ExecutionError> {
        let failed = |e: &dyn std::fmt::Display| ExecutionError::new(action, e.to_string());
        let seq = fs::read_dir(&self.dir).map_err(|e| failed(&e))?.count();
        let path = self.dir.join(format!("{seq:04}-{action}.json"));
        let content = serde_json::to_string_pretty(vars).map_err(|e| failed(&e))?;
        fs::write(&path, content).map_err(|e| failed(&e))?;
        debug!(action, path = %path.display(), "action recorded");
        Ok(path)
    }
}

pub struct FileApplier {
    log: ActionLog,
}

impl FileApplier {
    pub fn new(env_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            log: ActionLog::new(env_dir)?,
        })
    }
}

fn target(vars: &Value) -> &str {
    vars["target"].as_str().unwrap_or("all")
}

impl ConfigurationApplier for FileApplier {
    fn deploy(&mut self, vars: &Value) -> Result<(), ExecutionError> {
        self.log.record(&format!("deploy-{}", target(vars)), vars).map(drop)
    }

    fn backup(&mut self, vars: &Value) -> Result<(), ExecutionError> {
        self.log.record("backup", vars).map(drop)
    }

    fn destroy(&mut self, vars: &Value) -> Result<(), ExecutionError> {
        self.log.record("destroy", vars).map(drop)
    }
}

pub struct FileEmulator {
    log: ActionLog,
}

impl FileEmulator {
    pub fn new(env_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            log: ActionLog::new(env_dir)?,
        })
    }
}

impl NetworkEmulator for FileEmulator {
    fn apply(&mut self, constraints: &Value) -> Result<(), ExecutionError> {
        self.log.record("emulate", constraints).map(drop)
    }

    fn validate(&mut self, output_dir: &Path) -> Result<(), ExecutionError> {
        let vars = json!({ "output_dir": output_dir.display().to_string() });
        self.log.record("validate", &vars).map(drop)
    }

    fn reset(&mut self) -> Result<(), ExecutionError> {
        self.log.record("reset", &Value::Null).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_numbered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut applier = FileApplier::new(dir.path()).unwrap();
        let mut emulator = FileEmulator::new(dir.path()).unwrap();

        applier.deploy(&json!({"target": "bus"})).unwrap();
        emulator.reset().unwrap();
        applier.destroy(&json!({})).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path().join(ACTIONS_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["0000-deploy-bus.json", "0001-reset.json", "0002-destroy.json"]);

        let bus: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(ACTIONS_DIR).join("0000-deploy-bus.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(bus["target"], "bus");
    }

    #[test]
    fn static_provider_needs_machines() {
        let config = CampaignConfig::from_toml_str("[static.roles]\nbus = []\n").unwrap();
        let mut provider = StaticProvider::from_config(&config).unwrap();
        assert!(provider.init(false).is_err());

        assert!(StaticProvider::from_config(&CampaignConfig::default()).is_err());
    }
}
