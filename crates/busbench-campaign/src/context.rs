//! Deployment context shared between invocations.
//!
//! Everything learned about one deployed environment (machines, bus
//! layout) lives in a single typed record persisted as
//! `<env_dir>/env.json`, so `deploy`, `prepare`, `test-case`, `backup` and
//! `destroy` can run as separate processes.

use std::fs;
use std::path::{Path, PathBuf};

use busbench_core::{BrokerKind, BusEndpoint, MachineRoles};
use busbench_placement::Testbed;
use busbench_topology::BusConf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{CampaignError, CampaignResult};

pub const ENV_FILE: &str = "env.json";
/// Directory, under the environment directory, holding backups.
pub const BACKUP_ROOT: &str = "current";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentContext {
    #[serde(skip)]
    env_dir: PathBuf,
    pub roles: MachineRoles,
    #[serde(default)]
    pub networks: Value,
    /// Broker of the bus under test, set by `prepare`.
    #[serde(default)]
    pub broker: Option<BrokerKind>,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub bus_conf: Vec<BusConf>,
    #[serde(default)]
    pub control_bus_conf: Vec<BusConf>,
}

impl DeploymentContext {
    pub fn new(env_dir: impl Into<PathBuf>) -> Self {
        Self {
            env_dir: env_dir.into(),
            ..Self::default()
        }
    }

    /// Load `<env_dir>/env.json`.
    pub fn load(env_dir: &Path) -> CampaignResult<Self> {
        let path = env_dir.join(ENV_FILE);
        let content = fs::read_to_string(&path).map_err(|e| CampaignError::io(&path, e))?;
        let mut context: Self = serde_json::from_str(&content)?;
        context.env_dir = env_dir.to_path_buf();
        Ok(context)
    }

    /// Load the context if one was saved, otherwise start an empty one.
    pub fn load_or_new(env_dir: &Path) -> CampaignResult<Self> {
        if env_dir.join(ENV_FILE).exists() {
            Self::load(env_dir)
        } else {
            Ok(Self::new(env_dir))
        }
    }

    pub fn save(&self) -> CampaignResult<()> {
        fs::create_dir_all(&self.env_dir).map_err(|e| CampaignError::io(&self.env_dir, e))?;
        let path = self.env_dir.join(ENV_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).map_err(|e| CampaignError::io(&path, e))?;
        debug!(path = %path.display(), "deployment context saved");
        Ok(())
    }

    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    /// Machines of `role`, empty when the role was not provisioned.
    pub fn machines(&self, role: &str) -> &[String] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_prepared(&self) -> bool {
        self.broker.is_some() && !self.control_bus_conf.is_empty()
    }

    pub fn bus_endpoints(&self) -> Vec<BusEndpoint> {
        self.bus_conf.iter().filter_map(BusConf::endpoint).collect()
    }

    pub fn control_endpoints(&self) -> Vec<BusEndpoint> {
        self.control_bus_conf
            .iter()
            .filter_map(BusConf::endpoint)
            .collect()
    }

    /// Machine and endpoint pools for agent placement.
    pub fn testbed(&self) -> CampaignResult<Testbed> {
        if !self.is_prepared() {
            return Err(CampaignError::NotPrepared(
                self.env_dir.display().to_string(),
            ));
        }
        Ok(Testbed::from_roles(
            &self.roles,
            self.bus_endpoints(),
            self.control_endpoints(),
        ))
    }

    /// Create and return the backup directory `name`.
    pub fn backup_path(&self, name: &str) -> CampaignResult<PathBuf> {
        let path = self.env_dir.join(BACKUP_ROOT).join(name);
        fs::create_dir_all(&path).map_err(|e| CampaignError::io(&path, e))?;
        Ok(path)
    }

    /// Forget the bus layout; machines stay provisioned.
    pub fn clear_bus(&mut self) {
        self.broker = None;
        self.driver = None;
        self.bus_conf.clear();
        self.control_bus_conf.clear();
    }
}
