//! Seams to the systems that actually touch the testbed.
//!
//! The campaign engine never opens a connection or a remote shell. It
//! computes plain JSON variables and hands them to these collaborators.

use std::path::Path;

use busbench_core::MachineRoles;
use serde_json::Value;

use crate::error::ExecutionError;

/// Acquires machines from a testbed.
pub trait Provisioner {
    /// Return role → machines and the provider's network description.
    fn init(&mut self, force_redeploy: bool) -> Result<(MachineRoles, Value), ExecutionError>;
}

/// Runs configuration-management actions on provisioned machines.
pub trait ConfigurationApplier {
    fn deploy(&mut self, vars: &Value) -> Result<(), ExecutionError>;
    fn backup(&mut self, vars: &Value) -> Result<(), ExecutionError>;
    fn destroy(&mut self, vars: &Value) -> Result<(), ExecutionError>;
}

/// Applies link constraints between machines.
pub trait NetworkEmulator {
    fn apply(&mut self, constraints: &Value) -> Result<(), ExecutionError>;
    /// Measure the effective constraints and store the report in `output_dir`.
    fn validate(&mut self, output_dir: &Path) -> Result<(), ExecutionError>;
    fn reset(&mut self) -> Result<(), ExecutionError>;
}

/// The three collaborators a campaign needs.
pub struct Collaborators<'a> {
    pub provisioner: &'a mut dyn Provisioner,
    pub applier: &'a mut dyn ConfigurationApplier,
    pub emulator: &'a mut dyn NetworkEmulator,
}
