//! Single-shot operations on a deployment.
//!
//! Each action computes plain JSON variables from the configuration and
//! the deployment context, hands them to a collaborator and records what
//! changed in the context. The campaign loops chain these; the CLI exposes
//! them one by one.

use std::path::Path;

use busbench_core::{CampaignConfig, DriverConfig, ParameterSet};
use busbench_placement::planner::ROLE_BUS;
use busbench_placement::{AgentSettings, RunPlan, plan};
use busbench_topology::generate_bus_conf;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::collaborator::{ConfigurationApplier, NetworkEmulator, Provisioner};
use crate::context::DeploymentContext;
use crate::error::CampaignResult;
use crate::testcase::{StepLoad, TestCase};

/// Role of the machines hosting the control bus.
pub const ROLE_CONTROL_BUS: &str = "control-bus";

/// Acquire machines and remember them in the context.
pub fn deploy(
    context: &mut DeploymentContext,
    provisioner: &mut dyn Provisioner,
    force: bool,
) -> CampaignResult<()> {
    let (roles, networks) = provisioner.init(force)?;
    info!(
        roles = roles.len(),
        machines = roles.values().map(Vec::len).sum::<usize>(),
        force,
        "testbed provisioned"
    );
    context.roles = roles;
    context.networks = networks;
    context.save()
}

/// Lay out and deploy the bus under test for `driver` together with the
/// control bus.
pub fn prepare(
    config: &CampaignConfig,
    context: &mut DeploymentContext,
    applier: &mut dyn ConfigurationApplier,
    driver: &str,
) -> CampaignResult<()> {
    let driver_conf = config.driver(driver);
    let broker = driver_conf.broker_kind()?;
    let bus_conf = generate_bus_conf(&driver_conf, context.machines(ROLE_BUS), ROLE_BUS)?;
    let control_bus_conf = generate_bus_conf(
        &DriverConfig::control_bus(),
        context.machines(ROLE_CONTROL_BUS),
        ROLE_CONTROL_BUS,
    )?;

    let vars = json!({
        "target": "bus",
        "registry": config.registry,
        "broker": broker.as_str(),
        "driver": driver,
        "driver_conf": driver_conf,
        "bus_conf": bus_conf,
        "control_bus_conf": control_bus_conf,
    });
    applier.deploy(&vars)?;

    context.broker = Some(broker);
    context.driver = Some(driver.to_string());
    context.bus_conf = bus_conf;
    context.control_bus_conf = control_bus_conf;
    context.save()?;
    info!(driver, broker = broker.as_str(), shards = context.control_bus_conf.len(), "bus prepared");
    Ok(())
}

/// Plan the agents of `step` over the prepared bus.
pub fn plan_step(
    context: &DeploymentContext,
    test: TestCase,
    params: &ParameterSet,
    step: &StepLoad,
    iteration: &str,
) -> CampaignResult<RunPlan> {
    let testbed = context.testbed()?;
    let requests = test.shard_requests(step, testbed.shards())?;
    let settings = AgentSettings::from_params(params)?;
    Ok(plan(&requests, &testbed, &settings, iteration)?)
}

/// Deploy the agents of a run plan in one batch.
pub fn deploy_agents(
    context: &DeploymentContext,
    applier: &mut dyn ConfigurationApplier,
    params: &ParameterSet,
    run: &RunPlan,
    backup_dir: &Path,
) -> CampaignResult<()> {
    let vars = json!({
        "target": "agents",
        "backup_dir": backup_dir.display().to_string(),
        "ombt_version": params.require_str("version")?,
        "broker": context.broker.map(|b| b.as_str()),
        "ombt_confs": run.to_vars()?,
    });
    applier.deploy(&vars)?;
    info!(agents = run.len(), backup_dir = %backup_dir.display(), "agents deployed");
    Ok(())
}

/// Plan and deploy a whole (non-incremental) run of `test`. `params` must
/// already carry every default.
pub fn run_test_case(
    context: &DeploymentContext,
    applier: &mut dyn ConfigurationApplier,
    test: TestCase,
    params: &ParameterSet,
    iteration: &str,
    backup_dir: &Path,
) -> CampaignResult<RunPlan> {
    let params = test.normalize(params);
    let step = test.full_load(&params)?;
    let run = plan_step(context, test, &params, &step, iteration)?;
    deploy_agents(context, applier, &params, &run, backup_dir)?;
    Ok(run)
}

/// Collect logs and results of the current deployment into `backup_dir`.
pub fn backup(
    context: &DeploymentContext,
    applier: &mut dyn ConfigurationApplier,
    backup_dir: &Path,
) -> CampaignResult<()> {
    let vars = json!({
        "target": "all",
        "backup_dir": backup_dir.display().to_string(),
        "broker": context.broker.map(|b| b.as_str()),
        "bus_conf": context.bus_conf,
        "control_bus_conf": context.control_bus_conf,
    });
    applier.backup(&vars)?;
    debug!(backup_dir = %backup_dir.display(), "backup collected");
    Ok(())
}

/// Tear down the bus and every agent. Machines stay provisioned.
pub fn destroy(
    context: &mut DeploymentContext,
    applier: &mut dyn ConfigurationApplier,
) -> CampaignResult<()> {
    let vars = json!({
        "target": "all",
        "broker": context.broker.map(|b| b.as_str()),
        "bus_conf": context.bus_conf,
        "control_bus_conf": context.control_bus_conf,
    });
    applier.destroy(&vars)?;
    context.clear_bus();
    context.save()?;
    debug!("deployment destroyed");
    Ok(())
}

/// Apply the traffic constraints of a combination when it carries a
/// `delay` dimension. Returns whether anything was applied.
pub fn emulate(
    config: &CampaignConfig,
    emulator: &mut dyn NetworkEmulator,
    params: &ParameterSet,
) -> CampaignResult<bool> {
    let Some(delay) = params.get("delay") else {
        return Ok(false);
    };
    let traffic = params.require_str("traffic")?;
    let delay = delay.to_string();
    let constraints: Value = config.traffic(traffic, Some(&delay))?;
    emulator.apply(&constraints)?;
    info!(traffic, delay = %delay, "network constraints applied");
    Ok(true)
}

pub fn validate(emulator: &mut dyn NetworkEmulator, output_dir: &Path) -> CampaignResult<()> {
    emulator.validate(output_dir)?;
    Ok(())
}

pub fn reset(emulator: &mut dyn NetworkEmulator) -> CampaignResult<()> {
    emulator.reset()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use busbench_core::{Defaults, MachineRoles};

    use super::*;
    use crate::error::{CampaignError, ExecutionError};

    #[derive(Default)]
    struct Recorder {
        deployed: Vec<Value>,
        destroyed: usize,
        fail: bool,
    }

    impl ConfigurationApplier for Recorder {
        fn deploy(&mut self, vars: &Value) -> Result<(), ExecutionError> {
            if self.fail {
                return Err(ExecutionError::new("deploy", "unreachable host"));
            }
            self.deployed.push(vars.clone());
            Ok(())
        }

        fn backup(&mut self, _vars: &Value) -> Result<(), ExecutionError> {
            Ok(())
        }

        fn destroy(&mut self, _vars: &Value) -> Result<(), ExecutionError> {
            self.destroyed += 1;
            Ok(())
        }
    }

    struct StaticMachines;

    impl Provisioner for StaticMachines {
        fn init(&mut self, _force: bool) -> Result<(MachineRoles, Value), ExecutionError> {
            let mut roles = MachineRoles::new();
            for (role, host) in [
                ("bus", "m-bus"),
                ("control-bus", "m-ctl"),
                ("ombt-client", "m-cli"),
                ("ombt-server", "m-srv"),
                ("ombt-control", "m-ctl"),
            ] {
                roles.insert(role.to_string(), vec![host.to_string()]);
            }
            Ok((roles, json!({})))
        }
    }

    #[test]
    fn prepare_then_run_deploys_bus_and_agents() {
        let dir = tempfile::tempdir().unwrap();
        let config = CampaignConfig::default();
        let mut context = DeploymentContext::new(dir.path());
        let mut applier = Recorder::default();

        deploy(&mut context, &mut StaticMachines, false).unwrap();
        prepare(&config, &mut context, &mut applier, "broker").unwrap();
        assert!(context.is_prepared());
        assert_eq!(applier.deployed[0]["target"], "bus");
        assert_eq!(applier.deployed[0]["broker"], "rabbitmq");

        let params = Defaults::default().fill(&ParameterSet::new().with("nbr_clients", 2));
        let backup_dir = context.backup_path("x").unwrap();
        let run = run_test_case(&context, &mut applier, TestCase::PerAgent, &params, "run-0", &backup_dir)
            .unwrap();
        assert_eq!(run.count("rpc-client"), 2);
        assert_eq!(run.count("rpc-server"), 1);
        assert_eq!(run.count("controller"), 1);
        assert_eq!(applier.deployed[1]["target"], "agents");

        let reloaded = DeploymentContext::load(dir.path()).unwrap();
        assert_eq!(reloaded.driver.as_deref(), Some("broker"));
    }

    #[test]
    fn destroy_forgets_the_bus() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = DeploymentContext::new(dir.path());
        let mut applier = Recorder::default();
        deploy(&mut context, &mut StaticMachines, false).unwrap();
        prepare(&CampaignConfig::default(), &mut context, &mut applier, "broker").unwrap();
        destroy(&mut context, &mut applier).unwrap();
        assert_eq!(applier.destroyed, 1);
        assert!(!context.is_prepared());
        assert!(!context.roles.is_empty());
    }

    #[test]
    fn applier_failures_are_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = DeploymentContext::new(dir.path());
        deploy(&mut context, &mut StaticMachines, false).unwrap();
        let mut applier = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let err = prepare(&CampaignConfig::default(), &mut context, &mut applier, "broker").unwrap_err();
        assert!(matches!(err, CampaignError::Execution(_)));
        assert!(err.is_recoverable());
        assert!(!context.is_prepared());
    }

    #[test]
    fn missing_bus_machines_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = DeploymentContext::new(dir.path());
        let err = prepare(&CampaignConfig::default(), &mut context, &mut Recorder::default(), "broker")
            .unwrap_err();
        assert!(matches!(err, CampaignError::Topology(_)));
        assert!(!err.is_recoverable());
    }
}
