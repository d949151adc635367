//! Campaign loops.
//!
//! A campaign walks the sweep one combination at a time: prepare the bus,
//! deploy the agents, collect a backup, mark the combination done. An
//! [`ExecutionError`](crate::ExecutionError) skips the combination; any
//! other error stops the campaign. Network reset and teardown run after
//! every attempt either way, and every attempt lands in the run log, the
//! one that stopped the campaign included.
//!
//! Before the testbed is touched, every combination is checked against the
//! configuration so that a campaign bound to fail on a configuration error
//! fails up front.
//!
//! The incremental loop does the same per group of zipped steps, keeping
//! the bus up for the whole group and deploying only each step's delta.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use busbench_core::{BrokerKind, CampaignConfig, ConfigError, ParameterSet, ParameterSpace};
use busbench_placement::AgentSettings;
use busbench_state::{RunLogEntry, RunOutcome, SweepCounts, epoch_secs};
use busbench_topology::TopologyError;
use tracing::{debug, error, info, warn};

use crate::actions;
use crate::collaborator::Collaborators;
use crate::context::DeploymentContext;
use crate::error::{CampaignError, CampaignResult};
use crate::incremental::{GroupLabels, expand_group, iteration_id, pack_space, step_delta};
use crate::policy::SweepPolicy;
use crate::sweeper::{CampaignSweeper, SweepProgress};
use crate::testcase::TestCase;

#[derive(Debug, Clone)]
pub struct CampaignOptions {
    pub test: TestCase,
    /// Run every combination, ignoring the test case's filter.
    pub unfiltered: bool,
    /// Ask the provisioner for fresh machines.
    pub force: bool,
    /// Defaults to `<test>` (`<test>-incremental` in incremental mode).
    pub env_dir: Option<PathBuf>,
    /// Sleep between incremental steps; the configured default when unset.
    pub iteration_pause: Option<f64>,
}

impl CampaignOptions {
    pub fn new(test: TestCase) -> Self {
        Self {
            test,
            unfiltered: false,
            force: false,
            env_dir: None,
            iteration_pause: None,
        }
    }

    pub fn env_dir(&self, incremental: bool) -> PathBuf {
        match &self.env_dir {
            Some(dir) => dir.clone(),
            None if incremental => PathBuf::from(format!("{}-incremental", self.test)),
            None => PathBuf::from(self.test.name()),
        }
    }
}

/// What one invocation of a campaign loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSummary {
    pub test: TestCase,
    pub env_dir: PathBuf,
    /// Combinations (or groups) attempted by this invocation.
    pub attempted: usize,
    pub done: usize,
    pub skipped: usize,
    /// Totals in the store, including earlier invocations.
    pub counts: SweepCounts,
    pub progress: SweepProgress,
}

struct Attempt<'a> {
    test: TestCase,
    params: &'a ParameterSet,
    experiment_id: String,
    backup_dir: &'a Path,
    iteration: String,
}

impl Attempt<'_> {
    fn log_entry(&self, result: &CampaignResult<()>) -> RunLogEntry {
        let (outcome, err) = match result {
            Ok(()) => (RunOutcome::Done, None),
            Err(e) if e.is_recoverable() => (RunOutcome::Skipped, Some(e)),
            Err(e) => (RunOutcome::Aborted, Some(e)),
        };
        RunLogEntry {
            seq: 0,
            test: self.test.name().to_string(),
            params: self.params.clone(),
            experiment_id: self.experiment_id.clone(),
            backup_dir: self.backup_dir.display().to_string(),
            iteration_id: Some(self.iteration.clone()),
            outcome,
            error: err.map(ToString::to_string),
            timestamp: epoch_secs(),
        }
    }
}

// ── Pre-flight ──────────────────────────────────────────────────

/// Dimensions that only ever grow along an incremental group.
const GROWING_DIMS: [&str; 3] = ["nbr_clients", "nbr_servers", "nbr_topics"];

/// Check every combination of `space` (every group in incremental mode)
/// against the configuration: drivers and their router topologies,
/// traffic sets, agent settings and loads.
fn preflight(
    config: &CampaignConfig,
    test: TestCase,
    space: &ParameterSpace,
    incremental: bool,
) -> CampaignResult<()> {
    let mut checked = Checked::default();
    let combinations = space.cross_product()?;
    for combination in &combinations {
        if incremental {
            let (_, steps) = group_steps(config, test, combination)?;
            if steps.is_empty() {
                return Err(ConfigError::MalformedSpace(format!(
                    "{test} declares none of its growth dimensions {:?}",
                    test.zipped()
                ))
                .into());
            }
            for (index, params) in steps.iter().enumerate() {
                checked.params(config, params)?;
                for dim in GROWING_DIMS {
                    step_delta(&steps, index, dim)?;
                }
                test.step_load(&steps, index)?;
            }
        } else {
            let params = test.normalize(&config.defaults.fill(combination));
            checked.params(config, &params)?;
            test.full_load(&params)?;
        }
    }
    debug!(test = %test, combinations = combinations.len(), "configuration checked");
    Ok(())
}

/// Drivers and traffic sets already checked.
#[derive(Default)]
struct Checked {
    drivers: BTreeSet<String>,
    traffic: BTreeSet<String>,
}

impl Checked {
    fn params(&mut self, config: &CampaignConfig, params: &ParameterSet) -> CampaignResult<()> {
        let driver = params.require_str("driver")?;
        if self.drivers.insert(driver.to_string()) {
            let conf = config.driver(driver);
            if conf.broker_kind()? == BrokerKind::Qdr {
                let topology = conf.topology.as_deref().ok_or_else(|| {
                    TopologyError::UnknownKind(format!("missing topology for driver {driver}"))
                })?;
                busbench_topology::build(topology, &conf.args)?;
            }
        }
        if params.contains("delay") {
            let traffic = params.require_str("traffic")?;
            if self.traffic.insert(traffic.to_string()) {
                config.traffic(traffic, None)?;
            }
        }
        params.require_str("version")?;
        AgentSettings::from_params(params)?;
        Ok(())
    }
}

// ── Plain campaign ──────────────────────────────────────────────

/// Run every pending combination of `options.test`, resuming from the
/// store under the environment directory.
pub fn run_campaign(
    config: &CampaignConfig,
    options: &CampaignOptions,
    mut collab: Collaborators<'_>,
) -> CampaignResult<CampaignSummary> {
    let test = options.test;
    let env_dir = options.env_dir(false);
    let space = config.space(test.name())?;
    space.validate()?;
    preflight(config, test, space, false)?;

    let mut context = DeploymentContext::load_or_new(&env_dir)?;
    actions::deploy(&mut context, &mut *collab.provisioner, options.force)?;

    let sweeper = CampaignSweeper::open(test.name(), space, &env_dir)?;
    let policy = test.policy(options.unfiltered);
    let mut runs = sweeper.run_log()?.len();
    let (mut done, mut skipped) = (0, 0);

    info!(test = %test, env_dir = %env_dir.display(), "campaign started");
    while let Some(combination) = sweeper.next(&policy)? {
        let params = test.normalize(&config.defaults.fill(&combination));
        let experiment_id = combination.experiment_id();
        let backup_dir = context.backup_path(experiment_id.as_str())?;
        let attempt = Attempt {
            test,
            params: &combination,
            experiment_id: experiment_id.to_string(),
            backup_dir: &backup_dir,
            iteration: format!("run-{runs}"),
        };
        runs += 1;

        let result = run_combination(config, &mut context, &mut collab, &attempt, &params);
        if let Err(e) = &result {
            error!(test = %test, experiment = %attempt.experiment_id, error = %e, "combination failed");
        }
        teardown(&mut context, &mut collab);
        sweeper.log_attempt(&attempt.log_entry(&result))?;

        match result {
            Ok(()) => {
                sweeper.mark_done(&combination)?;
                done += 1;
            }
            Err(e) if e.is_recoverable() => {
                sweeper.mark_skip(&combination)?;
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    finish(test, env_dir, &sweeper, &policy, done, skipped)
}

fn run_combination(
    config: &CampaignConfig,
    context: &mut DeploymentContext,
    collab: &mut Collaborators<'_>,
    attempt: &Attempt<'_>,
    params: &ParameterSet,
) -> CampaignResult<()> {
    actions::emulate(config, &mut *collab.emulator, params)?;
    actions::validate(&mut *collab.emulator, attempt.backup_dir)?;
    actions::prepare(config, context, &mut *collab.applier, params.require_str("driver")?)?;
    actions::run_test_case(
        context,
        &mut *collab.applier,
        attempt.test,
        params,
        &attempt.iteration,
        attempt.backup_dir,
    )?;
    actions::backup(context, &mut *collab.applier, attempt.backup_dir)
}

/// Reset the network and destroy the deployment. Failures are logged only.
fn teardown(context: &mut DeploymentContext, collab: &mut Collaborators<'_>) {
    if let Err(e) = actions::reset(&mut *collab.emulator) {
        warn!(error = %e, "network reset failed");
    }
    if let Err(e) = actions::destroy(context, &mut *collab.applier) {
        warn!(error = %e, "teardown failed");
    }
}

fn finish(
    test: TestCase,
    env_dir: PathBuf,
    sweeper: &CampaignSweeper,
    policy: &dyn SweepPolicy,
    done: usize,
    skipped: usize,
) -> CampaignResult<CampaignSummary> {
    let progress = sweeper.progress(policy)?;
    let counts = sweeper.counts()?;
    match progress {
        SweepProgress::Filtered { remaining } => warn!(
            test = %test,
            remaining,
            "pending combinations remain but none passes the filter"
        ),
        _ => info!(test = %test, done = counts.done, skipped = counts.skipped, "campaign finished"),
    }
    Ok(CampaignSummary {
        test,
        env_dir,
        attempted: done + skipped,
        done,
        skipped,
        counts,
        progress,
    })
}

// ── Incremental campaign ────────────────────────────────────────

/// Run every pending group of `options.test`, growing the deployment step
/// by step within each group.
pub fn run_incremental_campaign(
    config: &CampaignConfig,
    options: &CampaignOptions,
    mut collab: Collaborators<'_>,
) -> CampaignResult<CampaignSummary> {
    let test = options.test;
    if !test.supports_incremental() {
        return Err(ConfigError::Unsupported(format!("{test} has no incremental mode")).into());
    }
    let env_dir = options.env_dir(true);
    let space = pack_space(config.space(test.name())?, test.zipped())?;
    space.validate()?;
    preflight(config, test, &space, true)?;
    let pause = options
        .iteration_pause
        .unwrap_or(config.defaults.iteration_pause)
        .max(0.0);

    let mut context = DeploymentContext::load_or_new(&env_dir)?;
    actions::deploy(&mut context, &mut *collab.provisioner, options.force)?;

    let sweeper = CampaignSweeper::open(test.name(), &space, &env_dir)?;
    let policy = test.policy(options.unfiltered);
    let mut labels = GroupLabels::starting_at(sweeper.counts()?.terminal());
    let (mut done, mut skipped) = (0, 0);

    info!(test = %test, env_dir = %env_dir.display(), "incremental campaign started");
    while let Some(group) = sweeper.next(&policy)? {
        let Some(label) = labels.next() else { break };
        let (raw, steps) = group_steps(config, test, &group)?;
        let group_run = GroupRun {
            test,
            label: &label,
            raw: &raw,
            steps: &steps,
            pause,
        };

        let result = run_group(config, &mut context, &mut collab, &sweeper, &group_run);
        if let Err(e) = &result {
            error!(test = %test, group = %label, error = %e, "group failed");
        }
        if let Err(e) = actions::destroy(&mut context, &mut *collab.applier) {
            warn!(group = %label, error = %e, "teardown failed");
        }

        match result {
            Ok(()) => {
                sweeper.mark_done(&group)?;
                done += 1;
            }
            Err(e) if e.is_recoverable() => {
                sweeper.mark_skip(&group)?;
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    finish(test, env_dir, &sweeper, &policy, done, skipped)
}

/// The steps of a group: as swept (`raw`, naming experiments and backups
/// the way a plain run of the same combination does) and filled with
/// defaults (`steps`, what gets deployed).
fn group_steps(
    config: &CampaignConfig,
    test: TestCase,
    group: &ParameterSet,
) -> CampaignResult<(Vec<ParameterSet>, Vec<ParameterSet>)> {
    let raw = expand_group(group, test.zipped())?;
    let steps = raw
        .iter()
        .map(|step| test.normalize(&config.defaults.fill(step)))
        .collect();
    Ok((raw, steps))
}

struct GroupRun<'a> {
    test: TestCase,
    label: &'a str,
    raw: &'a [ParameterSet],
    steps: &'a [ParameterSet],
    pause: f64,
}

fn run_group(
    config: &CampaignConfig,
    context: &mut DeploymentContext,
    collab: &mut Collaborators<'_>,
    sweeper: &CampaignSweeper,
    group: &GroupRun<'_>,
) -> CampaignResult<()> {
    if group.steps.is_empty() {
        warn!(group = group.label, "group has no steps");
        return Err(ConfigError::MalformedSpace(format!("group {} has no steps", group.label)).into());
    }

    for (index, (combination, params)) in group.raw.iter().zip(group.steps).enumerate() {
        let experiment_id = combination.experiment_id();
        let backup_dir = context.backup_path(experiment_id.as_str())?;
        let attempt = Attempt {
            test: group.test,
            params: combination,
            experiment_id: experiment_id.to_string(),
            backup_dir: &backup_dir,
            iteration: iteration_id(group.label, index),
        };

        let result = run_step(config, context, collab, &attempt, params, group.steps, index);
        if let Err(e) = actions::reset(&mut *collab.emulator) {
            warn!(iteration = %attempt.iteration, error = %e, "network reset failed");
        }
        sweeper.log_attempt(&attempt.log_entry(&result))?;
        result?;
        info!(iteration = %attempt.iteration, "step done");

        if index + 1 < group.steps.len() && group.pause > 0.0 {
            thread::sleep(Duration::from_secs_f64(group.pause));
        }
    }
    Ok(())
}

/// One step of a group. The first step also brings up the bus.
fn run_step(
    config: &CampaignConfig,
    context: &mut DeploymentContext,
    collab: &mut Collaborators<'_>,
    attempt: &Attempt<'_>,
    params: &ParameterSet,
    steps: &[ParameterSet],
    index: usize,
) -> CampaignResult<()> {
    if index == 0 {
        actions::prepare(config, context, &mut *collab.applier, params.require_str("driver")?)?;
    }
    actions::emulate(config, &mut *collab.emulator, params)?;
    actions::validate(&mut *collab.emulator, attempt.backup_dir)?;
    let step = attempt.test.step_load(steps, index)?;
    let run = actions::plan_step(context, attempt.test, params, &step, &attempt.iteration)?;
    actions::deploy_agents(context, &mut *collab.applier, params, &run, attempt.backup_dir)?;
    actions::backup(context, &mut *collab.applier, attempt.backup_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_directories() {
        let options = CampaignOptions::new(TestCase::Fanout);
        assert_eq!(options.env_dir(false), PathBuf::from("test_case_3"));
        assert_eq!(options.env_dir(true), PathBuf::from("test_case_3-incremental"));

        let explicit = CampaignOptions {
            env_dir: Some(PathBuf::from("/tmp/env")),
            ..CampaignOptions::new(TestCase::Fanout)
        };
        assert_eq!(explicit.env_dir(true), PathBuf::from("/tmp/env"));
    }
}
