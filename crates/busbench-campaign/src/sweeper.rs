//! Resumable sweep over a parameter space.
//!
//! The sweeper owns the persisted state of one campaign. Combinations move
//! from pending to done or skipped exactly once; every transition is
//! committed to the store before the next combination is handed out, so a
//! crash at any point loses at most the attempt in flight.

use std::fs;
use std::path::{Path, PathBuf};

use busbench_core::{ParameterSet, ParameterSpace};
use busbench_state::{
    RunLogEntry, SeedOutcome, SweepCounts, SweepStatus, SweepStore,
};
use tracing::{debug, info, warn};

use crate::error::{CampaignError, CampaignResult};
use crate::policy::SweepPolicy;

/// Where a sweep stands with respect to a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepProgress {
    /// At least one pending combination passes the policy.
    Ready { eligible: usize },
    /// Pending combinations remain but the policy rejects all of them.
    Filtered { remaining: usize },
    /// Nothing is pending.
    Exhausted,
}

pub struct CampaignSweeper {
    test: String,
    store: SweepStore,
}

impl CampaignSweeper {
    /// Sweep `sets` for `test`, resuming from `store` when it already
    /// holds progress.
    pub fn initialize(test: &str, sets: &[ParameterSet], store: SweepStore) -> CampaignResult<Self> {
        match store.seed(test, sets)? {
            SeedOutcome::Fresh(n) => debug!(test, combinations = n, "fresh sweep"),
            SeedOutcome::Resumed(counts) => debug!(test, pending = counts.pending, "resumed sweep"),
        }
        Ok(Self {
            test: test.to_string(),
            store,
        })
    }

    /// Enumerate `space` and open its store at `<env_dir>/sweeps/<test>.redb`.
    pub fn open(test: &str, space: &ParameterSpace, env_dir: &Path) -> CampaignResult<Self> {
        let sets = space.cross_product()?;
        let path = Self::store_path(test, env_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CampaignError::io(parent, e))?;
        }
        let store = SweepStore::open(&path)?;
        info!(test, path = %path.display(), combinations = sets.len(), "sweep store ready");
        Self::initialize(test, &sets, store)
    }

    pub fn store_path(test: &str, env_dir: &Path) -> PathBuf {
        env_dir.join("sweeps").join(format!("{test}.redb"))
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    /// First pending combination the policy accepts.
    pub fn next(&self, policy: &dyn SweepPolicy) -> CampaignResult<Option<ParameterSet>> {
        let pending = self.store.with_status(SweepStatus::Pending)?;
        Ok(policy.select(pending).into_iter().next())
    }

    pub fn progress(&self, policy: &dyn SweepPolicy) -> CampaignResult<SweepProgress> {
        let pending = self.store.with_status(SweepStatus::Pending)?;
        if pending.is_empty() {
            return Ok(SweepProgress::Exhausted);
        }
        let remaining = pending.len();
        let eligible = policy.select(pending).len();
        Ok(if eligible == 0 {
            SweepProgress::Filtered { remaining }
        } else {
            SweepProgress::Ready { eligible }
        })
    }

    pub fn mark_done(&self, params: &ParameterSet) -> CampaignResult<()> {
        self.store.transition(params, SweepStatus::Done)?;
        info!(test = %self.test, experiment = %params.experiment_id(), "combination done");
        Ok(())
    }

    /// Skipped combinations are never handed out again.
    pub fn mark_skip(&self, params: &ParameterSet) -> CampaignResult<()> {
        self.store.transition(params, SweepStatus::Skipped)?;
        warn!(test = %self.test, experiment = %params.experiment_id(), "combination skipped");
        Ok(())
    }

    pub fn counts(&self) -> CampaignResult<SweepCounts> {
        Ok(self.store.counts()?)
    }

    pub fn log_attempt(&self, entry: &RunLogEntry) -> CampaignResult<u64> {
        Ok(self.store.append_run_log(entry)?)
    }

    pub fn run_log(&self) -> CampaignResult<Vec<RunLogEntry>> {
        Ok(self.store.run_log()?)
    }
}
