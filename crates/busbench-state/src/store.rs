//! SweepStore — redb-backed sweep state and run log.
//!
//! Supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use busbench_core::ParameterSet;
use redb::{Database, ReadableDatabase, ReadableTable};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

const META_TEST: &str = "test";
const META_DIGEST: &str = "space_digest";

/// What `seed` found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Empty store, every combination written as pending.
    Fresh(usize),
    /// Existing progress kept.
    Resumed(SweepCounts),
}

/// SHA-256 over the canonical JSON of `sets`, hex encoded.
pub fn sets_digest(sets: &[ParameterSet]) -> StateResult<String> {
    let mut hasher = Sha256::new();
    for set in sets {
        let key = set.canonical_json().map_err(map_err!(Serialize))?;
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Sweep progress for one test in one environment directory.
#[derive(Clone)]
pub struct SweepStore {
    db: Arc<Database>,
}

impl SweepStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "sweep store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory sweep store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(SWEEP_STATE).map_err(map_err!(Table))?;
        txn.open_table(RUN_LOG).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Sweep state ────────────────────────────────────────────────

    /// Write every combination as pending unless the store already holds
    /// a sweep, in which case the persisted state is kept as is.
    pub fn seed(&self, test: &str, sets: &[ParameterSet]) -> StateResult<SeedOutcome> {
        let digest = sets_digest(sets)?;
        if let Some(previous) = self.meta(META_DIGEST)? {
            if previous != digest {
                warn!(
                    test,
                    %previous,
                    current = %digest,
                    "parameter space changed since the sweep started, keeping persisted state"
                );
            }
            let counts = self.counts()?;
            info!(
                test,
                pending = counts.pending,
                done = counts.done,
                skipped = counts.skipped,
                "resuming sweep"
            );
            return Ok(SeedOutcome::Resumed(counts));
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SWEEP_STATE).map_err(map_err!(Table))?;
            for set in sets {
                let key = set.canonical_json().map_err(map_err!(Serialize))?;
                let value = serde_json::to_vec(&SweepRecord::pending(set.clone()))
                    .map_err(map_err!(Serialize))?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
            let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
            meta.insert(META_TEST, test).map_err(map_err!(Write))?;
            meta.insert(META_DIGEST, digest.as_str())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(test, combinations = sets.len(), "sweep seeded");
        Ok(SeedOutcome::Fresh(sets.len()))
    }

    pub fn get(&self, params: &ParameterSet) -> StateResult<Option<SweepRecord>> {
        let key = params.canonical_json().map_err(map_err!(Serialize))?;
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SWEEP_STATE).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: SweepRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Every record, in canonical key order.
    pub fn records(&self) -> StateResult<Vec<SweepRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SWEEP_STATE).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: SweepRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    pub fn with_status(&self, status: SweepStatus) -> StateResult<Vec<ParameterSet>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.status == status)
            .map(|r| r.params)
            .collect())
    }

    pub fn counts(&self) -> StateResult<SweepCounts> {
        let mut counts = SweepCounts::default();
        for record in self.records()? {
            match record.status {
                SweepStatus::Pending => counts.pending += 1,
                SweepStatus::Done => counts.done += 1,
                SweepStatus::Skipped => counts.skipped += 1,
            }
        }
        Ok(counts)
    }

    /// Move a pending combination to a terminal status. Committed before
    /// returning.
    pub fn transition(&self, params: &ParameterSet, status: SweepStatus) -> StateResult<()> {
        let key = params.canonical_json().map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SWEEP_STATE).map_err(map_err!(Table))?;
            let mut record: SweepRecord = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StateError::NotFound(key)),
            };
            if record.status.is_terminal() {
                return Err(StateError::AlreadyTerminal {
                    key,
                    status: record.status.to_string(),
                });
            }
            record.status = status;
            record.attempts += 1;
            record.updated_at = epoch_secs();
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, %status, "sweep transition");
        Ok(())
    }

    // ── Run log ────────────────────────────────────────────────────

    /// Append an entry and return its sequence number.
    pub fn append_run_log(&self, entry: &RunLogEntry) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let seq;
        {
            let mut table = txn.open_table(RUN_LOG).map_err(map_err!(Table))?;
            seq = match table.last().map_err(map_err!(Read))? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };
            let mut entry = entry.clone();
            entry.seq = seq;
            let value = serde_json::to_vec(&entry).map_err(map_err!(Serialize))?;
            table
                .insert(seq, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(seq, experiment = %entry.experiment_id, "run log appended");
        Ok(seq)
    }

    pub fn run_log(&self) -> StateResult<Vec<RunLogEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RUN_LOG).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let entry: RunLogEntry =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(entry);
        }
        Ok(results)
    }

    // ── Metadata ───────────────────────────────────────────────────

    pub fn meta(&self, key: &str) -> StateResult<Option<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(META).map_err(map_err!(Table))?;
        Ok(table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_string()))
    }

    /// Test name the store was seeded for.
    pub fn test_name(&self) -> StateResult<Option<String>> {
        self.meta(META_TEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets() -> Vec<ParameterSet> {
        vec![
            ParameterSet::new().with("nbr_clients", 1).with("nbr_servers", 1),
            ParameterSet::new().with("nbr_clients", 2).with("nbr_servers", 1),
        ]
    }

    fn log_entry(params: &ParameterSet, outcome: RunOutcome) -> RunLogEntry {
        RunLogEntry {
            seq: 0,
            test: "test_case_1".to_string(),
            params: params.clone(),
            experiment_id: params.experiment_id().to_string(),
            backup_dir: format!("backup/{}", params.experiment_id()),
            iteration_id: None,
            outcome,
            error: None,
            timestamp: 1000,
        }
    }

    // ── Sweep state ────────────────────────────────────────────────

    #[test]
    fn seed_writes_everything_pending() {
        let store = SweepStore::open_in_memory().unwrap();
        assert_eq!(store.seed("tc", &sets()).unwrap(), SeedOutcome::Fresh(2));
        assert_eq!(store.with_status(SweepStatus::Pending).unwrap().len(), 2);
        assert_eq!(store.test_name().unwrap().as_deref(), Some("tc"));
    }

    #[test]
    fn seed_twice_keeps_progress() {
        let store = SweepStore::open_in_memory().unwrap();
        store.seed("tc", &sets()).unwrap();
        store.transition(&sets()[0], SweepStatus::Done).unwrap();

        let outcome = store.seed("tc", &sets()).unwrap();
        let SeedOutcome::Resumed(counts) = outcome else {
            panic!("expected resume, got {outcome:?}");
        };
        assert_eq!(counts.done, 1);
        assert_eq!(counts.pending, 1);
    }

    #[test]
    fn changed_space_keeps_persisted_state() {
        let store = SweepStore::open_in_memory().unwrap();
        store.seed("tc", &sets()).unwrap();
        let other = vec![ParameterSet::new().with("nbr_clients", 9)];
        assert!(matches!(store.seed("tc", &other).unwrap(), SeedOutcome::Resumed(_)));
        assert_eq!(store.counts().unwrap().total(), 2);
        assert!(store.get(&other[0]).unwrap().is_none());
    }

    #[test]
    fn transitions_are_terminal() {
        let store = SweepStore::open_in_memory().unwrap();
        store.seed("tc", &sets()).unwrap();
        store.transition(&sets()[1], SweepStatus::Skipped).unwrap();

        let record = store.get(&sets()[1]).unwrap().unwrap();
        assert_eq!(record.status, SweepStatus::Skipped);
        assert_eq!(record.attempts, 1);
        assert!(matches!(
            store.transition(&sets()[1], SweepStatus::Done),
            Err(StateError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn unknown_combination_is_not_found() {
        let store = SweepStore::open_in_memory().unwrap();
        store.seed("tc", &sets()).unwrap();
        let stray = ParameterSet::new().with("nbr_clients", 7);
        assert!(matches!(
            store.transition(&stray, SweepStatus::Done),
            Err(StateError::NotFound(_))
        ));
    }

    #[test]
    fn digest_depends_on_content() {
        let a = sets_digest(&sets()).unwrap();
        assert_eq!(a, sets_digest(&sets()).unwrap());
        assert_eq!(a.len(), 64);
        assert_ne!(a, sets_digest(&sets()[..1]).unwrap());
    }

    // ── Run log ────────────────────────────────────────────────────

    #[test]
    fn run_log_sequences_increase() {
        let store = SweepStore::open_in_memory().unwrap();
        let params = &sets()[0];
        assert_eq!(store.append_run_log(&log_entry(params, RunOutcome::Skipped)).unwrap(), 0);
        assert_eq!(store.append_run_log(&log_entry(params, RunOutcome::Done)).unwrap(), 1);

        let log = store.run_log().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].seq, 1);
        assert_eq!(log[1].outcome, RunOutcome::Done);
        assert_eq!(log[0].experiment_id, "nbr_clients__1-nbr_servers__1");
    }

    // ── Persistence ────────────────────────────────────────────────

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test_case_1.redb");

        {
            let store = SweepStore::open(&db_path).unwrap();
            store.seed("test_case_1", &sets()).unwrap();
            store.transition(&sets()[0], SweepStatus::Done).unwrap();
            store
                .append_run_log(&log_entry(&sets()[0], RunOutcome::Done))
                .unwrap();
        }

        // Reopen the same database file.
        let store = SweepStore::open(&db_path).unwrap();
        assert!(matches!(store.seed("test_case_1", &sets()).unwrap(), SeedOutcome::Resumed(_)));
        assert_eq!(store.with_status(SweepStatus::Pending).unwrap(), vec![sets()[1].clone()]);
        assert_eq!(store.run_log().unwrap().len(), 1);
    }
}
