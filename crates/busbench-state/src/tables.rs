//! redb table definitions for the sweep store.

use redb::TableDefinition;

/// Sweep records keyed by the canonical JSON of their parameter set.
pub const SWEEP_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("sweep_state");

/// Run log entries keyed by sequence number.
pub const RUN_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("run_log");

/// Store metadata (`test`, `space_digest`).
pub const META: TableDefinition<&str, &str> = TableDefinition::new("meta");
