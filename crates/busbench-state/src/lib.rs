//! busbench-state — durable sweep progress for benchmark campaigns.
//!
//! Backed by [redb](https://docs.rs/redb). One store per (test, environment
//! directory) holds the status of every enumerated combination and an
//! append-only log of execution attempts.
//!
//! # Architecture
//!
//! Records are JSON-serialized into redb's `&[u8]` value columns. Sweep
//! records are keyed by the canonical JSON of their parameter set, run log
//! entries by a monotonically increasing sequence number. Every mutation is
//! a single write transaction, so a crash leaves the last committed state.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{SeedOutcome, SweepStore, sets_digest};
pub use types::*;
