//! busbench sharding and agent placement.
//!
//! Given one parameter combination, this crate decides how the load is
//! split across the control-bus replicas (shards) and which machine, topic
//! and bus endpoint every benchmark agent uses. Everything here is pure and
//! deterministic: the same inputs always yield the same plan.
//!
//! # Components
//!
//! - **`shard`** — Count and list partitioning into near-equal shards
//! - **`layout`** — Per-shard agent counts and offsets for each load shape
//! - **`agent`** — Agent variants and their launch commands
//! - **`planner`** — Shard → agent descriptors, merged into a run plan

pub mod agent;
pub mod error;
pub mod layout;
pub mod planner;
pub mod shard;

pub use agent::{AgentDescriptor, AgentKind, AgentSettings};
pub use error::{PlacementError, PlacementResult};
pub use layout::{Load, LoadShape, ShardRequest};
pub use planner::{RunPlan, Testbed, plan, plan_shard};
pub use shard::{Distribution, ShardSlice, distribute, shard_list, shard_value};
