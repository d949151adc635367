//! busbench campaign engine.
//!
//! Drives a benchmark campaign one parameter combination at a time:
//! enumerate, filter and order the parameter space, lay out the bus and
//! the agents for the selected combination, hand the plan to the external
//! collaborators, and persist the outcome before moving on. A campaign
//! interrupted at any point resumes where it stopped.
//!
//! # Components
//!
//! - **`sweeper`** — Persistent, resumable enumeration with done/skip transitions
//! - **`policy`** — Filter and ordering of pending combinations
//! - **`testcase`** — The registered test cases and their load shapes
//! - **`incremental`** — Zipped growth groups and per-step load deltas
//! - **`context`** — Typed deployment context shared between invocations
//! - **`collaborator`** — Provisioner, configuration applier, network emulator seams
//! - **`actions`** — Single-shot operations (prepare, test case, backup, destroy)
//! - **`runner`** — Campaign and incremental campaign loops

pub mod actions;
pub mod collaborator;
pub mod context;
pub mod error;
pub mod incremental;
pub mod policy;
pub mod runner;
pub mod sweeper;
pub mod testcase;

pub use collaborator::{Collaborators, ConfigurationApplier, NetworkEmulator, Provisioner};
pub use context::DeploymentContext;
pub use error::{CampaignError, CampaignResult, ExecutionError};
pub use incremental::{GroupLabels, zip_parameters};
pub use policy::{FilterOrder, SweepPolicy};
pub use runner::{CampaignOptions, CampaignSummary, run_campaign, run_incremental_campaign};
pub use sweeper::{CampaignSweeper, SweepProgress};
pub use testcase::{StepLoad, TestCase};
