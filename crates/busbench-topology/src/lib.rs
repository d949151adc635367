//! busbench broker layout — router graphs, machine placement, bus agents.
//!
//! The bus under test is either a set of rabbitmq brokers or a mesh of
//! qdr routers. For routers this crate builds the connectivity graph,
//! spreads routers over machines and synthesizes every listener and
//! connector. Layouts are pure functions of their inputs.
//!
//! # Components
//!
//! - **`graph`** — Named graph generators (complete, cycle, path, …)
//! - **`placement`** — Router → machine assignment (round-robin)
//! - **`router`** — Listener/connector descriptors per router
//! - **`bus`** — Broker agent layouts for a whole bus deployment

pub mod bus;
pub mod error;
pub mod graph;
pub mod placement;
pub mod router;

pub use bus::{BusConf, ClusterPeer, RabbitMqConf, generate_bus_conf};
pub use error::{TopologyError, TopologyResult};
pub use graph::{RouterGraph, TopologyKind, build};
pub use placement::{PlacementPolicy, RouterPlacement, place};
pub use router::{Connector, Listener, ListenerRole, RouterConf, RouterTopology, materialize};
