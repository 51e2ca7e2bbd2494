//! Partitioned Wa-Tor simulation engine.
//!
//! The toroidal grid is split into rectangular partitions, each advanced by
//! its own worker thread per tick. Workers move entities under cell and
//! boundary locks and record births and deaths as local intents; the
//! reconciler folds those intents into the canonical registry once every
//! worker has finished.

pub mod entity;
pub mod grid;
pub mod partition;
pub mod reconcile;
pub mod registry;
pub mod simulation;
pub mod snapshot;
pub mod worker;

pub use entity::{Fish, FishRef, FishState, Identified, Occupant, Shark, SharkRef, SharkState};
pub use grid::Grid;
pub use partition::{BoundaryKind, BoundaryLock, LockId, Partition, PartitionLayout};
pub use reconcile::{reconcile, ReconcileSummary, SpeciesDelta};
pub use registry::{Registry, RegistrySnapshot, Snapshotted};
pub use simulation::{NoopObserver, Simulation, TickObserver};
pub use snapshot::RenderSnapshot;
pub use worker::{LocalIntents, Worker, WorkerReport, WorkerStats};
