//! # Spawnpool Core
//!
//! Pre-allocated instance pools for gameplay workloads.
//!
//! ## Design Principles
//! - Every instance is created up front (or in bounded growth steps)
//! - Free slots are served from an index queue that rebuilds itself from
//!   the host's live active flags whenever it runs dry
//! - Exhaustion is an ordinary result value, never a panic
//! - Single-threaded: a pool and its host are driven from one update loop
//!
//! The host world (the thing that actually spawns, places and destroys
//! instances) is passed by `&mut` into every pool operation, so any number
//! of pools can share one world.

pub mod capacity;
pub mod config;
pub mod distribution;
pub mod error;
pub mod host;
pub mod pool;
pub mod queue;
pub mod session;
pub mod slot;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use capacity::{CapacityPolicy, Fixed, Growable};
pub use config::{OnCreate, OnEnable, PoolConfig, PoolConfigBuilder};
pub use distribution::Distribution;
pub use error::{ActivateError, ConfigError, DistributionFault, QueueError, SpawnError};
pub use host::{ActivationHost, InstanceFactory};
pub use pool::{CategoryPool, FixedPool, FlexiblePool, Pool, PoolStats};
pub use queue::{IndexQueue, OrderedQueue, RandomizedQueue};
pub use slot::{Reservation, Slot, SlotArray};
pub use strategy::{Allocation, Categories, FreeList, Miss};
