//! A request-driven cache simulator that produces delayed-reward training
//! data for reinforcement-learning cache policies.
//!
//! # Features
//! - **Cache Model**: Occupancy, hit/miss and byte-volume accounting over a set
//!   of cached file ids, with per-file statistics and time-bounded purging.
//! - **Delayed Rewards**: Add and evict decisions stay pending for a horizon
//!   of ticks, collect evidence from later requests, and are then resolved
//!   into size-weighted rewards.
//! - **Replay Buffers**: Finished `(state, action, reward, next_state)`
//!   transitions per decision kind, sampled with one seeded generator.
//! - **Configuration**: One immutable [`EnvConfig`], built fluently or loaded
//!   from YAML with the `serde` feature.

pub mod builder;
pub mod config;
pub mod env;
pub mod error;
pub mod replay;
pub mod state;
pub mod stats;
pub mod window;

/// Identifier of a file in the replayed trace.
pub type FileId = u64;

/// Per-request sequence number, counted from the start of the simulation.
pub type Tick = u64;

pub use builder::EnvBuilder;
pub use config::{DayRange, EnvConfig, SizeBounds, SizeCoefficient, SizeDistribution};
pub use env::{Environment, Phase};
pub use error::{BuildError, EnvError, Result};
pub use replay::{ReplayBuffer, Transition, TRANSITION_LEN};
pub use state::{CacheState, DailyStats, RewardSummary};
pub use stats::{FileStats, StatsStore};
pub use window::{Action, DecisionKind, DecisionWindow, FeatureSnapshot, PendingDecision, FEATURE_LEN};
