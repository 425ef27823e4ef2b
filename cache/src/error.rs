use crate::window::DecisionKind;
use crate::FileId;

use thiserror::Error;

/// Errors that can occur when building an environment.
///
/// These are all configuration mistakes and are reported before any request
/// is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
  /// The cache capacity must be a finite number of bytes greater than zero.
  #[error("cache capacity must be finite and greater than zero, got {0}")]
  InvalidCapacity(f64),

  /// A decision window was configured with a horizon of zero ticks.
  #[error("{0} horizon cannot be zero")]
  ZeroHorizon(DecisionKind),

  /// The normalized size coefficient needs `liminf < limsup`, both finite.
  #[error("invalid size bounds: liminf {liminf} must be below limsup {limsup}")]
  InvalidSizeBounds { liminf: f32, limsup: f32 },

  /// The simulated day range ends before it starts.
  #[error("day range end {end} is before start {start}")]
  InvalidDayRange { start: u32, end: u32 },

  /// Watermarks must lie in `0..=100` with `low <= high`.
  #[error("invalid watermarks: low {low}% / high {high}%")]
  InvalidWatermarks { low: f64, high: f64 },
}

/// Errors returned to the caller while the environment is running.
#[derive(Debug, Error)]
pub enum EnvError {
  #[error("file {0} has never been requested")]
  UnknownFile(FileId),

  #[error("cannot sample from the empty {0} replay buffer")]
  EmptyReplayBuffer(DecisionKind),

  #[error("a decision was recorded before any feature snapshot was set")]
  FeaturesNotSet,

  #[error("failed to read configuration file: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[cfg(feature = "serde")]
  #[error("failed to parse configuration: {0}")]
  ConfigParse(#[from] serde_yaml::Error),

  #[error(transparent)]
  Build(#[from] BuildError),
}

/// A specialized `Result` type for environment operations.
pub type Result<T, E = EnvError> = std::result::Result<T, E>;
