//! Immutable tunables for an [`Environment`](crate::Environment).
//!
//! Everything that shapes a simulation run lives in one [`EnvConfig`] value,
//! created once (through [`EnvBuilder`](crate::EnvBuilder) or from a YAML
//! document) and owned by the environment for its whole lifetime.

use crate::error::BuildError;
#[cfg(feature = "serde")]
use crate::error::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::path::Path;

/// Default occupancy percentage above which eviction should start.
pub const DEFAULT_HIGH_WATERMARK: f64 = 95.0;
/// Default occupancy percentage below which eviction should stop.
pub const DEFAULT_LOW_WATERMARK: f64 = 0.0;

/// Summary statistics of a reference file-size population.
///
/// The normalized size coefficient is a ramp between `mean - stdev` and
/// `mean + stdev` of this distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SizeDistribution {
  pub mean: f32,
  pub stdev: f32,
}

impl Default for SizeDistribution {
  /// Sizes (MiB) observed over a year of analysis-job requests.
  fn default() -> Self {
    Self {
      mean: 3397.512_9,
      stdev: 2186.259,
    }
  }
}

impl SizeDistribution {
  pub fn bounds(&self) -> SizeBounds {
    SizeBounds {
      liminf: self.mean - self.stdev,
      limsup: self.mean + self.stdev,
    }
  }
}

/// The `[liminf, limsup]` interval mapped onto `[0, 1]` by the normalized
/// size coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SizeBounds {
  pub liminf: f32,
  pub limsup: f32,
}

impl SizeBounds {
  fn validate(&self) -> Result<(), BuildError> {
    let ordered = self.liminf.is_finite() && self.limsup.is_finite() && self.liminf < self.limsup;
    if ordered {
      Ok(())
    } else {
      Err(BuildError::InvalidSizeBounds {
        liminf: self.liminf,
        limsup: self.limsup,
      })
    }
  }
}

/// How a decided file's size scales the reward it eventually resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
  feature = "serde",
  derive(Serialize, Deserialize),
  serde(tag = "mode", rename_all = "snake_case")
)]
pub enum SizeCoefficient {
  /// The coefficient is the raw size value.
  Linear,
  /// The coefficient ramps linearly from 0 at `liminf` to 1 at `limsup`.
  Normalized(SizeBounds),
}

impl Default for SizeCoefficient {
  fn default() -> Self {
    SizeCoefficient::Normalized(SizeDistribution::default().bounds())
  }
}

impl SizeCoefficient {
  /// Normalized mode with bounds taken from a reference distribution.
  pub fn normalized(distribution: SizeDistribution) -> Self {
    SizeCoefficient::Normalized(distribution.bounds())
  }

  /// Maps the output-activation names used by training scripts onto a mode:
  /// `"sigmoid"` selects the normalized ramp, anything else is linear.
  pub fn from_activation_name(name: &str, distribution: SizeDistribution) -> Self {
    if name.eq_ignore_ascii_case("sigmoid") {
      Self::normalized(distribution)
    } else {
      SizeCoefficient::Linear
    }
  }

  /// Computes the reward weight for a file of the given size.
  #[inline]
  pub fn coefficient(&self, size: f32) -> f32 {
    match self {
      SizeCoefficient::Linear => size,
      SizeCoefficient::Normalized(bounds) => {
        if size <= bounds.liminf {
          0.0
        } else if size >= bounds.limsup {
          1.0
        } else {
          (size - bounds.liminf) / (bounds.limsup - bounds.liminf)
        }
      }
    }
  }
}

/// The simulated calendar span, as day indexes. The environment reports
/// itself finished once its current day reaches `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DayRange {
  pub start: u32,
  pub end: u32,
}

impl Default for DayRange {
  fn default() -> Self {
    Self { start: 0, end: 365 }
  }
}

impl DayRange {
  pub fn total_days(&self) -> u32 {
    self.end.saturating_sub(self.start)
  }
}

/// The complete, immutable configuration of an environment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvConfig {
  /// Cache capacity in bytes.
  pub cache_capacity: f64,
  /// Ticks an add-decision stays pending before it is resolved.
  pub add_horizon: u64,
  /// Ticks an evict-decision stays pending before it is resolved.
  pub evict_horizon: u64,
  /// Uncached files idle for longer than this many ticks are purged.
  #[cfg_attr(feature = "serde", serde(default))]
  pub purge_delta: u64,
  #[cfg_attr(feature = "serde", serde(default))]
  pub size_coefficient: SizeCoefficient,
  #[cfg_attr(feature = "serde", serde(default))]
  pub rng_seed: u64,
  #[cfg_attr(feature = "serde", serde(default))]
  pub day_range: DayRange,
  #[cfg_attr(feature = "serde", serde(default = "default_high_watermark"))]
  pub high_watermark: f64,
  #[cfg_attr(feature = "serde", serde(default = "default_low_watermark"))]
  pub low_watermark: f64,
}

#[cfg(feature = "serde")]
fn default_high_watermark() -> f64 {
  DEFAULT_HIGH_WATERMARK
}

#[cfg(feature = "serde")]
fn default_low_watermark() -> f64 {
  DEFAULT_LOW_WATERMARK
}

impl EnvConfig {
  /// Checks every field; the first violation found is returned.
  pub fn validate(&self) -> Result<(), BuildError> {
    if !self.cache_capacity.is_finite() || self.cache_capacity <= 0.0 {
      return Err(BuildError::InvalidCapacity(self.cache_capacity));
    }
    if self.add_horizon == 0 {
      return Err(BuildError::ZeroHorizon(crate::DecisionKind::Add));
    }
    if self.evict_horizon == 0 {
      return Err(BuildError::ZeroHorizon(crate::DecisionKind::Evict));
    }
    if let SizeCoefficient::Normalized(bounds) = &self.size_coefficient {
      bounds.validate()?;
    }
    if self.day_range.end < self.day_range.start {
      return Err(BuildError::InvalidDayRange {
        start: self.day_range.start,
        end: self.day_range.end,
      });
    }
    let in_range = |w: f64| (0.0..=100.0).contains(&w);
    if !in_range(self.low_watermark) || !in_range(self.high_watermark) || self.low_watermark > self.high_watermark {
      return Err(BuildError::InvalidWatermarks {
        low: self.low_watermark,
        high: self.high_watermark,
      });
    }
    Ok(())
  }

  /// Parses a configuration from a YAML document. The result is not
  /// validated; [`EnvBuilder::from_config`](crate::EnvBuilder::from_config)
  /// does that on `build()`.
  #[cfg(feature = "serde")]
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(yaml)?)
  }

  /// Reads and parses a YAML configuration file.
  #[cfg(feature = "serde")]
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let contents = std::fs::read_to_string(path)?;
    Self::from_yaml_str(&contents)
  }
}
