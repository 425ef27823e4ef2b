use crate::config::{
  DayRange, EnvConfig, SizeCoefficient, SizeDistribution, DEFAULT_HIGH_WATERMARK, DEFAULT_LOW_WATERMARK,
};
use crate::env::Environment;
use crate::error::BuildError;

/// A builder for creating [`Environment`] instances.
///
/// Capacity and both horizons have no usable default and must be set;
/// `build()` rejects a zero capacity or horizon.
#[derive(Debug, Clone)]
pub struct EnvBuilder {
  config: EnvConfig,
}

impl Default for EnvBuilder {
  fn default() -> Self {
    Self {
      config: EnvConfig {
        cache_capacity: 0.0,
        add_horizon: 0,
        evict_horizon: 0,
        purge_delta: 0,
        size_coefficient: SizeCoefficient::default(),
        rng_seed: 0,
        day_range: DayRange::default(),
        high_watermark: DEFAULT_HIGH_WATERMARK,
        low_watermark: DEFAULT_LOW_WATERMARK,
      },
    }
  }
}

impl EnvBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts from a complete configuration, e.g. one loaded from YAML.
  pub fn from_config(config: EnvConfig) -> Self {
    Self { config }
  }

  /// Sets the cache capacity in bytes.
  pub fn capacity(mut self, bytes: f64) -> Self {
    self.config.cache_capacity = bytes;
    self
  }

  /// Sets how many ticks an add-decision stays pending.
  pub fn add_horizon(mut self, ticks: u64) -> Self {
    self.config.add_horizon = ticks;
    self
  }

  /// Sets how many ticks an evict-decision stays pending.
  pub fn evict_horizon(mut self, ticks: u64) -> Self {
    self.config.evict_horizon = ticks;
    self
  }

  /// Sets the idle time after which uncached file statistics are purged.
  pub fn purge_delta(mut self, ticks: u64) -> Self {
    self.config.purge_delta = ticks;
    self
  }

  pub fn size_coefficient(mut self, mode: SizeCoefficient) -> Self {
    self.config.size_coefficient = mode;
    self
  }

  /// Uses the raw file size as reward coefficient.
  pub fn linear_size_coefficient(self) -> Self {
    self.size_coefficient(SizeCoefficient::Linear)
  }

  /// Uses a `[0, 1]` ramp over one standard deviation around the mean of
  /// `distribution`.
  pub fn normalized_size_coefficient(self, distribution: SizeDistribution) -> Self {
    self.size_coefficient(SizeCoefficient::normalized(distribution))
  }

  /// Seeds the environment's random generator. The seed is applied once.
  pub fn rng_seed(mut self, seed: u64) -> Self {
    self.config.rng_seed = seed;
    self
  }

  pub fn day_range(mut self, start: u32, end: u32) -> Self {
    self.config.day_range = DayRange { start, end };
    self
  }

  /// Sets the occupancy percentages that bound an eviction phase.
  pub fn watermarks(mut self, low: f64, high: f64) -> Self {
    self.config.low_watermark = low;
    self.config.high_watermark = high;
    self
  }

  /// Validates the configuration and builds the environment.
  pub fn build(self) -> Result<Environment, BuildError> {
    self.config.validate()?;
    Ok(Environment::from_config(self.config))
  }
}
