use crate::builder::EnvBuilder;
use crate::config::EnvConfig;
use crate::error::{EnvError, Result};
use crate::replay::{ReplayBuffer, Transition};
use crate::state::{CacheState, DailyStats};
use crate::stats::FileStats;
use crate::window::{Action, DecisionKind, DecisionWindow, FeatureSnapshot};
use crate::{FileId, Tick};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// What the external driver is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Replaying trace requests and deciding whether to admit misses.
  Adding,
  /// Walking the cached files and deciding whether to evict them.
  Evicting,
}

/// The simulation environment driven request-by-request by a trace replayer.
///
/// It owns the cache state, one decision window and one replay buffer per
/// decision kind, and the single random generator used for sampling.
pub struct Environment {
  config: EnvConfig,
  cache: CacheState,
  add_window: DecisionWindow,
  evict_window: DecisionWindow,
  add_buffer: ReplayBuffer,
  evict_buffer: ReplayBuffer,
  rng: StdRng,

  phase: Phase,
  tick: Tick,
  current_day: u32,
  current_features: Option<FeatureSnapshot>,

  eviction_walk: Vec<FileId>,
  walk_cursor: usize,
}

impl std::fmt::Debug for Environment {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Environment")
      .field("phase", &self.phase)
      .field("tick", &self.tick)
      .field("current_day", &self.current_day)
      .field("cache", &self.cache)
      .field("pending_add", &self.add_window.len())
      .field("pending_evict", &self.evict_window.len())
      .field("add_buffer", &self.add_buffer.len())
      .field("evict_buffer", &self.evict_buffer.len())
      .finish_non_exhaustive()
  }
}

impl Environment {
  pub fn builder() -> EnvBuilder {
    EnvBuilder::new()
  }

  /// Callers go through [`EnvBuilder::build`], which validates `config`.
  pub(crate) fn from_config(config: EnvConfig) -> Self {
    tracing::info!(
      capacity = config.cache_capacity,
      add_horizon = config.add_horizon,
      evict_horizon = config.evict_horizon,
      purge_delta = config.purge_delta,
      seed = config.rng_seed,
      "environment created"
    );
    Self {
      cache: CacheState::new(config.cache_capacity, config.high_watermark, config.low_watermark),
      add_window: DecisionWindow::new(DecisionKind::Add, config.add_horizon),
      evict_window: DecisionWindow::new(DecisionKind::Evict, config.evict_horizon),
      add_buffer: ReplayBuffer::new(DecisionKind::Add),
      evict_buffer: ReplayBuffer::new(DecisionKind::Evict),
      rng: StdRng::seed_from_u64(config.rng_seed),
      phase: Phase::Adding,
      tick: 0,
      current_day: config.day_range.start,
      current_features: None,
      eviction_walk: Vec::new(),
      walk_cursor: 0,
      config,
    }
  }

  // --- Per-request entry points ---

  /// Counts a request of `file_id` at `tick` and makes `tick` current.
  /// The returned stats are committed by [`apply_policy_decision`](Self::apply_policy_decision).
  pub fn register_request(&mut self, file_id: FileId, is_hit: bool, size: f64, content_type: u32, tick: Tick) -> FileStats {
    self.tick = tick;
    self.cache.register_request(file_id, is_hit, size, content_type, tick)
  }

  /// Commits the request's stats and applies the admission action. Returns
  /// `true` when a missed file was added to the cache.
  pub fn apply_policy_decision(&mut self, file_id: FileId, stats: FileStats, is_hit: bool, action: Action) -> bool {
    self.cache.apply_policy_decision(file_id, stats, is_hit, action)
  }

  pub fn finalize_request(&mut self, stats: &FileStats, is_hit: bool, added: bool) {
    self.cache.finalize_request(stats, is_hit, added);
  }

  /// Sets the state the next recorded decision is made from.
  pub fn set_current_features(&mut self, size: f32, frequency: f32, recency: f32, content_type: f32, occupancy: f32, hit_rate: f32) {
    self.set_features(FeatureSnapshot::new(size, frequency, recency, content_type, occupancy, hit_rate));
  }

  pub fn set_features(&mut self, features: FeatureSnapshot) {
    self.current_features = Some(features);
  }

  pub fn current_features(&self) -> Option<&FeatureSnapshot> {
    self.current_features.as_ref()
  }

  /// Records the policy's decision for `file_id` at the current tick, using
  /// the current feature snapshot.
  ///
  /// While adding, the decision opens in the add window and the request
  /// also counts against any evict-decisions still pending for the file.
  /// While evicting, it opens in the evict window.
  pub fn record_decision(&mut self, file_id: FileId, action: Action) -> Result<()> {
    let features = self.current_features.ok_or(EnvError::FeaturesNotSet)?;
    match self.phase {
      Phase::Adding => {
        self.add_window.register(file_id, self.tick, features, action);
        self.evict_window.touch(file_id, self.tick);
      }
      Phase::Evicting => {
        self.evict_window.register(file_id, self.tick, features, action);
      }
    }
    Ok(())
  }

  // --- Maintenance ---

  /// Resolves every decision whose horizon has elapsed into its replay
  /// buffer. Returns the number of transitions produced.
  pub fn sweep_expired_decisions(&mut self) -> usize {
    let occupancy = self.cache.occupancy_percent() as f32;
    let hit_rate = self.cache.hit_rate() as f32;
    let mode = self.config.size_coefficient;

    let added = self.add_window.sweep(self.tick, &mode, occupancy, hit_rate);
    let evicted = self.evict_window.sweep(self.tick, &mode, occupancy, hit_rate);
    let resolved = added.len() + evicted.len();

    for transition in added {
      self.cache.record_reward(DecisionKind::Add, transition.reward());
      self.add_buffer.append(transition);
    }
    for transition in evicted {
      self.cache.record_reward(DecisionKind::Evict, transition.reward());
      self.evict_buffer.append(transition);
    }

    if resolved > 0 {
      tracing::debug!(tick = self.tick, resolved, "swept expired decisions");
    }
    resolved
  }

  /// Drops statistics of uncached files idle for more than the configured
  /// purge delta. Returns the number of records removed.
  pub fn purge_stats(&mut self, current_tick: Tick) -> usize {
    let removed = self.cache.purge(current_tick, self.config.purge_delta);
    tracing::info!(
      tick = current_tick,
      removed,
      remaining = self.cache.stats().len(),
      "purged file statistics"
    );
    removed
  }

  // --- Queries ---

  pub fn is_known(&self, file_id: FileId) -> bool {
    self.cache.is_known(file_id)
  }

  pub fn is_cached(&self, file_id: FileId) -> bool {
    self.cache.is_cached(file_id)
  }

  pub fn get_stats(&self, file_id: FileId) -> Result<FileStats> {
    self.cache.stats().get(file_id).copied().ok_or(EnvError::UnknownFile(file_id))
  }

  pub fn add_buffer_size(&self) -> usize {
    self.add_buffer.len()
  }

  pub fn evict_buffer_size(&self) -> usize {
    self.evict_buffer.len()
  }

  pub fn buffer(&self, which: DecisionKind) -> &ReplayBuffer {
    match which {
      DecisionKind::Add => &self.add_buffer,
      DecisionKind::Evict => &self.evict_buffer,
    }
  }

  fn buffer_mut(&mut self, which: DecisionKind) -> &mut ReplayBuffer {
    match which {
      DecisionKind::Add => &mut self.add_buffer,
      DecisionKind::Evict => &mut self.evict_buffer,
    }
  }

  /// Samples `n` transitions with replacement from the chosen buffer.
  pub fn sample_batch(&mut self, n: usize, which: DecisionKind) -> Result<Vec<Transition>> {
    let buffer = match which {
      DecisionKind::Add => &self.add_buffer,
      DecisionKind::Evict => &self.evict_buffer,
    };
    buffer.sample_batch(n, &mut self.rng)
  }

  pub fn pop_oldest(&mut self, which: DecisionKind) -> Option<Transition> {
    self.buffer_mut(which).pop_oldest()
  }

  /// Drops the oldest transitions of `which` until at most `max_len` remain.
  pub fn bound_buffer(&mut self, which: DecisionKind, max_len: usize) -> usize {
    self.buffer_mut(which).truncate_front(max_len)
  }

  pub fn window(&self, which: DecisionKind) -> &DecisionWindow {
    match which {
      DecisionKind::Add => &self.add_window,
      DecisionKind::Evict => &self.evict_window,
    }
  }

  /// Number of decisions of `which` still awaiting resolution.
  pub fn pending_count(&self, which: DecisionKind) -> usize {
    self.window(which).len()
  }

  pub fn occupancy_percent(&self) -> f64 {
    self.cache.occupancy_percent()
  }

  pub fn hit_rate(&self) -> f64 {
    self.cache.hit_rate()
  }

  pub fn mean_recency(&self) -> f64 {
    self.cache.mean_recency(self.tick)
  }

  pub fn mean_frequency(&self) -> f64 {
    self.cache.mean_frequency()
  }

  pub fn mean_size(&self) -> f64 {
    self.cache.mean_size()
  }

  pub fn config(&self) -> &EnvConfig {
    &self.config
  }

  pub fn state(&self) -> &CacheState {
    &self.cache
  }

  // --- Time ---

  pub fn tick(&self) -> Tick {
    self.tick
  }

  pub fn set_tick(&mut self, tick: Tick) {
    self.tick = tick;
  }

  pub fn advance_tick(&mut self) -> Tick {
    self.tick += 1;
    self.tick
  }

  pub fn current_day(&self) -> u32 {
    self.current_day
  }

  pub fn is_finished(&self) -> bool {
    self.current_day >= self.config.day_range.end
  }

  pub fn daily_stats(&self) -> DailyStats {
    self.cache.daily_stats(self.current_day)
  }

  /// Closes the current day: returns its statistics, resets the daily
  /// counters and moves to the next day.
  pub fn advance_day(&mut self) -> DailyStats {
    let stats = self.daily_stats();
    tracing::info!(
      day = stats.day,
      hit_rate = stats.hit_rate_percent,
      occupancy = stats.occupancy_percent,
      add_rewards = stats.add_rewards.count,
      evict_rewards = stats.evict_rewards.count,
      "day finished"
    );
    self.cache.reset_daily();
    self.current_day += 1;
    stats
  }

  // --- Eviction ---

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn set_phase(&mut self, phase: Phase) {
    self.phase = phase;
  }

  /// Removes a cached file. Returns `Ok(false)` if the file is not cached.
  pub fn evict(&mut self, file_id: FileId) -> Result<bool> {
    self.cache.evict(file_id)
  }

  /// True when occupancy is above the high watermark, or admitting
  /// `next_size` more bytes would overflow the cache.
  pub fn should_start_eviction(&self, next_size: f64) -> bool {
    let next_occupancy = (self.cache.occupied() + next_size) / self.cache.capacity() * 100.0;
    self.cache.occupancy_percent() > self.cache.high_watermark() || next_occupancy > 100.0
  }

  /// True when occupancy fell below the low watermark or the current walk
  /// has no candidates left.
  pub fn should_stop_eviction(&self) -> bool {
    self.cache.occupancy_percent() < self.cache.low_watermark() || self.walk_exhausted()
  }

  /// Switches to [`Phase::Evicting`] and prepares a shuffled walk over the
  /// cached files. Returns the number of candidates.
  pub fn begin_eviction_walk(&mut self) -> usize {
    let mut candidates: Vec<FileId> = self.cache.cached_files().collect();
    candidates.sort_unstable();
    candidates.shuffle(&mut self.rng);

    self.eviction_walk = candidates;
    self.walk_cursor = 0;
    self.phase = Phase::Evicting;
    tracing::debug!(
      candidates = self.eviction_walk.len(),
      occupancy = self.cache.occupancy_percent(),
      "eviction walk started"
    );
    self.eviction_walk.len()
  }

  /// The next file of the walk that is still cached.
  pub fn next_eviction_candidate(&mut self) -> Option<FileId> {
    while let Some(&file_id) = self.eviction_walk.get(self.walk_cursor) {
      self.walk_cursor += 1;
      if self.cache.is_cached(file_id) {
        return Some(file_id);
      }
    }
    None
  }

  pub fn walk_exhausted(&self) -> bool {
    self.eviction_walk[self.walk_cursor.min(self.eviction_walk.len())..]
      .iter()
      .all(|file_id| !self.cache.is_cached(*file_id))
  }

  /// Returns to [`Phase::Adding`] and forgets the walk.
  pub fn end_eviction_walk(&mut self) {
    tracing::debug!(
      visited = self.walk_cursor,
      occupancy = self.cache.occupancy_percent(),
      "eviction walk stopped"
    );
    self.eviction_walk.clear();
    self.walk_cursor = 0;
    self.phase = Phase::Adding;
  }
}
