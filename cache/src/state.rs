use crate::error::{EnvError, Result};
use crate::stats::{FileStats, StatsStore};
use crate::window::{Action, DecisionKind};
use crate::{FileId, Tick};

use ahash::AHashSet;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Aggregate cache counters plus the set of files currently held.
///
/// The cache holds no content. It only tracks membership and byte volumes so
/// that occupancy and hit-rate features can be computed for the policy.
pub struct CacheState {
  stats: StatsStore,
  cached: AHashSet<FileId>,

  // --- Occupancy ---
  occupied: f64,
  capacity: f64,
  high_watermark: f64,
  low_watermark: f64,

  // --- Hit/Miss ---
  hits: u64,
  misses: u64,

  // --- Byte volumes ---
  written: f64,
  deleted: f64,
  read: f64,
  read_on_hit: f64,
  read_on_miss: f64,

  // --- Rewards resolved since the last daily reset ---
  rewards_add: Vec<f32>,
  rewards_evict: Vec<f32>,
}

impl fmt::Debug for CacheState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheState")
      .field("cached_files", &self.cached.len())
      .field("known_files", &self.stats.len())
      .field("occupied", &self.occupied)
      .field("capacity", &self.capacity)
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .finish_non_exhaustive()
  }
}

impl CacheState {
  /// Creates an empty cache. `capacity` must be positive; the builder
  /// guarantees this.
  pub fn new(capacity: f64, high_watermark: f64, low_watermark: f64) -> Self {
    Self {
      stats: StatsStore::new(),
      cached: AHashSet::new(),
      occupied: 0.0,
      capacity,
      high_watermark,
      low_watermark,
      hits: 0,
      misses: 0,
      written: 0.0,
      deleted: 0.0,
      read: 0.0,
      read_on_hit: 0.0,
      read_on_miss: 0.0,
      rewards_add: Vec::new(),
      rewards_evict: Vec::new(),
    }
  }

  /// Occupied bytes as a percentage of capacity.
  #[inline]
  pub fn occupancy_percent(&self) -> f64 {
    self.occupied / self.capacity * 100.0
  }

  /// `hits / (hits + misses)`, or 0 while there have been no hits at all.
  #[inline]
  pub fn hit_rate(&self) -> f64 {
    if self.hits != 0 {
      self.hits as f64 / (self.hits + self.misses) as f64
    } else {
      0.0
    }
  }

  /// Looks up (or creates) the file's record and counts this request on a
  /// copy of it. The copy is not stored until
  /// [`apply_policy_decision`](Self::apply_policy_decision).
  pub fn register_request(&mut self, file_id: FileId, is_hit: bool, size: f64, content_type: u32, tick: Tick) -> FileStats {
    let (mut stats, _) = self.stats.get_or_create(file_id, size, content_type, tick);
    if is_hit {
      stats.hits += 1;
    } else {
      stats.misses += 1;
    }
    stats
  }

  /// Commits `stats` and applies the policy's action. Returns `true` only
  /// when a missed file was admitted.
  ///
  /// A hit never changes membership: both `Keep` and `Discard` on a hit are
  /// no-ops that report `false`.
  pub fn apply_policy_decision(&mut self, file_id: FileId, stats: FileStats, is_hit: bool, action: Action) -> bool {
    self.stats.record_outcome(file_id, stats);
    match (is_hit, action) {
      (false, Action::Keep) => {
        self.cached.insert(file_id);
        true
      }
      (false, Action::Discard) => false,
      (true, Action::Keep) => false,
      (true, Action::Discard) => {
        tracing::debug!(file_id, "discard requested on a cache hit; ignoring");
        false
      }
    }
  }

  /// Accounts one finished request in the hit/miss and byte counters.
  pub fn finalize_request(&mut self, stats: &FileStats, is_hit: bool, added: bool) {
    if is_hit {
      self.hits += 1;
      self.read_on_hit += stats.size;
    } else {
      self.misses += 1;
      self.read_on_miss += stats.size;
    }
    if added {
      self.occupied += stats.size;
      self.written += stats.size;
    }
    self.read += stats.size;
  }

  /// Removes a cached file and releases its bytes.
  ///
  /// Returns `Ok(false)` when the file is known but not cached.
  pub fn evict(&mut self, file_id: FileId) -> Result<bool> {
    let size = self.stats.get(file_id).ok_or(EnvError::UnknownFile(file_id))?.size;
    if !self.cached.remove(&file_id) {
      return Ok(false);
    }
    self.occupied = (self.occupied - size).max(0.0);
    self.deleted += size;
    Ok(true)
  }

  fn mean_over_cached(&self, value: impl Fn(&FileStats) -> f64) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for stats in self.cached.iter().filter_map(|file_id| self.stats.get(*file_id)) {
      sum += value(stats);
      count += 1;
    }
    if count == 0 {
      0.0
    } else {
      sum / count as f64
    }
  }

  pub fn mean_recency(&self, now: Tick) -> f64 {
    self.mean_over_cached(|stats| stats.recency(now) as f64)
  }

  pub fn mean_frequency(&self) -> f64 {
    self.mean_over_cached(|stats| stats.frequency() as f64)
  }

  pub fn mean_size(&self) -> f64 {
    self.mean_over_cached(|stats| stats.size)
  }

  /// Purges stale statistics of uncached files. Returns the number removed.
  pub fn purge(&mut self, now: Tick, purge_delta: u64) -> usize {
    self.stats.purge(now, purge_delta, &self.cached)
  }

  pub(crate) fn record_reward(&mut self, kind: DecisionKind, reward: f32) {
    match kind {
      DecisionKind::Add => self.rewards_add.push(reward),
      DecisionKind::Evict => self.rewards_evict.push(reward),
    }
  }

  /// Rewards resolved since the last daily reset, in resolution order.
  pub fn rewards(&self, kind: DecisionKind) -> &[f32] {
    match kind {
      DecisionKind::Add => &self.rewards_add,
      DecisionKind::Evict => &self.rewards_evict,
    }
  }

  /// Snapshot of the per-day counters.
  pub fn daily_stats(&self, day: u32) -> DailyStats {
    DailyStats {
      day,
      occupied: self.occupied,
      occupancy_percent: self.occupancy_percent(),
      hit_rate_percent: self.hit_rate() * 100.0,
      hits: self.hits,
      misses: self.misses,
      written: self.written,
      read: self.read,
      read_on_hit: self.read_on_hit,
      read_on_miss: self.read_on_miss,
      deleted: self.deleted,
      add_rewards: RewardSummary::of(&self.rewards_add),
      evict_rewards: RewardSummary::of(&self.rewards_evict),
    }
  }

  /// Zeroes the per-day counters. Occupancy and membership carry over.
  pub fn reset_daily(&mut self) {
    self.hits = 0;
    self.misses = 0;
    self.written = 0.0;
    self.deleted = 0.0;
    self.read = 0.0;
    self.read_on_hit = 0.0;
    self.read_on_miss = 0.0;
    self.rewards_add.clear();
    self.rewards_evict.clear();
  }

  // --- Accessors ---

  pub fn is_cached(&self, file_id: FileId) -> bool {
    self.cached.contains(&file_id)
  }

  pub fn is_known(&self, file_id: FileId) -> bool {
    self.stats.contains(file_id)
  }

  pub fn stats(&self) -> &StatsStore {
    &self.stats
  }

  pub fn cached_files(&self) -> impl Iterator<Item = FileId> + '_ {
    self.cached.iter().copied()
  }

  pub fn cached_len(&self) -> usize {
    self.cached.len()
  }

  pub fn occupied(&self) -> f64 {
    self.occupied
  }

  pub fn capacity(&self) -> f64 {
    self.capacity
  }

  pub fn hits(&self) -> u64 {
    self.hits
  }

  pub fn misses(&self) -> u64 {
    self.misses
  }

  pub fn written(&self) -> f64 {
    self.written
  }

  pub fn deleted(&self) -> f64 {
    self.deleted
  }

  pub fn read(&self) -> f64 {
    self.read
  }

  pub fn read_on_hit(&self) -> f64 {
    self.read_on_hit
  }

  pub fn read_on_miss(&self) -> f64 {
    self.read_on_miss
  }

  pub fn high_watermark(&self) -> f64 {
    self.high_watermark
  }

  pub fn low_watermark(&self) -> f64 {
    self.low_watermark
  }
}

/// Count and mean of the rewards resolved during a day.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RewardSummary {
  pub count: usize,
  pub mean: f64,
}

impl RewardSummary {
  fn of(rewards: &[f32]) -> Self {
    if rewards.is_empty() {
      return Self::default();
    }
    let sum: f64 = rewards.iter().map(|r| *r as f64).sum();
    Self {
      count: rewards.len(),
      mean: sum / rewards.len() as f64,
    }
  }
}

/// A point-in-time snapshot of one simulated day's counters.
///
/// The environment does not persist these; callers write them wherever they
/// keep run statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DailyStats {
  pub day: u32,
  pub occupied: f64,
  pub occupancy_percent: f64,
  pub hit_rate_percent: f64,
  pub hits: u64,
  pub misses: u64,
  pub written: f64,
  pub read: f64,
  pub read_on_hit: f64,
  pub read_on_miss: f64,
  pub deleted: f64,
  pub add_rewards: RewardSummary,
  pub evict_rewards: RewardSummary,
}
