//! Delayed-reward bookkeeping for add and evict decisions.
//!
//! A decision cannot be scored when it is made: whether admitting (or
//! evicting) a file was a good idea depends on the requests that follow. A
//! [`DecisionWindow`] keeps every outstanding decision, counts how often its
//! file is requested again, and once the decision's horizon has elapsed
//! resolves it into a finished [`Transition`].

use crate::config::SizeCoefficient;
use crate::replay::Transition;
use crate::{FileId, Tick};

use ahash::AHashMap;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of features in a state vector.
pub const FEATURE_LEN: usize = 6;

/// The binary action chosen by the policy.
///
/// For add-decisions `Keep` admits the missed file and `Discard` skips it.
/// For evict-decisions `Keep` leaves the file cached and `Discard` evicts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Action {
  Keep = 0,
  Discard = 1,
}

impl Action {
  /// Decodes the policy's output index.
  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(Action::Keep),
      1 => Some(Action::Discard),
      _ => None,
    }
  }

  #[inline]
  pub fn code(self) -> u8 {
    self as u8
  }

  /// +1 for `Keep`, -1 for `Discard`.
  #[inline]
  fn sign(self) -> f32 {
    match self {
      Action::Keep => 1.0,
      Action::Discard => -1.0,
    }
  }
}

/// Which of the two decision streams something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum DecisionKind {
  Add,
  Evict,
}

impl fmt::Display for DecisionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DecisionKind::Add => write!(f, "add"),
      DecisionKind::Evict => write!(f, "evict"),
    }
  }
}

/// The state a policy saw when it made a decision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureSnapshot {
  pub size: f32,
  pub frequency: f32,
  pub recency: f32,
  pub content_type: f32,
  /// Cache occupancy as a percentage (0-100), the scale of
  /// [`Environment::occupancy_percent`](crate::Environment::occupancy_percent).
  /// Sweeps fill the next state on this scale, so callers must use it too.
  pub occupancy: f32,
  /// Hit ratio in `[0, 1]`.
  pub hit_rate: f32,
}

impl FeatureSnapshot {
  pub fn new(size: f32, frequency: f32, recency: f32, content_type: f32, occupancy: f32, hit_rate: f32) -> Self {
    Self {
      size,
      frequency,
      recency,
      content_type,
      occupancy,
      hit_rate,
    }
  }

  pub fn to_array(&self) -> [f32; FEATURE_LEN] {
    [
      self.size,
      self.frequency,
      self.recency,
      self.content_type,
      self.occupancy,
      self.hit_rate,
    ]
  }

  /// The state that follows this one: the file's own features carry over with
  /// one more request counted, the cache-wide features are replaced.
  fn successor(&self, occupancy: f32, hit_rate: f32) -> Self {
    Self {
      frequency: self.frequency + 1.0,
      occupancy,
      hit_rate,
      ..*self
    }
  }
}

/// A decision awaiting its reward.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDecision {
  tick: Tick,
  features: FeatureSnapshot,
  recurrences: u32,
  action: Action,
}

impl PendingDecision {
  fn new(tick: Tick, features: FeatureSnapshot, action: Action) -> Self {
    Self {
      tick,
      features,
      recurrences: 0,
      action,
    }
  }

  pub fn tick(&self) -> Tick {
    self.tick
  }

  pub fn features(&self) -> &FeatureSnapshot {
    &self.features
  }

  pub fn action(&self) -> Action {
    self.action
  }

  /// Requests of the same file observed while this decision was pending.
  pub fn recurrences(&self) -> u32 {
    self.recurrences
  }

  #[inline]
  fn is_expired(&self, now: Tick, horizon: u64) -> bool {
    now.saturating_sub(self.tick) >= horizon
  }

  /// The size-weighted final reward.
  ///
  /// Recurrences reward `Keep` and penalize `Discard` proportionally; a
  /// decision whose file never came back is scored the other way round with
  /// unit magnitude.
  pub fn final_reward(&self, mode: &SizeCoefficient) -> f32 {
    let coefficient = mode.coefficient(self.features.size);
    let sign = self.action.sign();
    if self.recurrences != 0 {
      sign * self.recurrences as f32 * coefficient
    } else {
      -sign * coefficient
    }
  }

  fn resolve(self, mode: &SizeCoefficient, occupancy: f32, hit_rate: f32) -> Transition {
    let reward = self.final_reward(mode);
    let next = self.features.successor(occupancy, hit_rate);
    Transition::new(&self.features, self.action, reward, &next)
  }
}

/// Outstanding decisions of one kind, grouped by file.
///
/// A file's list is kept in registration order and is never left empty: the
/// entry is removed together with its last decision.
#[derive(Debug)]
pub struct DecisionWindow {
  kind: DecisionKind,
  horizon: u64,
  pending: AHashMap<FileId, Vec<PendingDecision>>,
}

impl DecisionWindow {
  pub fn new(kind: DecisionKind, horizon: u64) -> Self {
    Self {
      kind,
      horizon,
      pending: AHashMap::new(),
    }
  }

  /// Opens a new decision for `file_id`.
  ///
  /// Every decision already pending for the file counts this as a recurrence
  /// first, so a repeat decision is evidence for the earlier ones.
  pub fn register(&mut self, file_id: FileId, tick: Tick, features: FeatureSnapshot, action: Action) {
    let touched = self.touch(file_id, tick);
    self
      .pending
      .entry(file_id)
      .or_default()
      .push(PendingDecision::new(tick, features, action));
    tracing::trace!(kind = %self.kind, file_id, tick, touched, action = action.code(), "decision registered");
  }

  /// Counts a request of `file_id` against its live pending decisions.
  /// Decisions already past their horizon are left for the next sweep.
  /// Returns how many decisions were credited.
  pub fn touch(&mut self, file_id: FileId, tick: Tick) -> usize {
    let horizon = self.horizon;
    match self.pending.get_mut(&file_id) {
      Some(list) => {
        let mut touched = 0;
        for decision in list.iter_mut().filter(|d| !d.is_expired(tick, horizon)) {
          decision.recurrences += 1;
          touched += 1;
        }
        touched
      }
      None => 0,
    }
  }

  /// Resolves every decision whose horizon has elapsed at `now`.
  ///
  /// `occupancy` and `hit_rate` are the current cache-wide features used for
  /// the next state. Transitions come out ordered by file id, then by
  /// registration order.
  pub fn sweep(&mut self, now: Tick, mode: &SizeCoefficient, occupancy: f32, hit_rate: f32) -> Vec<Transition> {
    let horizon = self.horizon;
    let mut expired_files: Vec<FileId> = self
      .pending
      .iter()
      .filter(|(_, list)| list.iter().any(|d| d.is_expired(now, horizon)))
      .map(|(file_id, _)| *file_id)
      .collect();
    expired_files.sort_unstable();

    let mut resolved = Vec::new();
    for file_id in expired_files {
      let Some(list) = self.pending.remove(&file_id) else {
        continue;
      };
      let (expired, live): (Vec<_>, Vec<_>) = list.into_iter().partition(|d| d.is_expired(now, horizon));
      for decision in expired {
        let transition = decision.resolve(mode, occupancy, hit_rate);
        tracing::trace!(kind = %self.kind, file_id, reward = transition.reward(), "decision resolved");
        resolved.push(transition);
      }
      if !live.is_empty() {
        self.pending.insert(file_id, live);
      }
    }
    resolved
  }

  /// Decisions pending for one file, oldest first.
  pub fn pending_for(&self, file_id: FileId) -> &[PendingDecision] {
    self.pending.get(&file_id).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn contains_file(&self, file_id: FileId) -> bool {
    self.pending.contains_key(&file_id)
  }

  /// Number of files with at least one pending decision.
  pub fn file_count(&self) -> usize {
    self.pending.len()
  }

  /// Total number of pending decisions.
  pub fn len(&self) -> usize {
    self.pending.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }

  pub fn kind(&self) -> DecisionKind {
    self.kind
  }

  pub fn horizon(&self) -> u64 {
    self.horizon
  }
}
