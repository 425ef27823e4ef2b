use crate::error::{EnvError, Result};
use crate::window::{Action, DecisionKind, FeatureSnapshot, FEATURE_LEN};

use rand::Rng;
use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width of a flattened transition: state, action, reward, next state.
pub const TRANSITION_LEN: usize = 2 * FEATURE_LEN + 2;

const ACTION_INDEX: usize = FEATURE_LEN;
const REWARD_INDEX: usize = FEATURE_LEN + 1;
const NEXT_STATE_INDEX: usize = FEATURE_LEN + 2;

/// A finished training record laid out as
/// `[state(6), action(1), reward(1), next_state(6)]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transition([f32; TRANSITION_LEN]);

impl Transition {
  pub fn new(state: &FeatureSnapshot, action: Action, reward: f32, next: &FeatureSnapshot) -> Self {
    let mut values = [0.0; TRANSITION_LEN];
    values[..FEATURE_LEN].copy_from_slice(&state.to_array());
    values[ACTION_INDEX] = action.code() as f32;
    values[REWARD_INDEX] = reward;
    values[NEXT_STATE_INDEX..].copy_from_slice(&next.to_array());
    Self(values)
  }

  pub fn state(&self) -> &[f32] {
    &self.0[..FEATURE_LEN]
  }

  pub fn action(&self) -> f32 {
    self.0[ACTION_INDEX]
  }

  pub fn reward(&self) -> f32 {
    self.0[REWARD_INDEX]
  }

  pub fn next_state(&self) -> &[f32] {
    &self.0[NEXT_STATE_INDEX..]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.0
  }

  pub fn into_array(self) -> [f32; TRANSITION_LEN] {
    self.0
  }
}

/// An ordered pool of finished transitions for one decision kind.
///
/// Records are only removed oldest-first; sampling leaves the buffer intact.
#[derive(Debug)]
pub struct ReplayBuffer {
  kind: DecisionKind,
  records: VecDeque<Transition>,
}

impl ReplayBuffer {
  pub fn new(kind: DecisionKind) -> Self {
    Self {
      kind,
      records: VecDeque::new(),
    }
  }

  pub fn append(&mut self, record: Transition) {
    self.records.push_back(record);
  }

  /// Draws `n` records uniformly at random, with replacement.
  pub fn sample_batch<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<Transition>> {
    if self.records.is_empty() {
      return Err(EnvError::EmptyReplayBuffer(self.kind));
    }
    let len = self.records.len();
    Ok((0..n).map(|_| self.records[rng.random_range(0..len)]).collect())
  }

  pub fn pop_oldest(&mut self) -> Option<Transition> {
    self.records.pop_front()
  }

  /// Pops oldest records until at most `max_len` remain. Returns the number
  /// dropped.
  pub fn truncate_front(&mut self, max_len: usize) -> usize {
    let excess = self.records.len().saturating_sub(max_len);
    self.records.drain(..excess);
    excess
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn kind(&self) -> DecisionKind {
    self.kind
  }

  pub fn iter(&self) -> impl Iterator<Item = &Transition> {
    self.records.iter()
  }
}
