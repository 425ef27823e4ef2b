mod common;

use common::{build_test_env, replay_request, set_features_from_stats};
use pretty_assertions::assert_eq;
use smartcache_env::{Action, DecisionKind, EnvBuilder, SizeBounds, SizeCoefficient};

#[test]
fn test_unused_admission_is_penalized_at_horizon() {
  let mut env = build_test_env(5, 5);
  assert!(replay_request(&mut env, 1, 100.0, 0, Action::Keep));

  env.set_tick(4);
  assert_eq!(env.sweep_expired_decisions(), 0, "horizon not reached yet");

  env.set_tick(5);
  assert_eq!(env.sweep_expired_decisions(), 1);
  assert_eq!(env.add_buffer_size(), 1);
  assert_eq!(env.evict_buffer_size(), 0);

  let record = env.pop_oldest(DecisionKind::Add).unwrap();
  assert_eq!(record.reward(), -100.0);
  assert_eq!(record.state()[0], 100.0);
  assert_eq!(record.action(), 0.0);
  // Frequency carried over plus one, cache-wide features refreshed.
  assert_eq!(record.next_state(), &[100.0, 2.0, 0.0, 0.0, 10.0, 0.0]);
}

#[test]
fn test_reused_admission_is_rewarded() {
  let mut env = build_test_env(5, 5);
  replay_request(&mut env, 1, 100.0, 0, Action::Keep);
  replay_request(&mut env, 1, 100.0, 2, Action::Keep);

  env.set_tick(5);
  assert_eq!(env.sweep_expired_decisions(), 1);
  let record = env.pop_oldest(DecisionKind::Add).unwrap();
  assert_eq!(record.reward(), 100.0);

  // The decision made at tick 2 is still pending.
  assert_eq!(env.pending_count(DecisionKind::Add), 1);
  assert_eq!(env.window(DecisionKind::Add).pending_for(1)[0].tick(), 2);
}

#[test]
fn test_skipped_file_that_returns_is_penalized() {
  let mut env = build_test_env(3, 3);
  assert!(!replay_request(&mut env, 4, 50.0, 0, Action::Discard));
  assert!(!replay_request(&mut env, 4, 50.0, 1, Action::Discard));

  env.set_tick(3);
  env.sweep_expired_decisions();
  let record = env.pop_oldest(DecisionKind::Add).unwrap();
  assert_eq!(record.action(), 1.0);
  assert_eq!(record.reward(), -50.0);
}

#[test]
fn test_eviction_of_file_requested_again_is_penalized() {
  let mut env = build_test_env(100, 5);
  replay_request(&mut env, 1, 100.0, 0, Action::Keep);

  assert_eq!(env.begin_eviction_walk(), 1);
  let candidate = env.next_eviction_candidate().unwrap();
  assert_eq!(candidate, 1);
  set_features_from_stats(&mut env, candidate, 0);
  env.record_decision(candidate, Action::Discard).unwrap();
  assert!(env.evict(candidate).unwrap());
  env.end_eviction_walk();

  replay_request(&mut env, 1, 100.0, 1, Action::Discard);
  replay_request(&mut env, 1, 100.0, 2, Action::Discard);

  env.set_tick(5);
  assert_eq!(env.sweep_expired_decisions(), 1);
  let record = env.pop_oldest(DecisionKind::Evict).unwrap();
  assert_eq!(record.action(), 1.0);
  assert_eq!(record.reward(), -200.0);
}

#[test]
fn test_eviction_of_idle_file_is_rewarded() {
  let mut env = build_test_env(100, 5);
  replay_request(&mut env, 1, 100.0, 0, Action::Keep);

  env.begin_eviction_walk();
  let candidate = env.next_eviction_candidate().unwrap();
  set_features_from_stats(&mut env, candidate, 0);
  env.record_decision(candidate, Action::Discard).unwrap();
  env.evict(candidate).unwrap();
  env.end_eviction_walk();

  env.set_tick(5);
  env.sweep_expired_decisions();
  let record = env.pop_oldest(DecisionKind::Evict).unwrap();
  assert_eq!(record.reward(), 100.0);
}

#[test]
fn test_sweep_leaves_no_empty_file_entries() {
  let mut env = build_test_env(4, 4);
  for (tick, file_id) in [(0, 1), (1, 2), (2, 1), (3, 3)] {
    replay_request(&mut env, file_id, 10.0, tick, Action::Keep);
  }

  env.set_tick(5);
  env.sweep_expired_decisions();
  let window = env.window(DecisionKind::Add);
  for file_id in [1, 2, 3] {
    assert_eq!(window.contains_file(file_id), !window.pending_for(file_id).is_empty());
  }
  assert!(!window.contains_file(2));
  assert_eq!(window.pending_for(1).len(), 1);

  env.set_tick(100);
  env.sweep_expired_decisions();
  assert!(env.window(DecisionKind::Add).is_empty());
  assert_eq!(env.add_buffer_size(), 4);
}

#[test]
fn test_resolved_decision_is_emitted_once() {
  let mut env = build_test_env(2, 2);
  replay_request(&mut env, 1, 10.0, 0, Action::Keep);
  env.set_tick(2);
  assert_eq!(env.sweep_expired_decisions(), 1);
  assert_eq!(env.sweep_expired_decisions(), 0);
  assert_eq!(env.add_buffer_size(), 1);
}

#[test]
fn test_normalized_coefficient_scales_rewards() {
  let mut env = EnvBuilder::new()
    .capacity(1000.0)
    .add_horizon(5)
    .evict_horizon(5)
    .size_coefficient(SizeCoefficient::Normalized(SizeBounds {
      liminf: 0.0,
      limsup: 200.0,
    }))
    .build()
    .unwrap();
  replay_request(&mut env, 1, 100.0, 0, Action::Keep);
  replay_request(&mut env, 2, 500.0, 0, Action::Keep);

  env.set_tick(5);
  env.sweep_expired_decisions();
  let rewards: Vec<f32> = env.buffer(DecisionKind::Add).iter().map(|t| t.reward()).collect();
  assert_eq!(rewards, vec![-0.5, -1.0]);
  assert_eq!(env.state().rewards(DecisionKind::Add), &[-0.5, -1.0]);
}

#[test]
fn test_record_decision_requires_features() {
  let mut env = build_test_env(5, 5);
  assert!(matches!(
    env.record_decision(1, Action::Keep),
    Err(smartcache_env::EnvError::FeaturesNotSet)
  ));
}
