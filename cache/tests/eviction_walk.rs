mod common;

use common::{build_test_env, replay_request, set_features_from_stats};
use smartcache_env::{Action, DecisionKind, EnvBuilder, Phase};

#[test]
fn test_walk_visits_every_cached_file_once() {
  let mut env = build_test_env(10, 10);
  for file_id in 1..=6 {
    replay_request(&mut env, file_id, 10.0, file_id, Action::Keep);
  }
  replay_request(&mut env, 7, 10.0, 7, Action::Discard);

  assert_eq!(env.begin_eviction_walk(), 6);
  assert_eq!(env.phase(), Phase::Evicting);

  let mut visited = Vec::new();
  while let Some(file_id) = env.next_eviction_candidate() {
    visited.push(file_id);
  }
  visited.sort_unstable();
  assert_eq!(visited, vec![1, 2, 3, 4, 5, 6]);
  assert!(env.walk_exhausted());
  assert!(env.should_stop_eviction());

  env.end_eviction_walk();
  assert_eq!(env.phase(), Phase::Adding);
}

#[test]
fn test_walk_order_follows_seed() {
  let walk = |seed: u64| {
    let mut env = EnvBuilder::new()
      .capacity(1000.0)
      .add_horizon(5)
      .evict_horizon(5)
      .rng_seed(seed)
      .build()
      .unwrap();
    for file_id in 0..20 {
      replay_request(&mut env, file_id, 1.0, file_id, Action::Keep);
    }
    env.begin_eviction_walk();
    let order: Vec<_> = std::iter::from_fn(|| env.next_eviction_candidate()).collect();
    order
  };
  assert_eq!(walk(9), walk(9));
}

#[test]
fn test_evict_releases_bytes() {
  let mut env = build_test_env(10, 10);
  replay_request(&mut env, 1, 100.0, 0, Action::Keep);
  replay_request(&mut env, 2, 250.0, 1, Action::Keep);
  assert_eq!(env.state().occupied(), 350.0);

  assert!(env.evict(2).unwrap());
  assert!(!env.is_cached(2));
  assert!(env.is_known(2));
  assert_eq!(env.state().occupied(), 100.0);
  assert_eq!(env.state().deleted(), 250.0);

  assert!(!env.evict(2).unwrap(), "already evicted");
  assert_eq!(env.state().deleted(), 250.0);
}

#[test]
fn test_walk_skips_files_evicted_meanwhile() {
  let mut env = build_test_env(10, 10);
  replay_request(&mut env, 1, 10.0, 0, Action::Keep);
  replay_request(&mut env, 2, 10.0, 1, Action::Keep);

  env.begin_eviction_walk();
  let first = env.next_eviction_candidate().unwrap();
  let other = if first == 1 { 2 } else { 1 };
  env.evict(other).unwrap();
  assert!(env.next_eviction_candidate().is_none());
}

#[test]
fn test_watermarks() {
  let mut env = EnvBuilder::new()
    .capacity(1000.0)
    .add_horizon(5)
    .evict_horizon(5)
    .watermarks(20.0, 50.0)
    .build()
    .unwrap();
  replay_request(&mut env, 1, 400.0, 0, Action::Keep);
  assert!(!env.should_start_eviction(100.0));
  assert!(env.should_start_eviction(700.0), "next request would overflow");

  replay_request(&mut env, 2, 200.0, 1, Action::Keep);
  assert!(env.should_start_eviction(0.0), "above the high watermark");

  env.begin_eviction_walk();
  assert!(!env.should_stop_eviction());
  env.evict(1).unwrap();
  assert!(!env.should_stop_eviction(), "20% is not below the low watermark");
  env.evict(2).unwrap();
  assert!(env.should_stop_eviction());
}

#[test]
fn test_eviction_phase_routes_decisions_to_evict_window() {
  let mut env = build_test_env(10, 10);
  replay_request(&mut env, 1, 10.0, 0, Action::Keep);
  assert_eq!(env.pending_count(DecisionKind::Add), 1);

  env.begin_eviction_walk();
  let candidate = env.next_eviction_candidate().unwrap();
  set_features_from_stats(&mut env, candidate, 0);
  env.record_decision(candidate, Action::Keep).unwrap();
  env.record_decision(candidate, Action::Keep).unwrap();
  env.end_eviction_walk();

  assert_eq!(env.pending_count(DecisionKind::Add), 1);
  assert_eq!(env.pending_count(DecisionKind::Evict), 2);
  let recurrences: Vec<u32> = env
    .window(DecisionKind::Evict)
    .pending_for(1)
    .iter()
    .map(|d| d.recurrences())
    .collect();
  assert_eq!(recurrences, vec![1, 0]);

  // Kept file requested again while the evict decisions are pending.
  replay_request(&mut env, 1, 10.0, 3, Action::Keep);
  env.set_tick(10);
  env.sweep_expired_decisions();
  let rewards: Vec<f32> = env.buffer(DecisionKind::Evict).iter().map(|t| t.reward()).collect();
  assert_eq!(rewards, vec![20.0, 10.0]);
}
