#![allow(dead_code)]

use smartcache_env::{Action, EnvBuilder, Environment, FileId, Tick};

/// A 1000-byte cache with linear size coefficients, so a file's reward
/// weight is simply its size.
pub fn build_test_env(add_horizon: u64, evict_horizon: u64) -> Environment {
  EnvBuilder::new()
    .capacity(1000.0)
    .add_horizon(add_horizon)
    .evict_horizon(evict_horizon)
    .purge_delta(10)
    .linear_size_coefficient()
    .rng_seed(7)
    .build()
    .unwrap()
}

/// Sets the feature snapshot the way a trace replayer would: from the file's
/// updated stats and the current cache-wide features.
pub fn set_features_from_stats(env: &mut Environment, file_id: FileId, tick: Tick) {
  let stats = env.get_stats(file_id).unwrap();
  let occupancy = env.occupancy_percent() as f32;
  let hit_rate = env.hit_rate() as f32;
  env.set_current_features(
    stats.size as f32,
    stats.frequency() as f32,
    stats.recency(tick) as f32,
    stats.content_type as f32,
    occupancy,
    hit_rate,
  );
}

/// Replays one trace request through the full per-request sequence and
/// returns whether the file was added. Features see the recency since the
/// previous request; the committed stats are stamped with `tick`.
pub fn replay_request(env: &mut Environment, file_id: FileId, size: f64, tick: Tick, action: Action) -> bool {
  let is_hit = env.is_cached(file_id);
  let mut stats = env.register_request(file_id, is_hit, size, 0, tick);
  env.set_current_features(
    stats.size as f32,
    stats.frequency() as f32,
    stats.recency(tick) as f32,
    stats.content_type as f32,
    env.occupancy_percent() as f32,
    env.hit_rate() as f32,
  );
  env.record_decision(file_id, action).unwrap();
  stats.last_request = tick;
  let added = env.apply_policy_decision(file_id, stats, is_hit, action);
  env.finalize_request(&stats, is_hit, added);
  added
}
