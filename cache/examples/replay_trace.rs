use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smartcache_env::{Action, DecisionKind, EnvBuilder};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  // A 50 GB cache, decisions resolved after 500 requests.
  let mut env = EnvBuilder::new()
    .capacity(50_000.0)
    .add_horizon(500)
    .evict_horizon(500)
    .purge_delta(2_000)
    .rng_seed(2019)
    .day_range(0, 3)
    .build()
    .expect("Failed to build environment");

  // A stand-in for the trace replayer and the policy network.
  let mut trace_rng = StdRng::seed_from_u64(1);
  let requests_per_day = 2_000u64;
  let mut tick = 0u64;

  while !env.is_finished() {
    for _ in 0..requests_per_day {
      let file_id = trace_rng.random_range(0..400u64);
      let size = 100.0 + (file_id % 50) as f64 * 40.0;

      if env.should_start_eviction(size) {
        env.begin_eviction_walk();
        while !env.should_stop_eviction() {
          let Some(candidate) = env.next_eviction_candidate() else {
            break;
          };
          let stats = env.get_stats(candidate).expect("cached files have stats");
          env.set_current_features(
            stats.size as f32,
            stats.frequency() as f32,
            stats.recency(tick) as f32,
            stats.content_type as f32,
            env.occupancy_percent() as f32,
            env.hit_rate() as f32,
          );
          let action = if stats.frequency() < 3 { Action::Discard } else { Action::Keep };
          env.record_decision(candidate, action).expect("features are set");
          if action == Action::Discard {
            env.evict(candidate).expect("candidate is known");
          }
        }
        env.end_eviction_walk();
      }

      let is_hit = env.is_cached(file_id);
      let mut stats = env.register_request(file_id, is_hit, size, (file_id % 2) as u32, tick);
      env.set_current_features(
        stats.size as f32,
        stats.frequency() as f32,
        stats.recency(tick) as f32,
        stats.content_type as f32,
        env.occupancy_percent() as f32,
        env.hit_rate() as f32,
      );
      let action = if trace_rng.random_bool(0.7) { Action::Keep } else { Action::Discard };
      env.record_decision(file_id, action).expect("features are set");
      stats.last_request = tick;
      let added = env.apply_policy_decision(file_id, stats, is_hit, action);
      env.finalize_request(&stats, is_hit, added);

      env.sweep_expired_decisions();
      env.bound_buffer(DecisionKind::Add, 10_000);
      env.bound_buffer(DecisionKind::Evict, 10_000);
      tick += 1;
    }

    env.purge_stats(tick);
    let day = env.advance_day();
    println!("{day:#?}");

    if env.add_buffer_size() > 0 {
      let batch = env.sample_batch(4, DecisionKind::Add).expect("buffer is not empty");
      println!("sampled add transitions: {:?}", batch.iter().map(|t| t.reward()).collect::<Vec<_>>());
    }
  }

  println!("\nfinal state: {env:#?}");
}
