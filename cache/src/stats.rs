use crate::{FileId, Tick};

use ahash::{AHashMap, AHashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Running statistics for a single file.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileStats {
  /// Size in bytes (or whatever unit the trace uses).
  pub size: f64,
  pub hits: u64,
  pub misses: u64,
  /// Tick of the most recent request. Stamped at creation; the request
  /// driver sets it to the current tick on the copy returned by
  /// `register_request` before committing it, after reading recency.
  pub last_request: Tick,
  pub content_type: u32,
}

impl FileStats {
  pub(crate) fn new(size: f64, content_type: u32, tick: Tick) -> Self {
    Self {
      size,
      hits: 0,
      misses: 0,
      last_request: tick,
      content_type,
    }
  }

  /// Total number of requests seen for this file.
  #[inline]
  pub fn frequency(&self) -> u64 {
    self.hits + self.misses
  }

  /// Ticks elapsed between the recorded request and `now`.
  #[inline]
  pub fn recency(&self, now: Tick) -> u64 {
    now.saturating_sub(self.last_request)
  }
}

/// Per-file statistics keyed by file id.
///
/// Entries are created on first request and only ever removed by [`purge`](Self::purge).
#[derive(Debug, Default)]
pub struct StatsStore {
  files: AHashMap<FileId, FileStats>,
}

impl StatsStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the stored record, inserting a fresh one if the file is new.
  ///
  /// `size` and `content_type` are only used on insertion. The boolean is
  /// `true` when a record was created.
  pub fn get_or_create(&mut self, file_id: FileId, size: f64, content_type: u32, tick: Tick) -> (FileStats, bool) {
    let mut created = false;
    let stats = *self.files.entry(file_id).or_insert_with(|| {
      created = true;
      FileStats::new(size, content_type, tick)
    });
    (stats, created)
  }

  /// Overwrites the record for `file_id` with a caller-updated copy.
  pub fn record_outcome(&mut self, file_id: FileId, stats: FileStats) {
    self.files.insert(file_id, stats);
  }

  pub fn get(&self, file_id: FileId) -> Option<&FileStats> {
    self.files.get(&file_id)
  }

  pub fn contains(&self, file_id: FileId) -> bool {
    self.files.contains_key(&file_id)
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  /// Drops every record that is not in `cached` and whose last request is
  /// more than `purge_delta` ticks before `now`. Returns the number removed.
  pub fn purge(&mut self, now: Tick, purge_delta: u64, cached: &AHashSet<FileId>) -> usize {
    let before = self.files.len();
    self
      .files
      .retain(|file_id, stats| cached.contains(file_id) || stats.recency(now) <= purge_delta);
    before - self.files.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_get_or_create_keeps_first_attributes() {
    let mut store = StatsStore::new();
    let (first, created) = store.get_or_create(7, 100.0, 1, 3);
    assert!(created);
    assert_eq!(first.last_request, 3);

    let (second, created) = store.get_or_create(7, 999.0, 0, 50);
    assert!(!created);
    assert_eq!(second, first);
  }

  #[test]
  fn test_purge_skips_cached_and_recent() {
    let mut store = StatsStore::new();
    store.get_or_create(1, 1.0, 0, 0);
    store.get_or_create(2, 1.0, 0, 0);
    store.get_or_create(3, 1.0, 0, 95);

    let mut cached = AHashSet::new();
    cached.insert(1);

    let removed = store.purge(100, 10, &cached);
    assert_eq!(removed, 1);
    assert!(store.contains(1), "cached files are never purged");
    assert!(!store.contains(2));
    assert!(store.contains(3), "recently requested files survive");
  }
}
