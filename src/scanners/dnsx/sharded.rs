//! Striped-lock result map for the DNS worker pool.
//!
//! A single mutex over the full result map would serialize every worker's
//! write at high fan-out; N independently locked shards keep contention
//! negligible. `drain` runs once, after all workers are done.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::models::ResolutionInfo;

/// Fixed-width sharded map from host to its resolution.
pub struct ShardedResultMap {
    shards: Vec<RwLock<HashMap<String, ResolutionInfo>>>,
}

impl ShardedResultMap {
    /// Creates a map with `shard_count` shards (at least one).
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard_for(&self, host: &str) -> &RwLock<HashMap<String, ResolutionInfo>> {
        let index = fnv1a(host) as usize % self.shards.len();
        &self.shards[index]
    }

    /// Records a host's resolution. The first write for a host wins; within
    /// one execution a host is never resolved twice, so a second write would
    /// indicate a feeding bug rather than fresher data.
    pub fn set(&self, host: String, info: ResolutionInfo) {
        let mut shard = self.shard_for(&host).write().expect("shard lock poisoned");
        shard.entry(host).or_insert(info);
    }

    /// Number of entries across all shards.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().expect("shard lock poisoned").len())
            .sum()
    }

    /// Copies all shards into one ordered map.
    pub fn drain(&self) -> BTreeMap<String, ResolutionInfo> {
        let mut result = BTreeMap::new();
        for shard in &self.shards {
            let guard = shard.read().expect("shard lock poisoned");
            for (host, info) in guard.iter() {
                result.insert(host.clone(), info.clone());
            }
        }
        result
    }
}

/// 32-bit FNV-1a; cheap and stable across runs, which keeps shard assignment
/// deterministic for a given host.
fn fnv1a(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in s.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
