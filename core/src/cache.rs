//! Distribution statistics cache, keyed by the full query identity and
//! invalidated wholesale when the dataset snapshot version moves.
//!
//! The cache never answers across snapshot versions: a stale epoch clears
//! the whole map before lookup, so a refreshed dataset can never serve
//! mixed results. Hit and miss counters feed the analytics surface.

use crate::distribution::UpliftDistribution;
use crate::matcher::MatchMode;
use crate::types::{MeasurementUnit, Typology};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatsKey {
    pub typology: Typology,
    pub unit: MeasurementUnit,
    pub lever_bits: u16,
    pub mode: MatchMode,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub snapshot_version: i64,
}

#[derive(Default)]
struct Inner {
    epoch: i64,
    map: HashMap<StatsKey, Arc<UpliftDistribution>>,
    hits: u64,
    misses: u64,
}

/// Interior-mutability cache shared by engine handles.
#[derive(Default)]
pub struct StatsCache {
    inner: Mutex<Inner>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup under the given snapshot version. A version change drops
    /// every entry before the probe, so the result is always from the
    /// current snapshot.
    pub fn get(&self, version: i64, key: &StatsKey) -> Option<Arc<UpliftDistribution>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.epoch != version {
            inner.map.clear();
            inner.epoch = version;
        }
        match inner.map.get(key) {
            Some(dist) => {
                let dist = Arc::clone(dist);
                inner.hits += 1;
                Some(dist)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn put(&self, version: i64, key: StatsKey, dist: Arc<UpliftDistribution>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.epoch != version {
            inner.map.clear();
            inner.epoch = version;
        }
        inner.map.insert(key, dist);
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        CacheStats {
            entries: inner.map.len(),
            hits: inner.hits,
            misses: inner.misses,
            snapshot_version: inner.epoch,
        }
    }
}
