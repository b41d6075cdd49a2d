//! Engine configuration: size-bucket volume thresholds and the financial
//! evaluation horizon.
//!
//! Loaded from the data/ directory in production; tests use
//! `EngineConfig::default_test()`.

use crate::error::EngineResult;
use crate::types::{StoreSize, Typology};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Volume-magnitude thresholds that split a typology's stores into the
/// three size buckets: Pequeño ≤ small_max < Mediano ≤ medium_max < Grande.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BucketThresholds {
    pub small_max: f64,
    pub medium_max: f64,
}

impl BucketThresholds {
    /// Half-open volume range [lo, hi) covered by a bucket. Grande is
    /// unbounded above.
    pub fn volume_range(&self, size: StoreSize) -> (f64, f64) {
        match size {
            StoreSize::Pequeno => (0.0, self.small_max),
            StoreSize::Mediano => (self.small_max, self.medium_max),
            StoreSize::Grande => (self.medium_max, f64::INFINITY),
        }
    }

    /// Representative volume for tie-breaking in the resolver. Grande has
    /// no upper bound, so its midpoint is extrapolated from the Mediano
    /// band width.
    pub fn midpoint(&self, size: StoreSize) -> f64 {
        match size {
            StoreSize::Pequeno => self.small_max / 2.0,
            StoreSize::Mediano => (self.small_max + self.medium_max) / 2.0,
            StoreSize::Grande => self.medium_max + (self.medium_max - self.small_max) / 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BucketFileEntry {
    typology: String,
    small_max: f64,
    medium_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct SizeBucketsFile {
    buckets: Vec<BucketFileEntry>,
    horizon_months: u32,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub size_buckets: HashMap<Typology, BucketThresholds>,
    /// Evaluation horizon for ROI and payback, in months.
    pub horizon_months: u32,
}

impl EngineConfig {
    /// Load from the data/ directory. In tests, use
    /// `EngineConfig::default_test()`.
    pub fn load(data_dir: &str) -> EngineResult<Self> {
        let path = format!("{data_dir}/size_buckets.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: SizeBucketsFile = serde_json::from_str(&content)?;

        let mut size_buckets = HashMap::new();
        for entry in file.buckets {
            let typology = Typology::from_name(&entry.typology)?;
            size_buckets.insert(
                typology,
                BucketThresholds {
                    small_max: entry.small_max,
                    medium_max: entry.medium_max,
                },
            );
        }
        // Every typology must be bucketed explicitly; a missing entry
        // would silently shift simulation cohorts at query time.
        for typology in Typology::ALL {
            if !size_buckets.contains_key(&typology) {
                return Err(anyhow::anyhow!("{path} has no size buckets for '{typology}'").into());
            }
        }

        Ok(Self {
            size_buckets,
            horizon_months: file.horizon_months,
        })
    }

    /// Both constructors guarantee an entry per typology, so the fallback
    /// can only be reached through a hand-assembled map.
    pub fn thresholds(&self, typology: Typology) -> BucketThresholds {
        self.size_buckets
            .get(&typology)
            .copied()
            .unwrap_or(DEFAULT_THRESHOLDS)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let mut size_buckets = HashMap::new();
        size_buckets.insert(
            Typology::SuperEHiper,
            BucketThresholds {
                small_max: 500.0,
                medium_max: 2000.0,
            },
        );
        size_buckets.insert(
            Typology::Conveniencia,
            BucketThresholds {
                small_max: 100.0,
                medium_max: 400.0,
            },
        );
        size_buckets.insert(
            Typology::Droguerias,
            BucketThresholds {
                small_max: 80.0,
                medium_max: 250.0,
            },
        );
        Self {
            size_buckets,
            horizon_months: 12,
        }
    }
}

/// Conservative fallback when a typology has no configured thresholds.
const DEFAULT_THRESHOLDS: BucketThresholds = BucketThresholds {
    small_max: 100.0,
    medium_max: 500.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_ranges_partition_the_volume_axis() {
        let t = BucketThresholds {
            small_max: 100.0,
            medium_max: 400.0,
        };
        assert_eq!(t.volume_range(StoreSize::Pequeno), (0.0, 100.0));
        assert_eq!(t.volume_range(StoreSize::Mediano), (100.0, 400.0));
        let (lo, hi) = t.volume_range(StoreSize::Grande);
        assert_eq!(lo, 400.0);
        assert!(hi.is_infinite());
    }

    #[test]
    fn load_rejects_a_file_missing_a_typology() {
        let dir = std::env::temp_dir().join(format!("uplift-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("size_buckets.json"),
            r#"{
                "buckets": [
                    { "typology": "Super e hiper", "small_max": 500.0, "medium_max": 2000.0 },
                    { "typology": "Conveniencia", "small_max": 100.0, "medium_max": 400.0 }
                ],
                "horizon_months": 12
            }"#,
        )
        .unwrap();

        let err = EngineConfig::load(dir.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Droguerías"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_accepts_a_complete_bucket_file() {
        let dir = std::env::temp_dir().join(format!("uplift-config-full-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("size_buckets.json"),
            r#"{
                "buckets": [
                    { "typology": "Super e hiper", "small_max": 500.0, "medium_max": 2000.0 },
                    { "typology": "Conveniencia", "small_max": 100.0, "medium_max": 400.0 },
                    { "typology": "Droguerías", "small_max": 80.0, "medium_max": 250.0 }
                ],
                "horizon_months": 12
            }"#,
        )
        .unwrap();

        let config = EngineConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.horizon_months, 12);
        assert_eq!(config.thresholds(Typology::Droguerias).small_max, 80.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn midpoints_are_ordered() {
        let t = EngineConfig::default_test().thresholds(Typology::SuperEHiper);
        assert!(t.midpoint(StoreSize::Pequeno) < t.midpoint(StoreSize::Mediano));
        assert!(t.midpoint(StoreSize::Mediano) < t.midpoint(StoreSize::Grande));
    }
}
