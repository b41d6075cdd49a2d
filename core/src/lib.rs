//! Scenario resolution and financial outcome engine for retail execution
//! levers.
//!
//! A precomputed scenario grid (typology x unit x lever combination x
//! store profile) lives in SQLite. The engine answers two kinds of
//! questions on top of it:
//!
//! - distributional: "what uplift did scenarios including these levers
//!   show?" — pooled cohort, percentile statistics, cached per dataset
//!   snapshot;
//! - personalized: "what would these levers do for *this* store?" —
//!   exact or nearest-neighbor scenario resolution followed by margin,
//!   ROI and payback math against the cost catalog.
//!
//! Everything is deterministic on a fixed snapshot: same request, same
//! answer, byte for byte.

pub mod cache;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod financial;
pub mod matcher;
pub mod resolver;
pub mod store;
pub mod types;

pub use cache::{CacheStats, StatsCache, StatsKey};
pub use config::{BucketThresholds, EngineConfig};
pub use distribution::UpliftDistribution;
pub use engine::{
    CostLine, CostQuery, CostSummary, DistributionQuery, DistributionResponse, DistributionStats,
    SimulationOutcome, SimulationRequest, SimulationResponse, UpliftEngine,
};
pub use error::{EngineError, EngineResult};
pub use financial::{evaluate, FinancialOutcome, Payback};
pub use matcher::{Cohort, LeverFilter, MatchMode};
pub use resolver::{resolve_nearest, ResolvedScenario};
pub use store::{CostEntry, DatasetSummary, ScenarioRow, ScenarioStore};
pub use types::{FeatureCounts, Lever, LeverSet, MeasurementUnit, StoreSize, Typology};
