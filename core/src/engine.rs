//! Query engine facade.
//!
//! All public operations take wire-shaped requests (Spanish field names,
//! camelCase, matching the original API contract), validate them fully
//! before touching the store, and return serializable responses. The
//! engine holds the store, the bucket configuration, and the statistics
//! cache; handlers never reach around it.

use crate::cache::{CacheStats, StatsCache, StatsKey};
use crate::config::EngineConfig;
use crate::distribution::UpliftDistribution;
use crate::error::{EngineError, EngineResult};
use crate::financial::{self, FinancialOutcome};
use crate::matcher::{LeverFilter, MatchMode};
use crate::resolver;
use crate::store::{DatasetSummary, ScenarioStore};
use crate::types::{FeatureCounts, LeverSet, MeasurementUnit, StoreSize, Typology};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Wire types ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DistributionQuery {
    pub tipologia: String,
    pub unidad: String,
    pub palancas: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionStats {
    pub mean: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionResponse {
    pub uplift_values: Vec<f64>,
    pub count: usize,
    /// None when no scenario matched; an empty cohort is a valid answer.
    pub statistics: Option<DistributionStats>,
    /// Levers the caller could add for this typology.
    pub available_levers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostQuery {
    pub tipologia: String,
    pub palancas: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostLine {
    pub palanca: String,
    pub capital_usd: f64,
    pub fee_usd: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    pub breakdown: Vec<CostLine>,
    pub total_capital_usd: f64,
    pub total_fee_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub tipologia: String,
    pub palancas: Vec<String>,
    pub tamano_tienda: String,
    pub features: FeatureCounts,
    /// Margin percentage; 35 means 35%.
    pub maco: f64,
    /// Local currency units per USD.
    pub exchange_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SimulationResponse {
    Ok(SimulationOutcome),
    /// No scenario row exists for the requested combination; distinct
    /// from a validation error.
    NoScenario,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub scenario_id: i64,
    pub matched_exactly: bool,
    pub uplift: f64,
    #[serde(flatten)]
    pub financials: FinancialOutcome,
    pub capex_breakdown: Vec<CostLine>,
    pub total_capex_usd: f64,
    pub total_fee_usd: f64,
    pub total_capex_cop: f64,
    pub total_fee_cop: f64,
}

// ── Engine ─────────────────────────────────────────────────────

pub struct UpliftEngine {
    store: ScenarioStore,
    config: EngineConfig,
    cache: StatsCache,
}

impl UpliftEngine {
    pub fn new(store: ScenarioStore, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            cache: StatsCache::new(),
        }
    }

    pub fn store(&self) -> &ScenarioStore {
        &self.store
    }

    /// Uplift distribution for a lever selection, pooled over every
    /// scenario that includes the selected levers (subset semantics).
    pub fn distribution_query(
        &self,
        query: &DistributionQuery,
    ) -> EngineResult<DistributionResponse> {
        let typology = Typology::from_name(&query.tipologia)?;
        let unit = MeasurementUnit::from_name(&query.unidad)?;
        let selection = LeverSet::from_names(&query.palancas)?;

        let dist = self.distribution_for(typology, unit, selection, MatchMode::Distributional)?;
        // Levers observed across the cohort feed the selector UI; with no
        // cohort, fall back to everything usable for the typology.
        let available_levers = match &dist {
            Some(d) => d.observed_levers.names(),
            None => self.available_levers(typology)?.names(),
        };

        log::info!(
            "distribution query: typology={typology} unit={unit} levers={} matched={}",
            selection.len(),
            dist.as_ref().map_or(0, |d| d.count)
        );

        Ok(match dist {
            Some(d) => DistributionResponse {
                uplift_values: d.values.clone(),
                count: d.count,
                statistics: Some(DistributionStats {
                    mean: d.mean,
                    median: d.median,
                    p25: d.p25,
                    p75: d.p75,
                }),
                available_levers,
            },
            None => DistributionResponse {
                uplift_values: Vec::new(),
                count: 0,
                statistics: None,
                available_levers,
            },
        })
    }

    /// Capital and fee totals for a lever selection. A selected lever
    /// without a cost entry is an error, never a silent zero.
    pub fn cost_lookup(&self, query: &CostQuery) -> EngineResult<CostSummary> {
        let typology = Typology::from_name(&query.tipologia)?;
        let selection = LeverSet::from_names(&query.palancas)?;
        self.cost_summary(typology, selection)
    }

    /// Personalized simulation: resolve the closest scenario for the
    /// store's profile, then evaluate the P&L of the lever selection.
    pub fn simulate(&self, request: &SimulationRequest) -> EngineResult<SimulationResponse> {
        if request.exchange_rate <= 0.0 {
            return Err(EngineError::InvalidExchangeRate {
                value: request.exchange_rate,
            });
        }
        if request.maco <= 0.0 {
            return Err(EngineError::InvalidMargin {
                value: request.maco,
            });
        }
        request.features.validate()?;
        let typology = Typology::from_name(&request.tipologia)?;
        let selection = LeverSet::from_names(&request.palancas)?;
        let size = StoreSize::from_name(&request.tamano_tienda)?;

        // Resolution runs on the volume unit the scenario grid was
        // precomputed against.
        let unit = MeasurementUnit::Cajas8oz;

        let thresholds = self.config.thresholds(typology);
        let (lo, hi) = thresholds.volume_range(size);
        let filter = LeverFilter::new(selection, MatchMode::Exact);
        let cohort = self
            .store
            .cohort_in_volume_range(typology, unit, &filter, lo, hi)?;

        let resolved = match resolver::resolve_nearest(
            &cohort,
            &request.features,
            typology,
            thresholds.midpoint(size),
        ) {
            Some(r) => r,
            None => {
                log::warn!(
                    "no scenario for typology={typology} size={size} levers={}",
                    selection.len()
                );
                return Ok(SimulationResponse::NoScenario);
            }
        };

        let costs = self.cost_summary(typology, selection)?;
        // Catalog amounts are USD; the margin basis (the scenario's
        // control value) is local currency, so the investment converts
        // before ROI and payback.
        let investment =
            (costs.total_capital_usd + costs.total_fee_usd) * request.exchange_rate;
        let financials = financial::evaluate(
            resolved.row.uplift,
            resolved.row.control_value,
            request.maco,
            investment,
            self.config.horizon_months,
        )?;

        log::info!(
            "simulation: typology={typology} size={size} scenario_id={} exact={} roi={:.4}",
            resolved.row.id,
            resolved.distance == 0.0,
            financials.roi
        );

        Ok(SimulationResponse::Ok(SimulationOutcome {
            scenario_id: resolved.row.id,
            matched_exactly: resolved.distance == 0.0,
            uplift: resolved.row.uplift,
            financials,
            total_capex_cop: costs.total_capital_usd * request.exchange_rate,
            total_fee_cop: costs.total_fee_usd * request.exchange_rate,
            total_capex_usd: costs.total_capital_usd,
            total_fee_usd: costs.total_fee_usd,
            capex_breakdown: costs.breakdown,
        }))
    }

    /// Levers usable for a typology: observed on at least one scenario
    /// row or priced in the cost catalog.
    pub fn available_levers(&self, typology: Typology) -> EngineResult<LeverSet> {
        let with_scenarios = self.store.levers_with_scenarios(typology)?;
        let with_costs = self.store.levers_with_costs(typology)?;
        Ok(with_scenarios.union(&with_costs))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn dataset_summary(&self) -> EngineResult<DatasetSummary> {
        self.store.dataset_summary()
    }

    fn distribution_for(
        &self,
        typology: Typology,
        unit: MeasurementUnit,
        selection: LeverSet,
        mode: MatchMode,
    ) -> EngineResult<Option<Arc<UpliftDistribution>>> {
        let version = self.store.snapshot_version()?;
        let key = StatsKey {
            typology,
            unit,
            lever_bits: selection.bits(),
            mode,
        };
        if let Some(cached) = self.cache.get(version, &key) {
            return Ok(Some(cached));
        }

        let filter = LeverFilter::new(selection, mode);
        let cohort = self.store.cohort(typology, unit, &filter)?;
        let dist = match UpliftDistribution::from_cohort(&cohort) {
            Some(d) => Arc::new(d),
            None => return Ok(None),
        };
        self.cache.put(version, key, Arc::clone(&dist));
        Ok(Some(dist))
    }

    fn cost_summary(&self, typology: Typology, selection: LeverSet) -> EngineResult<CostSummary> {
        let mut breakdown = Vec::with_capacity(selection.len());
        let mut total_capital_usd = 0.0;
        let mut total_fee_usd = 0.0;
        for lever in selection.iter() {
            let entry =
                self.store
                    .cost_for(typology, lever)?
                    .ok_or_else(|| EngineError::NoCostData {
                        typology: typology.name().to_string(),
                        lever: lever.name().to_string(),
                    })?;
            total_capital_usd += entry.capital_usd;
            total_fee_usd += entry.fee_usd;
            breakdown.push(CostLine {
                palanca: lever.name().to_string(),
                capital_usd: entry.capital_usd,
                fee_usd: entry.fee_usd,
            });
        }
        Ok(CostSummary {
            breakdown,
            total_capital_usd,
            total_fee_usd,
        })
    }
}
