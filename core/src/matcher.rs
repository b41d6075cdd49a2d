//! Combination matcher: turns a lever selection into a cohort predicate.
//!
//! Two modes, selected by caller intent:
//!
//! - `Distributional`: a scenario matches when every selected lever flag
//!   is set; flags outside the selection are unconstrained. This pools
//!   "selection alone" with "selection plus extras", which is why the
//!   resulting uplift distribution can be wide.
//! - `Exact`: the scenario's lever bitset must equal the selection
//!   precisely. Used by the personalized single-outcome path.
//!
//! Matching is a pure filter. The same (typology, unit, selection, mode)
//! always yields the same cohort membership on a fixed dataset snapshot;
//! rows are ordered by their stable id. An empty cohort is a valid
//! outcome, not an error.

use crate::store::ScenarioRow;
use crate::types::{Lever, LeverSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    Distributional,
    Exact,
}

/// SQL column holding each lever flag, aligned with `Lever::ALL`.
/// The scenario table's named 0/1 columns are the offline grid's
/// compatibility surface; this is the single place that knows about them.
pub(crate) const LEVER_COLUMNS: [&str; 9] = [
    "lever_metro_cuadrado",
    "lever_punta_de_gondola",
    "lever_cajero_vendedor",
    "lever_nevera_checkout",
    "lever_nevera_adicional",
    "lever_mueble_exhibidor",
    "lever_exhibicion_adicional",
    "lever_senalizacion",
    "lever_material_pop",
];

pub(crate) fn lever_column(lever: Lever) -> &'static str {
    LEVER_COLUMNS[lever as u8 as usize]
}

/// A compiled lever predicate. The store appends its clauses to the
/// coarse (typology, unit) pre-filter; `matches` is the equivalent
/// in-memory test, used by tests to cross-check the SQL path.
#[derive(Debug, Clone, Copy)]
pub struct LeverFilter {
    pub selection: LeverSet,
    pub mode: MatchMode,
}

impl LeverFilter {
    pub fn new(selection: LeverSet, mode: MatchMode) -> Self {
        Self { selection, mode }
    }

    /// WHERE clauses constraining the named lever columns. Distributional
    /// mode only pins the selected flags to 1; exact mode pins all nine.
    pub(crate) fn where_clauses(&self) -> Vec<String> {
        match self.mode {
            MatchMode::Distributional => self
                .selection
                .iter()
                .map(|l| format!("{} = 1", lever_column(l)))
                .collect(),
            MatchMode::Exact => Lever::ALL
                .iter()
                .map(|l| {
                    let wanted = if self.selection.contains(*l) { 1 } else { 0 };
                    format!("{} = {}", lever_column(*l), wanted)
                })
                .collect(),
        }
    }

    pub fn matches(&self, levers: &LeverSet) -> bool {
        match self.mode {
            MatchMode::Distributional => self.selection.is_subset_of(levers),
            MatchMode::Exact => *levers == self.selection,
        }
    }
}

/// An immutable, id-ordered subset of scenario rows satisfying a query
/// predicate. Computed once per request; never mutates the store.
#[derive(Debug, Clone)]
pub struct Cohort {
    rows: Vec<ScenarioRow>,
}

impl Cohort {
    pub(crate) fn new(mut rows: Vec<ScenarioRow>) -> Self {
        // Store queries already order by id; sorting again keeps the
        // determinism guarantee independent of the access path.
        rows.sort_by_key(|r| r.id);
        Self { rows }
    }

    pub fn rows(&self) -> &[ScenarioRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn uplifts(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.uplift).collect()
    }

    /// Union of lever flags observed across the cohort. Drives the UI
    /// lever-selector population.
    pub fn observed_levers(&self) -> LeverSet {
        self.rows
            .iter()
            .fold(LeverSet::EMPTY, |acc, r| acc.union(&r.levers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(levers: &[Lever]) -> LeverSet {
        levers.iter().copied().collect()
    }

    #[test]
    fn distributional_is_subset_semantics() {
        let filter = LeverFilter::new(set(&[Lever::PuntaDeGondola]), MatchMode::Distributional);

        assert!(filter.matches(&set(&[Lever::PuntaDeGondola])));
        assert!(filter.matches(&set(&[Lever::PuntaDeGondola, Lever::MetroCuadrado])));
        assert!(!filter.matches(&set(&[Lever::MetroCuadrado])));
        assert!(!filter.matches(&LeverSet::EMPTY));
    }

    #[test]
    fn exact_requires_equality() {
        let sel = set(&[Lever::PuntaDeGondola, Lever::CajeroVendedor]);
        let filter = LeverFilter::new(sel, MatchMode::Exact);

        assert!(filter.matches(&sel));
        assert!(!filter.matches(&sel.with(Lever::MetroCuadrado)));
        assert!(!filter.matches(&set(&[Lever::PuntaDeGondola])));
    }

    #[test]
    fn exact_mode_pins_all_nine_columns() {
        let filter = LeverFilter::new(set(&[Lever::MetroCuadrado]), MatchMode::Exact);
        let clauses = filter.where_clauses();
        assert_eq!(clauses.len(), 9);
        assert!(clauses.contains(&"lever_metro_cuadrado = 1".to_string()));
        assert!(clauses.contains(&"lever_material_pop = 0".to_string()));
    }

    #[test]
    fn distributional_mode_pins_only_selected_columns() {
        let filter = LeverFilter::new(
            set(&[Lever::PuntaDeGondola, Lever::Senalizacion]),
            MatchMode::Distributional,
        );
        let clauses = filter.where_clauses();
        assert_eq!(clauses.len(), 2);
        assert!(clauses.iter().all(|c| c.ends_with("= 1")));
    }
}
