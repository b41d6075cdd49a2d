//! Uplift distribution summary for a cohort.
//!
//! Percentiles use linear interpolation between order statistics
//! (h = (n - 1) * q), so p50 of an even-sized cohort is the mean of the
//! two middle values. A single-row cohort collapses every statistic to
//! that row's uplift.

use crate::matcher::Cohort;
use crate::types::LeverSet;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct UpliftDistribution {
    /// Uplift values in ascending order.
    pub values: Vec<f64>,
    pub count: usize,
    pub mean: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    #[serde(skip)]
    pub observed_levers: LeverSet,
}

impl UpliftDistribution {
    /// None for an empty cohort; statistics over nothing are not a value.
    pub fn from_cohort(cohort: &Cohort) -> Option<Self> {
        let mut values = cohort.uplifts();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let p25 = percentile(&values, 0.25);
        let median = percentile(&values, 0.50);
        let p75 = percentile(&values, 0.75);

        Some(Self {
            values,
            count,
            mean,
            p25,
            median,
            p75,
            observed_levers: cohort.observed_levers(),
        })
    }
}

/// q-th percentile of an ascending-sorted, non-empty slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = h - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.50), 2.5);
        assert_eq!(percentile(&values, 0.25), 1.75);
        assert_eq!(percentile(&values, 0.75), 3.25);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 4.0);
    }

    #[test]
    fn single_value_collapses_all_statistics() {
        let values = [0.12];
        assert_eq!(percentile(&values, 0.25), 0.12);
        assert_eq!(percentile(&values, 0.75), 0.12);
    }
}
