//! Feature-aware nearest-neighbor resolution.
//!
//! When no scenario row matches a store's feature counts exactly, the
//! resolver picks the closest row in feature space. Each dimension is
//! normalized by the maximum value observed across the candidate rows and
//! the caller's own count, so no single large-valued dimension (SKU counts
//! dwarf door counts) dominates the distance.
//!
//! Cooling dimensions (equipos de frío, puertas) are skipped for
//! typologies without cooling equipment; their stored counts are
//! placeholder values that would only add noise.
//!
//! Ties on distance break by proximity of the row's volume magnitude to
//! the requested bucket's representative volume, then by smallest row id.
//! Resolution is deterministic on a fixed snapshot.

use crate::matcher::Cohort;
use crate::store::ScenarioRow;
use crate::types::{FeatureCounts, Typology};

/// Outcome of nearest-neighbor resolution.
#[derive(Debug, Clone)]
pub struct ResolvedScenario {
    pub row: ScenarioRow,
    /// Squared normalized distance; 0.0 means an exact feature match.
    pub distance: f64,
}

fn dimensions(features: &FeatureCounts, with_cooling: bool) -> Vec<f64> {
    let mut dims = vec![
        features.frentes_propios as f64,
        features.frentes_competencia as f64,
        features.sku_propios as f64,
        features.sku_competencia as f64,
    ];
    if with_cooling {
        dims.push(features.equipos_frio_propios as f64);
        dims.push(features.equipos_frio_competencia as f64);
        dims.push(features.puertas_propias as f64);
        dims.push(features.puertas_competencia as f64);
    }
    dims
}

/// Pick the cohort row whose feature counts are closest to `features`.
/// Returns None for an empty cohort. `reference_volume` is the requested
/// size bucket's representative volume, used only for tie-breaking.
pub fn resolve_nearest(
    cohort: &Cohort,
    features: &FeatureCounts,
    typology: Typology,
    reference_volume: f64,
) -> Option<ResolvedScenario> {
    let rows = cohort.rows();
    if rows.is_empty() {
        return None;
    }
    let with_cooling = typology.uses_cooling();
    let target = dimensions(features, with_cooling);

    // Per-dimension normalizers over candidates plus the target itself.
    let mut scale = target.clone();
    for row in rows {
        for (s, v) in scale.iter_mut().zip(dimensions(&row.features, with_cooling)) {
            if v > *s {
                *s = v;
            }
        }
    }

    let distance_to = |row: &ScenarioRow| -> f64 {
        dimensions(&row.features, with_cooling)
            .iter()
            .zip(&target)
            .zip(&scale)
            .map(|((v, t), s)| {
                if *s > 0.0 {
                    let d = (v - t) / s;
                    d * d
                } else {
                    0.0
                }
            })
            .sum()
    };

    let mut best: Option<(&ScenarioRow, f64)> = None;
    for row in rows {
        let dist = distance_to(row);
        let better = match best {
            None => true,
            Some((current, best_dist)) => {
                if dist < best_dist {
                    true
                } else if dist > best_dist {
                    false
                } else {
                    let row_gap = (row.volume_magnitude - reference_volume).abs();
                    let cur_gap = (current.volume_magnitude - reference_volume).abs();
                    // Rows arrive in ascending id order, so a strict
                    // comparison keeps the smallest id on a full tie.
                    row_gap < cur_gap
                }
            }
        };
        if better {
            best = Some((row, dist));
        }
    }

    best.map(|(row, distance)| ResolvedScenario {
        row: row.clone(),
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lever, LeverSet, MeasurementUnit};

    fn features(fp: i64, fc: i64, sp: i64, sc: i64) -> FeatureCounts {
        FeatureCounts {
            frentes_propios: fp,
            frentes_competencia: fc,
            sku_propios: sp,
            sku_competencia: sc,
            equipos_frio_propios: 1,
            equipos_frio_competencia: 1,
            puertas_propias: 1,
            puertas_competencia: 1,
        }
    }

    fn row(id: i64, volume: f64, f: FeatureCounts) -> ScenarioRow {
        ScenarioRow {
            id,
            typology: Typology::SuperEHiper,
            unit: MeasurementUnit::Cajas8oz,
            volume_magnitude: volume,
            levers: LeverSet::EMPTY.with(Lever::PuntaDeGondola),
            exec_surtido: true,
            exec_precio: false,
            exec_exhibicion: false,
            features: f,
            predicted_value: 110.0,
            control_value: 100.0,
            uplift: 0.10,
        }
    }

    #[test]
    fn exact_feature_match_wins_with_zero_distance() {
        let target = features(4, 2, 30, 10);
        let cohort = Cohort::new(vec![
            row(1, 200.0, features(8, 1, 90, 40)),
            row(2, 300.0, target),
        ]);
        let resolved = resolve_nearest(&cohort, &target, Typology::SuperEHiper, 250.0).unwrap();
        assert_eq!(resolved.row.id, 2);
        assert_eq!(resolved.distance, 0.0);
    }

    #[test]
    fn tie_breaks_by_volume_then_id() {
        let target = features(4, 2, 30, 10);
        // Both rows match the target exactly; distances tie at zero.
        let cohort = Cohort::new(vec![
            row(5, 900.0, target),
            row(9, 260.0, target),
        ]);
        let resolved = resolve_nearest(&cohort, &target, Typology::SuperEHiper, 250.0).unwrap();
        assert_eq!(resolved.row.id, 9);

        // Equal volume gap as well: smallest id wins.
        let cohort = Cohort::new(vec![row(5, 260.0, target), row(9, 260.0, target)]);
        let resolved = resolve_nearest(&cohort, &target, Typology::SuperEHiper, 250.0).unwrap();
        assert_eq!(resolved.row.id, 5);
    }

    #[test]
    fn cooling_dimensions_ignored_for_droguerias() {
        let target = features(4, 2, 30, 10);
        let mut near_but_cold = features(4, 2, 30, 10);
        near_but_cold.equipos_frio_propios = 50;
        near_but_cold.puertas_competencia = 50;
        let far = features(8, 6, 60, 40);

        let cohort = Cohort::new(vec![row(1, 100.0, near_but_cold), row(2, 100.0, far)]);
        let resolved = resolve_nearest(&cohort, &target, Typology::Droguerias, 100.0).unwrap();
        // With cooling excluded the first row is an exact match.
        assert_eq!(resolved.row.id, 1);
        assert_eq!(resolved.distance, 0.0);
    }

    #[test]
    fn empty_cohort_resolves_to_none() {
        let cohort = Cohort::new(vec![]);
        let target = features(1, 1, 1, 1);
        assert!(resolve_nearest(&cohort, &target, Typology::Conveniencia, 50.0).is_none());
    }
}
