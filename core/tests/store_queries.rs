//! Store-level tests: SQL cohort path vs the in-memory predicate, volume
//! bucket boundaries, and migration behavior.

use uplift_core::{
    FeatureCounts, Lever, LeverFilter, MatchMode, MeasurementUnit, ScenarioRow, ScenarioStore,
    Typology,
};

fn features() -> FeatureCounts {
    FeatureCounts {
        frentes_propios: 2,
        frentes_competencia: 1,
        sku_propios: 10,
        sku_competencia: 5,
        equipos_frio_propios: 1,
        equipos_frio_competencia: 1,
        puertas_propias: 1,
        puertas_competencia: 1,
    }
}

fn row(id: i64, volume: f64, levers: &[Lever]) -> ScenarioRow {
    ScenarioRow {
        id,
        typology: Typology::Conveniencia,
        unit: MeasurementUnit::Ventas,
        volume_magnitude: volume,
        levers: levers.iter().copied().collect(),
        exec_surtido: false,
        exec_precio: false,
        exec_exhibicion: false,
        features: features(),
        predicted_value: 105.0,
        control_value: 100.0,
        uplift: 0.05,
    }
}

fn seeded_store() -> ScenarioStore {
    let store = ScenarioStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_scenario(&row(1, 50.0, &[Lever::Senalizacion])).unwrap();
    store
        .insert_scenario(&row(2, 100.0, &[Lever::Senalizacion, Lever::MaterialPop]))
        .unwrap();
    store.insert_scenario(&row(3, 150.0, &[Lever::MaterialPop])).unwrap();
    store.insert_scenario(&row(4, 399.0, &[Lever::Senalizacion])).unwrap();
    store
}

#[test]
fn sql_cohort_agrees_with_in_memory_predicate() {
    let store = seeded_store();
    for mode in [MatchMode::Distributional, MatchMode::Exact] {
        let selection = [Lever::Senalizacion].into_iter().collect();
        let filter = LeverFilter::new(selection, mode);
        let cohort = store
            .cohort(Typology::Conveniencia, MeasurementUnit::Ventas, &filter)
            .unwrap();
        assert!(!cohort.is_empty());
        for r in cohort.rows() {
            assert!(filter.matches(&r.levers));
        }
    }
}

#[test]
fn volume_range_is_half_open() {
    let store = seeded_store();
    let filter = LeverFilter::new(
        [Lever::Senalizacion].into_iter().collect(),
        MatchMode::Distributional,
    );

    // [50, 100): id 2 sits exactly on the upper bound, so it is out.
    let cohort = store
        .cohort_in_volume_range(
            Typology::Conveniencia,
            MeasurementUnit::Ventas,
            &filter,
            50.0,
            100.0,
        )
        .unwrap();
    assert_eq!(cohort.rows().iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);

    // Unbounded upper end covers everything from 100 up.
    let cohort = store
        .cohort_in_volume_range(
            Typology::Conveniencia,
            MeasurementUnit::Ventas,
            &filter,
            100.0,
            f64::INFINITY,
        )
        .unwrap();
    assert_eq!(cohort.rows().iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 4]);
}

#[test]
fn rows_come_back_in_stable_id_order() {
    let store = ScenarioStore::in_memory().unwrap();
    store.migrate().unwrap();
    for id in [9, 3, 7, 1] {
        store.insert_scenario(&row(id, 100.0, &[Lever::MaterialPop])).unwrap();
    }
    let filter = LeverFilter::new(
        [Lever::MaterialPop].into_iter().collect(),
        MatchMode::Distributional,
    );
    let cohort = store
        .cohort(Typology::Conveniencia, MeasurementUnit::Ventas, &filter)
        .unwrap();
    let ids: Vec<i64> = cohort.rows().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 7, 9]);
}

#[test]
fn migrate_is_idempotent_and_snapshot_starts_at_one() {
    let store = ScenarioStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.migrate().unwrap();
    assert_eq!(store.snapshot_version().unwrap(), 1);
    assert_eq!(store.bump_snapshot_version().unwrap(), 2);
}

#[test]
fn observed_levers_union_drives_availability() {
    let store = seeded_store();
    let set = store.levers_with_scenarios(Typology::Conveniencia).unwrap();
    assert!(set.contains(Lever::Senalizacion));
    assert!(set.contains(Lever::MaterialPop));
    assert_eq!(set.len(), 2);

    let empty = store.levers_with_scenarios(Typology::Droguerias).unwrap();
    assert!(empty.is_empty());
}
