//! SQLite scenario store.
//!
//! RULE: Only store.rs talks to the database.
//! Engine components call store methods — they never execute SQL directly.
//!
//! The scenario and cost tables are read-only from the engine's point of
//! view; the insert methods exist for the offline loader and for tests.
//! Every cohort query starts from the composite index
//! (typology, unit, volume_magnitude) so a 1M+-row table is never scanned
//! in full, and excludes rows whose control value cannot serve as a
//! denominator (control_value <= 0).

use crate::error::EngineResult;
use crate::matcher::{Cohort, LeverFilter, LEVER_COLUMNS};
use crate::types::{FeatureCounts, Lever, LeverSet, MeasurementUnit, Typology};
use rusqlite::{params, Connection, OptionalExtension};

/// One precomputed model-evaluation row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRow {
    pub id: i64,
    pub typology: Typology,
    pub unit: MeasurementUnit,
    pub volume_magnitude: f64,
    pub levers: LeverSet,
    pub exec_surtido: bool,
    pub exec_precio: bool,
    pub exec_exhibicion: bool,
    pub features: FeatureCounts,
    pub predicted_value: f64,
    pub control_value: f64,
    pub uplift: f64,
}

impl ScenarioRow {
    /// Fractional uplift of `predicted` over `control`. None when the
    /// control value cannot serve as a denominator; such rows are kept in
    /// the table but excluded from every cohort query.
    pub fn uplift_from(predicted: f64, control: f64) -> Option<f64> {
        if control > 0.0 {
            Some((predicted - control) / control)
        } else {
            None
        }
    }
}

/// Capital and recurring fee for one (typology, lever) pair, in USD.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEntry {
    pub typology: Typology,
    pub lever: Lever,
    pub capital_usd: f64,
    pub fee_usd: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetSummary {
    pub scenario_rows: i64,
    pub cost_rows: i64,
    pub snapshot_version: i64,
}

const SCENARIO_COLUMNS: &str = "id, typology, unit, volume_magnitude, \
     lever_metro_cuadrado, lever_punta_de_gondola, lever_cajero_vendedor, \
     lever_nevera_checkout, lever_nevera_adicional, lever_mueble_exhibidor, \
     lever_exhibicion_adicional, lever_senalizacion, lever_material_pop, \
     exec_surtido, exec_precio, exec_exhibicion, \
     frentes_propios, frentes_competencia, sku_propios, sku_competencia, \
     equipos_frio_propios, equipos_frio_competencia, puertas_propias, puertas_competencia, \
     predicted_value, control_value, uplift";

pub struct ScenarioStore {
    conn: Connection,
}

impl ScenarioStore {
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Dataset snapshot ───────────────────────────────────────

    /// Current snapshot version, the cache epoch. Bumped wholesale by the
    /// offline refresh, never partially.
    pub fn snapshot_version(&self) -> EngineResult<i64> {
        let version: i64 = self.conn.query_row(
            "SELECT version FROM dataset_snapshot WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    pub fn bump_snapshot_version(&self) -> EngineResult<i64> {
        self.conn.execute(
            "UPDATE dataset_snapshot SET version = version + 1 WHERE id = 1",
            [],
        )?;
        self.snapshot_version()
    }

    // ── Loader / test inserts ──────────────────────────────────

    pub fn insert_scenario(&self, row: &ScenarioRow) -> EngineResult<()> {
        let flags: Vec<i32> = Lever::ALL
            .iter()
            .map(|l| if row.levers.contains(*l) { 1 } else { 0 })
            .collect();
        self.conn.execute(
            "INSERT INTO scenario (
                id, typology, unit, volume_magnitude,
                lever_metro_cuadrado, lever_punta_de_gondola, lever_cajero_vendedor,
                lever_nevera_checkout, lever_nevera_adicional, lever_mueble_exhibidor,
                lever_exhibicion_adicional, lever_senalizacion, lever_material_pop,
                exec_surtido, exec_precio, exec_exhibicion,
                frentes_propios, frentes_competencia, sku_propios, sku_competencia,
                equipos_frio_propios, equipos_frio_competencia,
                puertas_propias, puertas_competencia,
                predicted_value, control_value, uplift
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,
                       ?17,?18,?19,?20,?21,?22,?23,?24,?25,?26,?27)",
            params![
                row.id,
                row.typology.name(),
                row.unit.name(),
                row.volume_magnitude,
                flags[0],
                flags[1],
                flags[2],
                flags[3],
                flags[4],
                flags[5],
                flags[6],
                flags[7],
                flags[8],
                row.exec_surtido as i32,
                row.exec_precio as i32,
                row.exec_exhibicion as i32,
                row.features.frentes_propios,
                row.features.frentes_competencia,
                row.features.sku_propios,
                row.features.sku_competencia,
                row.features.equipos_frio_propios,
                row.features.equipos_frio_competencia,
                row.features.puertas_propias,
                row.features.puertas_competencia,
                row.predicted_value,
                row.control_value,
                row.uplift,
            ],
        )?;
        Ok(())
    }

    pub fn insert_cost_entry(&self, entry: &CostEntry) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO cost_entry (typology, lever, capital_usd, fee_usd)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.typology.name(),
                entry.lever.name(),
                entry.capital_usd,
                entry.fee_usd
            ],
        )?;
        Ok(())
    }

    // ── Cohort queries ─────────────────────────────────────────

    /// Scenario rows for (typology, unit) satisfying the lever filter.
    /// The lever clauses come from `LeverFilter::where_clauses`, which only
    /// emits fixed column names and 0/1 literals.
    pub fn cohort(
        &self,
        typology: Typology,
        unit: MeasurementUnit,
        filter: &LeverFilter,
    ) -> EngineResult<Cohort> {
        self.cohort_query(typology, unit, filter, None)
    }

    /// Cohort additionally bounded to a volume-magnitude range [lo, hi).
    /// Used by the resolver to pin the store-size bucket.
    pub fn cohort_in_volume_range(
        &self,
        typology: Typology,
        unit: MeasurementUnit,
        filter: &LeverFilter,
        lo: f64,
        hi: f64,
    ) -> EngineResult<Cohort> {
        self.cohort_query(typology, unit, filter, Some((lo, hi)))
    }

    fn cohort_query(
        &self,
        typology: Typology,
        unit: MeasurementUnit,
        filter: &LeverFilter,
        volume_range: Option<(f64, f64)>,
    ) -> EngineResult<Cohort> {
        let mut sql = format!(
            "SELECT {SCENARIO_COLUMNS} FROM scenario
             WHERE typology = ?1 AND unit = ?2 AND control_value > 0"
        );
        for clause in filter.where_clauses() {
            sql.push_str(" AND ");
            sql.push_str(&clause);
        }
        let mut bind: Vec<f64> = Vec::new();
        if let Some((lo, hi)) = volume_range {
            sql.push_str(&format!(" AND volume_magnitude >= ?{}", 3 + bind.len()));
            bind.push(lo);
            if hi.is_finite() {
                sql.push_str(&format!(" AND volume_magnitude < ?{}", 3 + bind.len()));
                bind.push(hi);
            }
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match bind.len() {
            0 => stmt.query_map(params![typology.name(), unit.name()], map_scenario_row)?,
            1 => stmt.query_map(
                params![typology.name(), unit.name(), bind[0]],
                map_scenario_row,
            )?,
            _ => stmt.query_map(
                params![typology.name(), unit.name(), bind[0], bind[1]],
                map_scenario_row,
            )?,
        }
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Cohort::new(rows))
    }

    // ── Cost catalog ───────────────────────────────────────────

    /// Cost entry for one (typology, lever) pair. None means the lever is
    /// not applicable to the typology; callers decide whether that is an
    /// error (it is, for cost lookups) rather than getting a silent zero.
    pub fn cost_for(&self, typology: Typology, lever: Lever) -> EngineResult<Option<CostEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT capital_usd, fee_usd FROM cost_entry
                 WHERE typology = ?1 AND lever = ?2",
                params![typology.name(), lever.name()],
                |row| {
                    Ok(CostEntry {
                        typology,
                        lever,
                        capital_usd: row.get(0)?,
                        fee_usd: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Levers backed by at least one cost entry for the typology.
    pub fn levers_with_costs(&self, typology: Typology) -> EngineResult<LeverSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT lever FROM cost_entry WHERE typology = ?1")?;
        let names = stmt
            .query_map(params![typology.name()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut set = LeverSet::EMPTY;
        for name in names {
            // A name in cost_entry outside the lever vocabulary is a
            // loader bug; surface it instead of skipping.
            set.insert(Lever::from_name(&name)?);
        }
        Ok(set)
    }

    /// Levers observed as set (flag = 1) on at least one scenario row of
    /// the typology, across all units.
    pub fn levers_with_scenarios(&self, typology: Typology) -> EngineResult<LeverSet> {
        let selects: Vec<String> = LEVER_COLUMNS
            .iter()
            .map(|c| format!("MAX({c})"))
            .collect();
        let sql = format!(
            "SELECT {} FROM scenario WHERE typology = ?1",
            selects.join(", ")
        );
        let flags: Vec<Option<i64>> = self.conn.query_row(
            &sql,
            params![typology.name()],
            |row| {
                let mut out = Vec::with_capacity(LEVER_COLUMNS.len());
                for i in 0..LEVER_COLUMNS.len() {
                    out.push(row.get::<_, Option<i64>>(i)?);
                }
                Ok(out)
            },
        )?;
        let set = Lever::ALL
            .iter()
            .zip(flags)
            .filter(|(_, f)| f.unwrap_or(0) == 1)
            .map(|(l, _)| *l)
            .collect();
        Ok(set)
    }

    // ── Summary / test helpers ─────────────────────────────────

    pub fn scenario_count(&self) -> EngineResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scenario", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn cost_entry_count(&self) -> EngineResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM cost_entry", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn dataset_summary(&self) -> EngineResult<DatasetSummary> {
        Ok(DatasetSummary {
            scenario_rows: self.scenario_count()?,
            cost_rows: self.cost_entry_count()?,
            snapshot_version: self.snapshot_version()?,
        })
    }
}

fn map_scenario_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScenarioRow> {
    let typology_name: String = row.get(1)?;
    let unit_name: String = row.get(2)?;
    let typology = Typology::from_name(&typology_name).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let unit = MeasurementUnit::from_name(&unit_name).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let mut levers = LeverSet::EMPTY;
    for (i, lever) in Lever::ALL.iter().enumerate() {
        if row.get::<_, i64>(4 + i)? != 0 {
            levers.insert(*lever);
        }
    }

    Ok(ScenarioRow {
        id: row.get(0)?,
        typology,
        unit,
        volume_magnitude: row.get(3)?,
        levers,
        exec_surtido: row.get::<_, i64>(13)? != 0,
        exec_precio: row.get::<_, i64>(14)? != 0,
        exec_exhibicion: row.get::<_, i64>(15)? != 0,
        features: FeatureCounts {
            frentes_propios: row.get(16)?,
            frentes_competencia: row.get(17)?,
            sku_propios: row.get(18)?,
            sku_competencia: row.get(19)?,
            equipos_frio_propios: row.get(20)?,
            equipos_frio_competencia: row.get(21)?,
            puertas_propias: row.get(22)?,
            puertas_competencia: row.get(23)?,
        },
        predicted_value: row.get(24)?,
        control_value: row.get(25)?,
        uplift: row.get(26)?,
    })
}
