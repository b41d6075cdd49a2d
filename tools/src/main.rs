//! uplift-runner: headless query runner for the uplift engine.
//!
//! Usage:
//!   uplift-runner --db scenarios.db summary
//!   uplift-runner --db :memory: --seed-demo distribution < query.json
//!   uplift-runner --db :memory: --seed-demo simulate < request.json
//!   uplift-runner --seed-demo levers --tipologia "Super e hiper"
//!
//! Query subcommands read one JSON document from stdin and print the
//! response (or a JSON error with a machine-readable reason) to stdout.

use anyhow::{bail, Result};
use std::env;
use std::io::Read;
use uplift_core::{
    CostEntry, CostQuery, DistributionQuery, EngineConfig, EngineError, FeatureCounts, Lever,
    LeverSet, MeasurementUnit, ScenarioRow, ScenarioStore, SimulationRequest, Typology,
    UpliftEngine,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");
    let seed_demo = args.iter().any(|a| a == "--seed-demo");
    let subcommand = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with("--") && !is_flag_value(&args, a))
        .map(String::as_str)
        .unwrap_or("summary");

    let store = ScenarioStore::open(db)?;
    store.migrate()?;
    if seed_demo {
        seed_demo_dataset(&store)?;
    }
    let config = EngineConfig::load(data_dir)?;
    let engine = UpliftEngine::new(store, config);

    match subcommand {
        "summary" => print_summary(&engine)?,
        "distribution" => {
            let query: DistributionQuery = read_stdin_json()?;
            print_outcome(engine.distribution_query(&query));
        }
        "costs" => {
            let query: CostQuery = read_stdin_json()?;
            print_outcome(engine.cost_lookup(&query));
        }
        "simulate" => {
            let request: SimulationRequest = read_stdin_json()?;
            print_outcome(engine.simulate(&request));
        }
        "levers" => {
            let name = args
                .windows(2)
                .find(|w| w[0] == "--tipologia")
                .map(|w| w[1].as_str())
                .unwrap_or("Super e hiper");
            let levers = Typology::from_name(name)
                .and_then(|t| engine.available_levers(t))
                .map(|set| set.names());
            print_outcome(levers);
        }
        other => bail!("unknown subcommand '{other}'"),
    }

    Ok(())
}

// Flags that consume the next argument; --seed-demo does not.
const VALUE_FLAGS: [&str; 3] = ["--db", "--data-dir", "--tipologia"];

fn is_flag_value(args: &[String], candidate: &str) -> bool {
    args.windows(2)
        .any(|w| VALUE_FLAGS.contains(&w[0].as_str()) && w[1] == candidate)
}

fn read_stdin_json<T: serde::de::DeserializeOwned>() -> Result<T> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(serde_json::from_str(&buffer)?)
}

fn print_outcome<T: serde::Serialize>(result: Result<T, EngineError>) {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("serialization failure: {e}"),
        },
        Err(e) => {
            let err = serde_json::json!({
                "error": e.to_string(),
                "reason": e.reason_code(),
            });
            println!("{err}");
        }
    }
}

fn print_summary(engine: &UpliftEngine) -> Result<()> {
    let summary = engine.dataset_summary()?;
    println!("=== DATASET SUMMARY ===");
    println!("  scenario rows:    {}", summary.scenario_rows);
    println!("  cost entries:     {}", summary.cost_rows);
    println!("  snapshot version: {}", summary.snapshot_version);
    println!();
    for typology in Typology::ALL {
        let levers = engine.available_levers(typology)?;
        println!("  {typology}: {} levers available", levers.len());
    }
    let cache = engine.cache_stats();
    println!();
    println!("  cache: {} entries, {} hits, {} misses", cache.entries, cache.hits, cache.misses);
    Ok(())
}

/// Deterministic demo dataset: every typology gets a small scenario grid
/// over a handful of lever combinations and volume magnitudes, plus a
/// cost catalog. Cooling levers are left unpriced and unsimulated for
/// pharmacies, mirroring the production catalog.
fn seed_demo_dataset(store: &ScenarioStore) -> Result<()> {
    let combos: [&[Lever]; 5] = [
        &[Lever::PuntaDeGondola],
        &[Lever::MetroCuadrado],
        &[Lever::PuntaDeGondola, Lever::MetroCuadrado],
        &[Lever::PuntaDeGondola, Lever::Senalizacion, Lever::MaterialPop],
        &[Lever::NeveraCheckout, Lever::ExhibicionAdicional],
    ];
    let volumes = [60.0, 150.0, 320.0, 700.0, 1500.0, 2600.0];

    let mut id = 1i64;
    for typology in Typology::ALL {
        for unit in MeasurementUnit::ALL {
            for (ci, combo) in combos.iter().enumerate() {
                let levers: LeverSet = combo.iter().copied().collect();
                if !typology.uses_cooling() && levers.contains(Lever::NeveraCheckout) {
                    continue;
                }
                for (vi, volume) in volumes.iter().enumerate() {
                    // Formulaic but varied: uplift grows with combo size
                    // and shrinks with store volume.
                    let uplift = 0.02 * (ci as f64 + 1.0) - 0.004 * vi as f64;
                    let control = volume * 10.0;
                    let row = ScenarioRow {
                        id,
                        typology,
                        unit,
                        volume_magnitude: *volume,
                        levers,
                        exec_surtido: ci % 2 == 0,
                        exec_precio: vi % 2 == 0,
                        exec_exhibicion: true,
                        features: FeatureCounts {
                            frentes_propios: 2 + ci as i64,
                            frentes_competencia: 1 + vi as i64,
                            sku_propios: 20 + 5 * ci as i64,
                            sku_competencia: 10 + 3 * vi as i64,
                            equipos_frio_propios: 1 + ci as i64,
                            equipos_frio_competencia: 1,
                            puertas_propias: 1 + (vi as i64 % 3),
                            puertas_competencia: 1,
                        },
                        predicted_value: control * (1.0 + uplift),
                        control_value: control,
                        uplift,
                    };
                    store.insert_scenario(&row)?;
                    id += 1;
                }
            }
        }
    }

    for typology in Typology::ALL {
        for (li, lever) in Lever::ALL.iter().enumerate() {
            let cooling = matches!(
                lever,
                Lever::NeveraCheckout | Lever::NeveraAdicional
            );
            if cooling && !typology.uses_cooling() {
                continue;
            }
            store.insert_cost_entry(&CostEntry {
                typology,
                lever: *lever,
                capital_usd: 50.0 + 25.0 * li as f64,
                fee_usd: 5.0 + 2.0 * li as f64,
            })?;
        }
    }

    log::info!("seeded demo dataset: {} scenario rows", id - 1);
    Ok(())
}
