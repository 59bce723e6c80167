/// Golden determinism test — runs the frozen scenario and asserts the
/// history hash matches the permanent v1 value.
///
/// The scenario only produces dyadic values (quarter weights, identity
/// activation), so the hash is exact on every IEEE-754 platform.
/// If it fails, the step semantics or the hash layout have changed.

use std::fs;

use serde::Deserialize;

use nca_engine::activation::Identity;
use nca_engine::engine::SimulationEngine;
use nca_engine::grid::Grid;
use nca_engine::hashing::history_hash;
use nca_engine::kernel::Kernel;
use nca_engine::ENGINE_VERSION;

#[derive(Deserialize)]
struct Scenario {
    height: usize,
    width: usize,
    steps: usize,
    persistent: bool,
    kernel: Kernel,
    initial_cells: Vec<(usize, usize)>,
}

fn load_scenario(path: &str) -> Scenario {
    let data = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    serde_json::from_str(&data).expect("Failed to parse scenario JSON")
}

fn load_expected_hash(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
        .trim()
        .to_string()
}

fn run_scenario(s: &Scenario) -> String {
    let init = Grid::from_active_cells(s.height, s.width, &s.initial_cells).unwrap();
    let engine =
        SimulationEngine::new(init, s.kernel.clone(), Identity, s.steps, s.persistent).unwrap();
    history_hash(&engine.run())
}

#[test]
fn golden_history_hash_matches() {
    let scenario = load_scenario("tests/golden/scenario.json");
    let hash = run_scenario(&scenario);

    let expected = load_expected_hash("tests/golden/expected_hash.txt");
    assert_eq!(
        hash, expected,
        "GOLDEN TEST FAILED: v1 scenario produced a different history hash.\n\
         Got:      {}\n\
         Expected: {}",
        hash, expected
    );
}

#[test]
fn golden_run_is_deterministic() {
    let scenario = load_scenario("tests/golden/scenario.json");
    let h1 = run_scenario(&scenario);
    let h2 = run_scenario(&scenario);
    assert_eq!(
        h1, h2,
        "DETERMINISM FAILURE: two runs of the same scenario produced different hashes.\n\
         Run 1: {}\n\
         Run 2: {}",
        h1, h2
    );
}

#[test]
fn golden_last_frame_values() {
    let scenario = load_scenario("tests/golden/scenario.json");
    let init =
        Grid::from_active_cells(scenario.height, scenario.width, &scenario.initial_cells).unwrap();
    let h = SimulationEngine::new(init, scenario.kernel, Identity, scenario.steps, true)
        .unwrap()
        .run();
    let last = h.last().unwrap();
    assert_eq!(last.row(0), &[0.0234375, 1.0, 0.3076171875, 0.166015625, 1.0]);
    assert_eq!(last.row(3), &[0.3076171875, 0.44921875, 0.029296875, 1.0, 0.234375]);
}

#[test]
fn engine_version_is_one() {
    assert_eq!(ENGINE_VERSION, 1, "ENGINE_VERSION must be 1 for the v1 hash layout");
}
