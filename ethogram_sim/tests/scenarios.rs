//! Builtin scenarios run end to end.

use ethogram_sim::scenarios::ScenarioId;
use ethogram_sim::{ScenarioRunner, SimConfig, TrajectoryExport};
use std::path::PathBuf;
use std::time::Duration;

fn runner(seed: u64) -> ScenarioRunner {
    ScenarioRunner::new(seed)
        .with_ticks(12)
        .with_passes(2)
        .with_interval(Duration::ZERO)
}

fn temp_export(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ethogram_{}_{}.json", tag, std::process::id()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_every_builtin_scenario_passes() {
    for scenario in ScenarioId::all() {
        let result = runner(42).run(scenario).await;
        assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        assert_eq!(result.passes_computed, 2);
        assert_eq!(result.passes_displayed, 2);

        let config = scenario.config(42);
        assert_eq!(result.ticks_rendered, 2 * 12 * config.population.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_seed_exports_same_trajectories() {
    let first = temp_export("flock_a");
    let second = temp_export("flock_b");

    assert!(runner(7).with_export(&first).run(ScenarioId::Flock).await.passed);
    assert!(runner(7).with_export(&second).run(ScenarioId::Flock).await.passed);

    let read = |path: &PathBuf| -> TrajectoryExport {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    };
    let (a, b) = (read(&first), read(&second));
    assert_eq!(a.frames.len(), 24);
    assert_eq!(a, b);

    let _ = std::fs::remove_file(first);
    let _ = std::fs::remove_file(second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_inhibition_demo_winners() {
    let path = temp_export("demo");
    let result = runner(1).with_export(&path).run(ScenarioId::InhibitionDemo).await;
    assert!(result.passed, "{:?}", result.failure_reason);

    let export: TrajectoryExport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let last = export.frames.last().unwrap();
    // Duelist a is driven east by A, duelist b backs off west under B
    assert!(last.entities[0].x > 250.0);
    assert!(last.entities[1].x < 250.0);
    let _ = std::fs::remove_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_config_file_run() {
    let path = temp_export("config");
    let config = ScenarioId::Still.config(3).with_ticks(5).with_passes(1);
    std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

    let loaded = SimConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);

    let result = runner(3).run_config("still", loaded).await;
    assert!(result.passed, "{:?}", result.failure_reason);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_bad_config_fails_cleanly() {
    let config = SimConfig::default().with_ticks(0);
    let result = ScenarioRunner::new(1).run_config("broken", config).await;
    assert!(!result.passed);
    assert!(result.failure_reason.unwrap().contains("ticks"));
}
