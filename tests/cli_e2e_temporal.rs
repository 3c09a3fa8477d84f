//! End-to-end tests for the `temporal` command.
//!
//! The source project fixtures are local git repositories, so these tests
//! need `git` but never reach the template engine.

mod common;
use common::prelude::*;

#[test]
fn test_temporal_disabled() {
    let fixture = TestFixture::new().with_config(configs::TEMPORAL_DISABLED);

    fixture
        .command()
        .arg("temporal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Temporal testing is not enabled"))
        .stderr(predicate::str::contains("enabled = true"));
}

#[test]
fn test_temporal_without_section() {
    let fixture = TestFixture::new().with_config(configs::RENDER_ONLY);

    fixture
        .command()
        .arg("temporal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Temporal testing is not enabled"));
}

#[test]
fn test_temporal_snapshot_missing_ref() {
    let fixture = TestFixture::new()
        .with_config(configs::SNAPSHOT_WITHOUT_REF)
        .with_git_project("project");

    fixture
        .command()
        .arg("temporal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration parsing error"))
        .stderr(predicate::str::contains("ref"));

    fixture
        .child(".ctt-temporal")
        .assert(predicate::path::missing());
}

#[test]
fn test_temporal_no_snapshots() {
    let fixture = TestFixture::new()
        .with_config(configs::NO_SNAPSHOTS)
        .with_git_project("project");

    fixture
        .command()
        .arg("temporal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No snapshots configured"));
}

#[test]
fn test_temporal_source_project_missing() {
    let fixture = TestFixture::new()
        .with_config(configs::MISSING_REF)
        .with_template();

    fixture
        .command()
        .arg("temporal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source project not found"));
}

#[test]
fn test_temporal_source_project_not_a_repository() {
    let fixture = TestFixture::new()
        .with_config(configs::MISSING_REF)
        .with_template()
        .with_file("project/README.md", "# Project\n");

    fixture
        .command()
        .arg("temporal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No VCS detected"));
}

#[test]
fn test_temporal_failed_trial_writes_report() {
    let fixture = TestFixture::new()
        .with_config(configs::MISSING_REF)
        .with_template()
        .with_git_project("project");

    fixture
        .command()
        .arg("temporal")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Temporal Test Results"))
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("Failed: 1"))
        .stderr(predicate::str::contains("1 of 1 temporal test(s) failed"));

    let metadata = fixture.child(".ctt-temporal/metadata.json");
    metadata.assert(predicate::path::is_file());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(metadata.path()).unwrap()).unwrap();
    assert_eq!(json["total_tests"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["results"][0]["snapshot_name"], "gone");
    assert_eq!(json["results"][0]["success"], false);
}

#[test]
fn test_temporal_output_flag() {
    let fixture = TestFixture::new()
        .with_config(configs::MISSING_REF)
        .with_template()
        .with_git_project("project");

    fixture
        .command()
        .args(["temporal", "--output", "results", "--parallel", "--max-workers", "2"])
        .assert()
        .failure();

    fixture
        .child("results/metadata.json")
        .assert(predicate::path::is_file());
    fixture
        .child(".ctt-temporal")
        .assert(predicate::path::missing());
}

#[test]
fn test_temporal_max_workers_zero_is_usage_error() {
    let fixture = TestFixture::new().with_config(configs::MISSING_REF);

    fixture
        .command()
        .args(["temporal", "--max-workers", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_temporal_parallel_trial_runs_in_worker() {
    let fixture = TestFixture::new()
        .with_config(configs::MISSING_REF)
        .with_template()
        .with_git_project("project");

    fixture
        .command()
        .args(["temporal", "--parallel"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed: 1"));

    let metadata = std::fs::read_to_string(fixture.join(".ctt-temporal/metadata.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&metadata).unwrap();
    assert_eq!(json["results"][0]["snapshot_name"], "gone");
    let error = json["results"][0]["error"].as_str().unwrap();
    assert!(error.contains("v9.9.9"), "{}", error);
}

#[test]
fn test_run_trial_prints_result_json() {
    let fixture = TestFixture::new().with_git_project("project");
    let request = serde_json::json!({
        "template_path": fixture.path(),
        "source_project": fixture.join("project"),
        "output_dir": fixture.join("results"),
        "temp_root": fixture.join("tmp"),
        "keep_temp_dirs": false,
        "answers_file": ".copier-answers.yml",
        "snapshot": { "name": "gone", "ref": "v9.9.9" },
    });

    let output = fixture
        .command()
        .arg("run-trial")
        .write_stdin(request.to_string())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["snapshot_name"], "gone");
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("v9.9.9"));
}

#[test]
fn test_run_trial_rejects_invalid_request() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("run-trial")
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid trial request"));
}
