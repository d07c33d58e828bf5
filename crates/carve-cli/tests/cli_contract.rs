use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

use carve_model::builder::*;
use carve_model::context::Context;
use carve_model::machine::{Event, Machine, Variable};
use carve_model::project::ProjectFile;
use carve_model::{Assignment, Type};

/// `twins` sees `c0`; `l` and `r` are independent, `sync` reads both.
fn write_inputs(dir: &Path) {
    let mut c0 = Context::new("c0");
    c0.sets.push("S".into());

    let mut m = Machine::new("twins");
    m.sees.push("c0".into());
    m.variables.push(Variable::typed("l", Type::Integer));
    m.variables.push(Variable::typed("r", Type::Integer));
    m.events.push(Event::initialisation().with_action(
        "init",
        Assignment::render(becomes_equal(&["l", "r"], vec![int(0), int(0)])),
    ));
    m.events.push(Event::new("left").with_action(
        "act",
        Assignment::render(becomes_equal(&["l"], vec![add(ident("l"), int(1))])),
    ));
    m.events.push(Event::new("sync").with_action(
        "act",
        Assignment::render(becomes_equal(&["r"], vec![ident("l")])),
    ));

    let project = ProjectFile {
        machines: vec![m],
        contexts: vec![c0],
    };
    std::fs::write(
        dir.join("project.json"),
        serde_json::to_string_pretty(&project).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.join("manifest.json"),
        r#"{
            "schema_version": 1,
            "machine": "twins",
            "sub_models": [
                { "name": "L", "events": ["left"] },
                { "name": "R", "events": ["sync"] }
            ]
        }"#,
    )
    .unwrap();
}

fn carve(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_carve"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to execute carve")
}

fn json_stdout(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "carve failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "output should be JSON (stderr={}): {e}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[test]
fn shared_reports_accessed_and_shared_variables() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let report = json_stdout(&carve(
        dir.path(),
        &["shared", "project.json", "manifest.json", "--format", "json"],
    ));
    assert_eq!(report["machine"], "twins");
    assert_eq!(report["sub_models"][0]["accessed"], serde_json::json!(["l"]));
    assert_eq!(report["sub_models"][1]["accessed"], serde_json::json!(["l", "r"]));
    assert_eq!(report["shared"], serde_json::json!(["l"]));
}

#[test]
fn decompose_writes_one_machine_per_sub_model() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let report = json_stdout(&carve(
        dir.path(),
        &[
            "decompose",
            "project.json",
            "manifest.json",
            "--out",
            "out",
            "--format",
            "json",
        ],
    ));
    assert_eq!(report["cancelled"], false);
    assert_eq!(report["outputs"].as_array().unwrap().len(), 2);
    assert_eq!(report["outputs"][1]["external"], serde_json::json!(["INITIALISATION", "left"]));

    let out = dir.path().join("out").join("decomposed");
    assert!(out.join("L.machine.json").is_file());
    assert!(out.join("R.machine.json").is_file());
    assert!(out.join("c0.context.json").is_file());
}

#[test]
fn flattened_mode_omits_empty_contexts() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let report = json_stdout(&carve(
        dir.path(),
        &[
            "decompose",
            "project.json",
            "manifest.json",
            "--out",
            "out",
            "--context-mode",
            "flattened",
            "--format",
            "json",
        ],
    ));
    assert_eq!(report["outputs"][0]["contexts"], serde_json::json!([]));
    let out = dir.path().join("out").join("decomposed");
    assert!(!out.join("c0.context.json").exists());
    assert!(!out.join("L_ctx.context.json").exists());
}

#[test]
fn invalid_manifest_fails_with_every_problem() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    std::fs::write(
        dir.path().join("bad.json"),
        r#"{ "schema_version": 2, "machine": "twins", "sub_models": [] }"#,
    )
    .unwrap();
    let output = carve(dir.path(), &["shared", "project.json", "bad.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("schema_version must be 1, got 2"), "stderr={stderr}");
    assert!(stderr.contains("sub_models must be non-empty"), "stderr={stderr}");
}

#[test]
fn unknown_context_mode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let output = carve(
        dir.path(),
        &[
            "decompose",
            "project.json",
            "manifest.json",
            "--out",
            "out",
            "--context-mode",
            "minimal",
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown context mode"));
    assert!(!dir.path().join("out").exists());
}
