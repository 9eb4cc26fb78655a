//! Integration tests for output formatting
//!
//! These tests run the binary against the sample maintenance log and check
//! the JSON envelope, error output and batch result files.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn sample_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/maintenance_records.csv")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_maintrag"))
        .current_dir(dir)
        .args(args)
        .env_remove("MAINTRAG_DATA")
        .env_remove("MAINTRAG_TOP_N")
        .env_remove("MAINTRAG_LIST_LIMIT")
        .env_remove("MAINTRAG_USE_LLM")
        .env_remove("MAINTRAG_LLM_TIMEOUT")
        .env_remove("OLLAMA_MODEL")
        .env_remove("OLLAMA_HOST")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_json_answer_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let data = sample_data();
    let output = run(
        dir.path(),
        &["--data", data.to_str().unwrap(), "--json", "ask", "How many incidents on PRESS-01?"],
    );

    assert!(output.status.success(), "Command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");

    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"]["plan"]["intent"]["kind"], "count_incidents");
    assert_eq!(parsed["data"]["text"], "There were 6 incidents on PRESS-01.");
    assert_eq!(parsed["data"]["rephrased"], false);
}

#[test]
fn test_explain_adds_phases() {
    let dir = tempfile::tempdir().unwrap();
    let data = sample_data();
    let output = run(
        dir.path(),
        &["--data", data.to_str().unwrap(), "--json", "--explain", "ask", "Which", "technician", "handled", "the", "most", "work", "orders?"],
    );

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let explanation = &parsed["data"]["explanation"];
    assert_eq!(explanation["parse_phase"]["rule"], "ranking");
    assert!(explanation["retrieval_phase"]["rows_scanned"].as_u64().unwrap() > 0);
    assert!(explanation["generation_phase"]["model"].is_null());
}

#[test]
fn test_missing_dataset_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["--data", "does-not-exist.csv", "--json", "ask", "How many incidents?"]);

    assert!(!output.status.success(), "Command should fail");
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["status"], "error");
    assert_eq!(parsed["message"], "Dataset file not found");
}

#[test]
fn test_batch_writes_result_files() {
    let dir = tempfile::tempdir().unwrap();
    let questions = dir.path().join("questions.json");
    std::fs::write(
        &questions,
        r#"{
            "single_turn": [
                {"id": 1, "question": "How many incidents on PRESS-01?", "expected_answer": "6"}
            ],
            "multi_turn": [
                {"id": "c1", "name": "press", "turns": [
                    {"question": "How many incidents on PRESS-01?"},
                    {"question": "And how many in July 2024?", "expected_answer": "2"}
                ]}
            ]
        }"#,
    )
    .unwrap();

    let data = sample_data();
    let output = run(
        dir.path(),
        &["--data", data.to_str().unwrap(), "--json", "batch", "questions.json", "--out", "out"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["data"]["questions"], 3);
    assert_eq!(parsed["data"]["matched"], 2);

    let results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("out/test_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(results["multi_turn"][0]["turns"][1]["output"], "There were 2 incidents on PRESS-01 in July 2024.");
    assert!(dir.path().join("out/test_results.txt").exists());
}
