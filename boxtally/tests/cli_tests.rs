use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const RECORDS: &str = concat!(
    r#"{"image_file": "frame_0001.png", "bboxes": [[0.1, 0.2, 0.5, 0.6], [0.0, 0.0, 0.5, 0.5]], "labels": ["wood", "pet"], "vals": {"confs": [0.9, 0.6]}}"#,
    "\n",
    r#"{"image_file": "frame_0002.png", "bboxes": [[0.2, 0.2, 0.3, 0.3]], "labels": ["wood"], "vals": {"confs": [0.8]}}"#,
    "\n",
);

fn write_capture(dir: &Path, records: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    image::RgbImage::new(100, 200)
        .save(dir.join("frame_0001.png"))
        .unwrap();
    let log_path = dir.join("debug_inference_out.json");
    fs::write(&log_path, records).unwrap();
    log_path
}

fn boxtally(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_boxtally"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute boxtally")
}

#[test]
fn test_stats_json_reports_class_counts() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = write_capture(temp_dir.path(), RECORDS);

    let output = boxtally(&["stats", log_path.to_str().unwrap(), "--format", "json"]);
    assert!(
        output.status.success(),
        "stats failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["total"]["frames"], 2);
    assert_eq!(document["total"]["objects"], 3);
    assert_eq!(document["total"]["classes"]["wood"], 2);
    assert_eq!(document["total"]["classes"]["pet"], 1);
    assert!(document.get("logs").is_none());
}

#[test]
fn test_stats_table_ranks_classes() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = write_capture(temp_dir.path(), RECORDS);

    let output = boxtally(&["stats", log_path.to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "2 frame(s), 3 object(s), 2 class(es)");
    assert!(lines[2].starts_with("wood"), "got: {stdout}");
    assert!(lines[3].starts_with("pet"), "got: {stdout}");
}

#[test]
fn test_parse_writes_scaled_records_next_to_log() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = write_capture(temp_dir.path(), RECORDS);

    let output = boxtally(&["parse", log_path.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "parse failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let scaled = fs::read_to_string(temp_dir.path().join("debug_inference_out_scaled.json")).unwrap();
    let first: serde_json::Value = serde_json::from_str(scaled.lines().next().unwrap()).unwrap();
    assert_eq!(
        first["objects"][0],
        serde_json::json!({"x1": 10, "y1": 40, "x2": 50, "y2": 120, "conf": 0.9, "class": "wood"})
    );
    assert_eq!(scaled.lines().count(), 2);

    // No metadata unless asked for
    assert!(!temp_dir
        .path()
        .join("debug_inference_out.boxtally.toml")
        .exists());
}

#[test]
fn test_parse_to_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = write_capture(temp_dir.path(), RECORDS);

    let output = boxtally(&["parse", log_path.to_str().unwrap(), "--stdout"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);
    assert!(!temp_dir
        .path()
        .join("debug_inference_out_scaled.json")
        .exists());
}

#[test]
fn test_stdout_conflicts_with_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = write_capture(temp_dir.path(), RECORDS);
    let out_dir = temp_dir.path().join("out");

    let output = boxtally(&[
        "parse",
        log_path.to_str().unwrap(),
        "--stdout",
        "--output-dir",
        out_dir.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot use both"), "got: {stderr}");
}

#[test]
fn test_metadata_flag_writes_sidecar() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = write_capture(temp_dir.path(), RECORDS);

    let output = boxtally(&["stats", log_path.to_str().unwrap(), "--metadata"]);
    assert!(output.status.success());

    let metadata_path = temp_dir.path().join("debug_inference_out.boxtally.toml");
    let content = fs::read_to_string(metadata_path).unwrap();
    let metadata: toml::Value = toml::from_str(&content).unwrap();

    let stats = &metadata["stats"];
    assert_eq!(stats["frames"].as_integer(), Some(2));
    assert_eq!(stats["input"]["image_width"].as_integer(), Some(100));
    assert_eq!(stats["input"]["image_height"].as_integer(), Some(200));
    assert!(stats["execution"]["boxtally_version"].as_str().is_some());
}

#[test]
fn test_missing_source_fails_in_strict_mode() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nowhere.json");

    let output = boxtally(&["stats", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_source_is_tolerated_when_permissive() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = write_capture(&temp_dir.path().join("capture"), RECORDS);
    let missing = temp_dir.path().join("nowhere.json");

    let output = boxtally(&[
        "stats",
        log_path.to_str().unwrap(),
        missing.to_str().unwrap(),
        "--permissive",
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "stats failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["total"]["objects"], 3);
}

#[test]
fn test_index_mismatch_names_the_record() {
    let temp_dir = TempDir::new().unwrap();
    let bad = concat!(
        r#"{"image_file": "frame_0001.png", "bboxes": [[0.1, 0.1, 0.2, 0.2]], "labels": ["wood"], "vals": {"confs": [0.9]}}"#,
        "\n",
        r#"{"image_file": "frame_0001.png", "bboxes": [[0.1, 0.1, 0.2, 0.2], [0.3, 0.3, 0.4, 0.4]], "labels": ["wood"], "vals": {"confs": [0.9, 0.8]}}"#,
        "\n",
    );
    let log_path = write_capture(temp_dir.path(), bad);

    let output = boxtally(&["stats", log_path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "got: {stderr}");

    let output = boxtally(&[
        "stats",
        log_path.to_str().unwrap(),
        "--skip-mismatched",
        "--format",
        "json",
    ]);
    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["total"]["frames"], 1);
}

#[test]
fn test_output_dir_collision_requires_force() {
    let temp_dir = TempDir::new().unwrap();
    let first = write_capture(&temp_dir.path().join("run1"), RECORDS);
    let second = write_capture(&temp_dir.path().join("run2"), RECORDS);
    let out_dir = temp_dir.path().join("out");

    let args = [
        "parse",
        first.to_str().unwrap(),
        second.to_str().unwrap(),
        "--output-dir",
        out_dir.to_str().unwrap(),
    ];

    let output = boxtally(&args);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--force"), "got: {stderr}");

    let mut forced = args.to_vec();
    forced.push("--force");
    let output = boxtally(&forced);
    assert!(output.status.success());
    assert!(out_dir.join("debug_inference_out.json").exists());
}

#[test]
fn test_version_command() {
    let output = boxtally(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!("boxtally v{}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_repeated_parse_of_directory_ignores_earlier_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    image::RgbImage::new(100, 200)
        .save(dir.join("frame_0001.png"))
        .unwrap();
    fs::write(dir.join("run1.json"), RECORDS).unwrap();

    for _ in 0..2 {
        let output = boxtally(&["parse", dir.to_str().unwrap()]);
        assert!(
            output.status.success(),
            "parse failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    assert!(dir.join("run1_scaled.json").exists());
    assert!(!dir.join("run1_scaled_scaled.json").exists());

    let output = boxtally(&["stats", dir.to_str().unwrap(), "--format", "json"]);
    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["total"]["frames"], 2);
    assert_eq!(document["total"]["classes"]["wood"], 2);
}
