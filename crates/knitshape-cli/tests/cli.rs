//! Integration tests for the knitshape CLI.
//!
//! These run the built binary in a scratch directory and check exit
//! status, stdout and the files it leaves behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const PANEL: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100mm" height="50mm" viewBox="0 0 100 50">
  <path d="M0,0 L100,0 L100,50 L0,50 Z"/>
</svg>"#;

/// Run the binary inside `dir`, isolated from the caller's settings.
fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_knitshape"))
        .current_dir(dir)
        .env_remove("KNITSHAPE_CONFIG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute knitshape")
}

fn fixture(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn status(output: &Output) -> i32 {
    output.status.code().expect("terminated by signal")
}

#[test]
fn list_prints_json_summaries() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(dir.path(), &["list", "panel.svg", "--json"]);
    assert_eq!(status(&output), 0, "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let pieces: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let pieces = pieces.as_array().unwrap();
    assert_eq!(pieces.len(), 1);
    assert_eq!(pieces[0]["index"], 1);
    assert_eq!(pieces[0]["name"], "panel");
    assert_eq!(pieces[0]["holes"], 0);
    let area = pieces[0]["area"].as_f64().unwrap();
    assert!((area - 5000.0).abs() < 5.0, "area {area}");
}

#[test]
fn list_text_shows_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(dir.path(), &["list", "panel.svg"]);
    assert_eq!(status(&output), 0);
    assert!(stdout(&output).contains("  1  panel  100.0 x 50.0 mm"));
}

#[test]
fn convert_writes_one_file_per_piece() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(
        dir.path(),
        &["convert", "panel.svg", "--sts10", "20", "--rows10", "20", "-o", "out"],
    );
    assert_eq!(status(&output), 0, "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let written = dir.path().join("out/1_panel.txt");
    assert!(stdout(&output).contains("1_panel.txt"));
    let text = fs::read_to_string(written).unwrap();
    assert!(text.contains("Stitches : 20\nRows : 10"));
    assert!(text.contains("Shape filename : panel"));
}

#[test]
fn convert_uses_gauge_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);
    fixture(&dir, "knitshape.toml", "[gauge]\nsts10 = 10.0\nrows10 = 10.0\n");

    let output = run(dir.path(), &["convert", "panel.svg", "--rows10", "20"]);
    assert_eq!(status(&output), 0);
    let text = fs::read_to_string(dir.path().join("output/1_panel.txt")).unwrap();
    assert!(text.contains("Stitches : 10\nRows : 10"));
}

#[test]
fn missing_gauge_exits_with_config_status() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(dir.path(), &["convert", "panel.svg", "--sts10", "20"]);
    assert_eq!(status(&output), 4);
    assert!(String::from_utf8_lossy(&output.stderr).contains("rows10"));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn non_positive_gauge_exits_with_config_status() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(dir.path(), &["convert", "panel.svg", "--sts10", "0", "--rows10", "20"]);
    assert_eq!(status(&output), 4);
}

#[test]
fn piece_with_session_and_preview() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(
        dir.path(),
        &[
            "piece", "panel.svg", "--sts10", "20", "--rows10", "20", "--index", "1",
            "--mirror", "right", "--preview", "--session", "job7", "--json",
        ],
    );
    assert_eq!(status(&output), 0, "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let converted: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let shape_file = PathBuf::from(converted["shape_file"].as_str().unwrap());
    assert!(shape_file.ends_with("output/job7/1_panel.txt"));

    let text = fs::read_to_string(dir.path().join("output/job7/1_panel.txt")).unwrap();
    // Mirrored about the right edge: twice as wide
    assert!(text.contains("Stitches : 40\nRows : 10"));
    assert!(dir.path().join("output/job7/1_panel.svg").exists());
}

#[test]
fn isolate_uses_a_fresh_session_each_run() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let args = ["convert", "panel.svg", "--sts10", "20", "--rows10", "20", "--isolate"];
    assert_eq!(status(&run(dir.path(), &args)), 0);
    assert_eq!(status(&run(dir.path(), &args)), 0);

    let sessions = fs::read_dir(dir.path().join("output")).unwrap().count();
    assert_eq!(sessions, 2);
}

#[test]
fn unknown_index_exits_with_not_found_status() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(
        dir.path(),
        &["piece", "panel.svg", "--sts10", "20", "--rows10", "20", "--index", "2"],
    );
    assert_eq!(status(&output), 3);
    assert!(String::from_utf8_lossy(&output.stderr).contains("shape 2 not found"));
}

#[test]
fn bad_input_exits_with_format_status() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "broken.svg", "<svg><path d='M0 0 L1 1'></svg>");
    fixture(&dir, "panel.pdf", "%PDF-1.4");

    assert_eq!(status(&run(dir.path(), &["list", "broken.svg"])), 2);
    assert_eq!(status(&run(dir.path(), &["list", "panel.pdf"])), 2);
}

#[test]
fn missing_file_is_a_general_failure() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(status(&run(dir.path(), &["list", "nowhere.dxf"])), 1);
}

#[test]
fn invalid_settings_file_exits_with_config_status() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);
    fixture(&dir, "bad.toml", "[output]\nyarn_symbol = 12\n");

    let output = run(dir.path(), &["list", "panel.svg", "--config", "bad.toml"]);
    assert_eq!(status(&output), 4);
}

#[test]
fn bad_usage_exits_with_config_status() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(status(&run(dir.path(), &["piece", "panel.svg", "--mirror", "up"])), 4);
    assert_eq!(status(&run(dir.path(), &["--help"])), 0);
}

#[test]
fn preview_goes_to_stdout_or_png() {
    let dir = tempfile::tempdir().unwrap();
    fixture(&dir, "panel.svg", PANEL);

    let output = run(dir.path(), &["preview", "panel.svg", "--index", "1", "--rotate", "-90"]);
    assert_eq!(status(&output), 0);
    let svg = stdout(&output);
    assert!(svg.contains("<title>panel</title>"));
    assert!(svg.contains(r#"width="50.000mm" height="100.000mm""#));

    let output = run(dir.path(), &["preview", "panel.svg", "--index", "1", "-o", "panel.png"]);
    assert_eq!(status(&output), 0, "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let png = fs::read(dir.path().join("panel.png")).unwrap();
    assert_eq!(&png[1..4], b"PNG");
}
