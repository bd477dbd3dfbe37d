// Command-line behaviour of the validator binary
// Runs in a temporary working directory with the default file names

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const REFERENCE_CSV: &str = "Gain_Dual,Gain_Single\n10,2\n12,3\n11,1\n9,2\n";

fn validator_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("null-model-validation").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn png_pixels_per_meter(path: &Path) -> Option<u32> {
    let decoder = png::Decoder::new(fs::File::open(path).unwrap());
    let reader = decoder.read_info().unwrap();
    reader.info().pixel_dims.map(|dims| dims.xppu)
}

// ============================================================================
// Missing input
// ============================================================================

#[test]
fn test_missing_input_reports_filename_and_writes_nothing() {
    let tmp_dir = TempDir::new().unwrap();

    validator_cmd(tmp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting Null Model Validation..."))
        .stdout(predicate::str::contains(
            "Error: 'Fig1_coherence.csv' not found. Please place it in the same folder.",
        ))
        .stdout(predicate::str::contains("Observed Real Gain Difference").not());

    assert!(!tmp_dir.path().join("Fig4_True_NullModel.png").exists());
}

#[test]
fn test_missing_custom_input_names_that_file() {
    let tmp_dir = TempDir::new().unwrap();

    validator_cmd(tmp_dir.path())
        .arg("--input")
        .arg("other.csv")
        .assert()
        .success()
        .stdout(predicate::str::contains("'other.csv' not found"));
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_reference_table_end_to_end() {
    let tmp_dir = TempDir::new().unwrap();
    fs::write(tmp_dir.path().join("Fig1_coherence.csv"), REFERENCE_CSV).unwrap();

    validator_cmd(tmp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Observed Real Gain Difference: 8.5000"))
        .stdout(predicate::str::contains("Running 10000 random simulations..."))
        .stdout(predicate::str::contains("Null Model Max Gain: "))
        .stdout(predicate::str::contains("P-Value: 9.999000e-05"))
        .stdout(predicate::str::contains("Generating validation plot..."))
        .stdout(predicate::str::contains(
            "Validation complete. Plot saved as 'Fig4_True_NullModel.png'.",
        ));

    let output = tmp_dir.path().join("Fig4_True_NullModel.png");
    assert!(output.exists());
    assert!(fs::metadata(&output).unwrap().len() > 0);
    // 300 DPI is 11811 pixels per meter
    assert_eq!(png_pixels_per_meter(&output), Some(11811));
}

#[test]
fn test_existing_output_is_overwritten() {
    let tmp_dir = TempDir::new().unwrap();
    fs::write(tmp_dir.path().join("Fig1_coherence.csv"), REFERENCE_CSV).unwrap();
    fs::write(tmp_dir.path().join("fig.png"), b"old contents").unwrap();

    validator_cmd(tmp_dir.path())
        .args(["--output", "fig.png", "--dpi", "50", "-n", "500"])
        .assert()
        .success();

    let bytes = fs::read(tmp_dir.path().join("fig.png")).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    assert_eq!(png_pixels_per_meter(&tmp_dir.path().join("fig.png")), Some(1969));
}

#[test]
fn test_same_seed_same_output() {
    let tmp_dir = TempDir::new().unwrap();
    fs::write(tmp_dir.path().join("Fig1_coherence.csv"), REFERENCE_CSV).unwrap();

    let run = || {
        validator_cmd(tmp_dir.path())
            .args(["--dpi", "20", "--seed", "7"])
            .output()
            .unwrap()
    };
    let first = run();
    let second = run();

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_config_file_drives_run() {
    let tmp_dir = TempDir::new().unwrap();
    fs::write(tmp_dir.path().join("gains.csv"), REFERENCE_CSV).unwrap();
    fs::write(
        tmp_dir.path().join("validation.toml"),
        "n_simulations = 321\ninput_path = \"gains.csv\"\noutput_path = \"null.png\"\ndpi = 20\n",
    )
    .unwrap();

    validator_cmd(tmp_dir.path())
        .args(["--config", "validation.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running 321 random simulations..."))
        .stdout(predicate::str::contains("Plot saved as 'null.png'"));

    assert!(tmp_dir.path().join("null.png").exists());
}

// ============================================================================
// JSON report
// ============================================================================

#[test]
fn test_json_report() {
    let tmp_dir = TempDir::new().unwrap();
    fs::write(tmp_dir.path().join("Fig1_coherence.csv"), REFERENCE_CSV).unwrap();

    let output = validator_cmd(tmp_dir.path())
        .args(["--format", "json", "--dpi", "20"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["observed"]["real_diff"], 8.5);
    assert_eq!(report["observed"]["row_count"], 4);
    assert_eq!(report["significance"]["n_simulations"], 10000);
    assert_eq!(report["significance"]["exceed_count"], 0);
    let p = report["significance"]["p_value"].as_f64().unwrap();
    assert!((p - 1.0 / 10_001.0).abs() < 1e-15);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_columns_fail_without_figure() {
    let tmp_dir = TempDir::new().unwrap();
    fs::write(
        tmp_dir.path().join("Fig1_coherence.csv"),
        "Gain_Dual,Gain_Other\n1,2\n3,4\n",
    )
    .unwrap();

    validator_cmd(tmp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required columns"))
        .stderr(predicate::str::contains("Gain_Single"));

    assert!(!tmp_dir.path().join("Fig4_True_NullModel.png").exists());
}

#[test]
fn test_unwritable_output_fails() {
    let tmp_dir = TempDir::new().unwrap();
    fs::write(tmp_dir.path().join("Fig1_coherence.csv"), REFERENCE_CSV).unwrap();

    validator_cmd(tmp_dir.path())
        .args(["--output", "no_such_dir/fig.png", "--dpi", "20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to write plot"));
}

#[test]
fn test_invalid_dpi_rejected() {
    let tmp_dir = TempDir::new().unwrap();

    validator_cmd(tmp_dir.path())
        .args(["--dpi", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dpi must be between"));
}
