//! Shared test helpers for integration tests

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get an euvsim command
pub fn euvsim() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("euvsim"));
    cmd.env_remove("EUVSIM_OUTPUT");
    cmd
}

/// A small line/space recipe that runs in well under a second
pub const SMALL_RECIPE: &str = r#"name: small
tool:
  dose_mj_cm2: 30.0
  numerical_aperture: 0.33
mask:
  type: line-space
  height_px: 32
  width_px: 128
  line_px: 16
  pitch_px: 32
target_cd_nm: 16.0
seed: 7
sweep:
  dose_range: [26.0, 34.0]
  focus_range: [-20.0, 20.0]
  grid_resolution: 2
"#;

/// Write `content` to `name` inside the temp dir and return its path
pub fn write_recipe(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = tmp.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Temp dir holding `small.yaml`
pub fn setup_small_recipe() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = write_recipe(&tmp, "small.yaml", SMALL_RECIPE);
    (tmp, path)
}
