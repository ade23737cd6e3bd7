//! Cross-compiling the testsuite examples and the board image.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Target of the QEMU testsuite (`lm3s6965evb` is a Cortex-M3).
pub const QEMU_TARGET: &str = "thumbv7m-none-eabi";

/// Target of the STM32F091 board image.
pub const BOARD_TARGET: &str = "thumbv6m-none-eabi";

/// The workspace root, one level above this crate.
pub fn project_root() -> PathBuf {
    let xtask = Path::new(env!("CARGO_MANIFEST_DIR"));
    xtask.parent().unwrap_or(xtask).to_path_buf()
}

fn cargo_build(package_dir: &str, target: &str, release: bool, extra: &[&str]) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.current_dir(project_root().join(package_dir))
        .env("DEFMT_LOG", "trace")
        .stderr(Stdio::inherit())
        .arg("build")
        .args(extra)
        .arg("--target")
        .arg(target);

    if release {
        cmd.arg("--release");
    }

    let status = cmd.status().context("Failed to run cargo build")?;

    if !status.success() {
        bail!("cargo build failed in {package_dir}");
    }
    Ok(())
}

fn artifact(target: &str, release: bool, kind: Option<&str>, name: &str) -> PathBuf {
    let profile = if release { "release" } else { "debug" };
    let mut path = project_root().join("target").join(target).join(profile);
    if let Some(kind) = kind {
        path.push(kind);
    }
    path.join(name)
}

/// Build a testsuite example and return the path to the ELF.
pub fn build_example(example: &str, release: bool) -> Result<PathBuf> {
    cargo_build("testsuite", QEMU_TARGET, release, &["--example", example])?;
    Ok(artifact(QEMU_TARGET, release, Some("examples"), example))
}

/// Build the board image and return the path to the ELF.
pub fn build_firmware(release: bool) -> Result<PathBuf> {
    cargo_build("firmware", BOARD_TARGET, release, &[])?;
    Ok(artifact(BOARD_TARGET, release, None, "firmware"))
}

/// Names of all examples in `testsuite/examples`, sorted.
pub fn discover_examples() -> Result<Vec<String>> {
    let dir = project_root().join("testsuite").join("examples");
    let entries = fs::read_dir(&dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?;

    let mut examples = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "rs") {
            examples.extend(path.file_stem().map(|s| s.to_string_lossy().into_owned()));
        }
    }
    examples.sort();
    Ok(examples)
}
