//! QEMU runner for Cortex-M3 emulation.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Output from running QEMU.
pub struct QemuOutput {
    /// Whether the example exited through semihosting with success.
    pub success: bool,
    /// defmt frames from semihosting stdout.
    pub semihosting: Vec<u8>,
    /// QEMU's stderr, which also carries panic messages.
    pub stderr: Vec<u8>,
    /// Bytes that reached UART0, i.e. the simulated USART5 line.
    pub wire: Vec<u8>,
}

/// Run an ELF on the `lm3s6965evb` machine until it exits.
pub fn run_qemu(elf_path: &Path) -> Result<QemuOutput> {
    // Only UART0 is connected; a run that never transmits leaves it empty.
    let uart0 = NamedTempFile::new().context("Failed to create wire capture file")?;
    let uart0_path = uart0.path();

    let output = Command::new("qemu-system-arm")
        .args(["-cpu", "cortex-m3", "-machine", "lm3s6965evb"])
        .args(["-nographic", "-monitor", "none"])
        .args(["-semihosting-config", "enable=on,target=native"])
        .arg("-serial")
        .arg(format!("file:{}", uart0_path.display()))
        .arg("-kernel")
        .arg(elf_path)
        .stdin(Stdio::null())
        .output()
        .context("Failed to run qemu-system-arm")?;

    let wire = fs::read(uart0_path).unwrap_or_default();

    Ok(QemuOutput {
        success: output.status.success(),
        semihosting: output.stdout,
        stderr: output.stderr,
        wire,
    })
}
