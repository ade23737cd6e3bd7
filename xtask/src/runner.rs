//! Test runner: build, run and judge one example.

use anyhow::Result;

use crate::build::build_example;
use crate::defmt;
use crate::qemu::run_qemu;
use crate::wire::{Verdict, check_wire, escape};

/// Options for running an example.
pub struct RunOptions {
    /// Print the log and the wire bytes (for `qemu` command).
    pub verbose: bool,
    /// Update expected files instead of comparing (for `test --bless`).
    pub bless: bool,
    /// Build in release mode.
    pub release: bool,
}

/// Run an example with the given options.
///
/// Returns `Ok(true)` if the example exited successfully and its wire bytes
/// match, `Ok(false)` otherwise.
pub fn run_example(example: &str, opts: &RunOptions) -> Result<bool> {
    println!("Building '{example}'...");
    let elf_path = build_example(example, opts.release)?;

    println!("Running in QEMU...");
    let output = run_qemu(&elf_path)?;
    let log = defmt::decode_output(&elf_path, &output.semihosting)?;
    if log.malformed() && output.success {
        println!("  FAIL: log ends in a malformed defmt frame");
        print!("{log}");
        return Ok(false);
    }

    if opts.verbose {
        print!("{log}");
        println!("--- QEMU run end ---");
        println!("wire ({} bytes): {}", output.wire.len(), escape(&output.wire));
    }

    if !output.success {
        println!("  FAIL: example exited with failure");
        if !opts.verbose {
            println!("--- log ---");
            print!("{log}");
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            println!("--- stderr ---");
            println!("{stderr}");
        }
        return Ok(false);
    }

    if opts.verbose {
        return Ok(true);
    }

    match check_wire(example, &output.wire, opts.bless)? {
        Verdict::Pass => {
            println!("  PASS");
            Ok(true)
        }
        Verdict::Blessed(status) => {
            println!("  {example}.wire: {status}");
            Ok(true)
        }
        Verdict::Mismatch { expected } => {
            println!("  FAIL: wire bytes differ from expected");
            println!("--- expected ---");
            println!("{}", escape(&expected));
            println!("--- actual ---");
            println!("{}", escape(&output.wire));
            println!("--- log ---");
            print!("{log}");
            Ok(false)
        }
        Verdict::Missing => {
            println!("  No expected wire file, run with --bless to create");
            println!("--- actual ---");
            println!("{}", escape(&output.wire));
            Ok(false)
        }
    }
}
