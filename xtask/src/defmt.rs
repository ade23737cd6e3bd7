//! Decoding the defmt log an example writes to semihosting stdout.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use defmt_decoder::{DecodeError, Frame, Locations, Table};

/// Decoded log of one run.
pub struct Log {
    lines: Vec<String>,
    malformed: bool,
}

impl Log {
    /// Whether the stream ended in bytes that did not form a frame.
    ///
    /// Happens when the example dies halfway through a log call.
    pub fn malformed(&self) -> bool {
        self.malformed
    }
}

impl std::fmt::Display for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        if self.malformed {
            writeln!(f, "(log ends in a malformed frame)")?;
        }
        Ok(())
    }
}

/// Decode `raw` against the defmt table embedded in `elf_path`.
pub fn decode_output(elf_path: &Path, raw: &[u8]) -> Result<Log> {
    let elf = fs::read(elf_path)
        .with_context(|| format!("Failed to read {}", elf_path.display()))?;
    let table = Table::parse(&elf)
        .context("Failed to parse defmt table from ELF")?
        .ok_or_else(|| anyhow!("No defmt data found in {}", elf_path.display()))?;
    let locs = table.get_locations(&elf).ok();

    let mut decoder = table.new_stream_decoder();
    decoder.received(raw);

    let mut log = Log {
        lines: Vec::new(),
        malformed: false,
    };
    loop {
        match decoder.decode() {
            Ok(frame) => log.lines.push(render(&frame, locs.as_ref())),
            Err(DecodeError::UnexpectedEof) => break,
            Err(DecodeError::Malformed) => {
                log.malformed = true;
                break;
            }
        }
    }
    Ok(log)
}

fn render(frame: &Frame, locs: Option<&Locations>) -> String {
    let level = frame.level().map_or("print", |l| l.as_str()).to_uppercase();

    let mut line = String::new();
    if let Some(loc) = locs.and_then(|locs| locs.get(&frame.index())) {
        let file = loc
            .file
            .file_name()
            .map_or_else(|| loc.file.display().to_string(), |f| f.to_string_lossy().into_owned());
        let _ = write!(line, "{file}:{}: ", loc.line);
    }
    let _ = write!(line, "[{level:<5}] {}", frame.display_message());
    line
}
