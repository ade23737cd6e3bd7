//! Comparing captured wire bytes against `testsuite/expected/<example>.wire`.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::build::project_root;

/// Outcome of checking one example's wire bytes.
pub enum Verdict {
    /// Bytes match the expected file.
    Pass,
    /// `--bless` wrote or confirmed the expected file.
    Blessed(&'static str),
    /// Bytes differ from the expected file.
    Mismatch { expected: Vec<u8> },
    /// No expected file and not blessing.
    Missing,
}

fn expected_path(example: &str) -> PathBuf {
    project_root()
        .join("testsuite")
        .join("expected")
        .join(format!("{example}.wire"))
}

/// Compare `actual` against the expected file, or update it when `bless` is set.
pub fn check_wire(example: &str, actual: &[u8], bless: bool) -> Result<Verdict> {
    let path = expected_path(example);

    if bless {
        let status = if path.exists() {
            if fs::read(&path)? == actual {
                "No change"
            } else {
                fs::write(&path, actual)?;
                "Updated"
            }
        } else {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&path, actual)?;
            "Created"
        };
        return Ok(Verdict::Blessed(status));
    }

    if !path.exists() {
        return Ok(Verdict::Missing);
    }

    let expected = fs::read(&path)?;
    if expected == actual {
        Ok(Verdict::Pass)
    } else {
        Ok(Verdict::Mismatch { expected })
    }
}

/// Render bytes for a terminal: printable ASCII as is, the rest escaped.
pub fn escape(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
