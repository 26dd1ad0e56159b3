//! Generation guard - idempotent writes for persisted generated files
//!
//! Before touching a file the guard compares normalized old and new content:
//! line endings are canonicalized and any `Generated:` timestamp line is
//! replaced with a placeholder, so regenerating identical output never
//! rewrites a file. A file that differs is only overwritten in
//! [`WriteMode::Force`]; the default mode leaves it alone.
//!
//! Writes are blocking and must not run concurrently against the same path.

use crate::error::{Error, Result};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const TIMESTAMP_PLACEHOLDER: &str = "<timestamp>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Always write when content differs
    Force,
    /// Report what would happen, never write
    DryRun,
    /// Create missing files; leave existing files that differ untouched
    #[default]
    SkipExisting,
}

impl std::str::FromStr for WriteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "force" => Ok(WriteMode::Force),
            "dry-run" | "dryrun" => Ok(WriteMode::DryRun),
            "skip-existing" | "skip" => Ok(WriteMode::SkipExisting),
            other => Err(Error::Config(format!("Unknown write mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WriteOutcome {
    Created,
    Written,
    Unchanged,
    Skipped,
    WouldCreate,
    WouldWrite,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Written => "written",
            WriteOutcome::Unchanged => "unchanged",
            WriteOutcome::Skipped => "skipped",
            WriteOutcome::WouldCreate => "would create",
            WriteOutcome::WouldWrite => "would write",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WriteReport {
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

fn timestamp_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?mi)^([ \t]*(?://|#)[ \t]*generated(?: at)?:).*$").expect("valid timestamp regex")
    })
}

/// Canonicalize line endings and blank out generation timestamps
pub fn normalize(content: &str) -> String {
    let unified = content.replace("\r\n", "\n").replace('\r', "\n");
    timestamp_line()
        .replace_all(&unified, format!("${{1}} {}", TIMESTAMP_PLACEHOLDER).as_str())
        .into_owned()
}

/// Write `content` to `path` under `mode`
///
/// Any I/O failure is returned as-is; there is no retry and no attempt to
/// recover a partially written file.
pub fn write_file(path: &Path, content: &str, mode: WriteMode) -> Result<WriteReport> {
    let existing = match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::Io(e)),
    };

    let outcome = match existing {
        Some(old) if normalize(&old) == normalize(content) => WriteOutcome::Unchanged,
        Some(_) => match mode {
            WriteMode::Force => {
                std::fs::write(path, content).map_err(Error::Io)?;
                WriteOutcome::Written
            }
            WriteMode::DryRun => WriteOutcome::WouldWrite,
            WriteMode::SkipExisting => WriteOutcome::Skipped,
        },
        None => match mode {
            WriteMode::DryRun => WriteOutcome::WouldCreate,
            WriteMode::Force | WriteMode::SkipExisting => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(Error::Io)?;
                }
                std::fs::write(path, content).map_err(Error::Io)?;
                WriteOutcome::Created
            }
        },
    };

    tracing::debug!(path = %path.display(), %outcome, "guarded write");
    Ok(WriteReport {
        path: path.to_path_buf(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const V1: &str = "// <auto-generated/>\n// Generated: 2026-01-01T00:00:00Z\nclass A {}\n";
    const V1_LATER: &str = "// <auto-generated/>\r\n// Generated: 2026-03-04T05:06:07Z\r\nclass A {}\r\n";
    const V2: &str = "// <auto-generated/>\n// Generated: 2026-01-01T00:00:00Z\nclass B {}\n";

    #[test]
    fn test_normalize_ignores_timestamp_and_line_endings() {
        assert_eq!(normalize(V1), normalize(V1_LATER));
        assert_ne!(normalize(V1), normalize(V2));
        assert!(normalize(V1).contains("// Generated: <timestamp>"));
    }

    #[test]
    fn test_second_write_with_new_timestamp_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("A.g.cs");

        let first = write_file(&path, V1, WriteMode::SkipExisting).unwrap();
        assert_eq!(first.outcome, WriteOutcome::Created);

        let second = write_file(&path, V1_LATER, WriteMode::Force).unwrap();
        assert_eq!(second.outcome, WriteOutcome::Unchanged);
        // No write happened: original bytes are still there
        assert_eq!(fs::read_to_string(&path).unwrap(), V1);
    }

    #[test]
    fn test_skip_existing_protects_edits() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("A.g.cs");
        fs::write(&path, V1).unwrap();

        let report = write_file(&path, V2, WriteMode::SkipExisting).unwrap();
        assert_eq!(report.outcome, WriteOutcome::Skipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), V1);
    }

    #[test]
    fn test_force_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("A.g.cs");
        fs::write(&path, V1).unwrap();

        let report = write_file(&path, V2, WriteMode::Force).unwrap();
        assert_eq!(report.outcome, WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), V2);
    }

    #[test]
    fn test_dry_run_never_writes() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.g.cs");
        let report = write_file(&missing, V1, WriteMode::DryRun).unwrap();
        assert_eq!(report.outcome, WriteOutcome::WouldCreate);
        assert!(!missing.exists());

        let existing = temp.path().join("A.g.cs");
        fs::write(&existing, V1).unwrap();
        let report = write_file(&existing, V2, WriteMode::DryRun).unwrap();
        assert_eq!(report.outcome, WriteOutcome::WouldWrite);
        assert_eq!(fs::read_to_string(&existing).unwrap(), V1);
    }

    #[test]
    fn test_write_mode_parsing() {
        assert_eq!("force".parse::<WriteMode>().unwrap(), WriteMode::Force);
        assert_eq!("dry-run".parse::<WriteMode>().unwrap(), WriteMode::DryRun);
        assert_eq!("skip-existing".parse::<WriteMode>().unwrap(), WriteMode::SkipExisting);
        assert!("merge".parse::<WriteMode>().is_err());
    }
}
