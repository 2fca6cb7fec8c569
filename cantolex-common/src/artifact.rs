//! Atomic artifact I/O
//!
//! Every stage handoff is a file on disk. Writes go through a temp file in
//! the destination directory followed by a rename, so a failure mid-write
//! leaves the predecessor's artifact authoritative and never a truncated one.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::{Error, Result};

/// Read a whole JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| Error::Artifact(format!("{}: {}", path.display(), e)))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::Artifact(format!("{}: {}", path.display(), e)))?;
    Ok(value)
}

/// Write a JSON artifact atomically (write-then-rename).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let parent = parent.unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(&temp);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    temp.persist(path)
        .map_err(|e| Error::Artifact(format!("persist {}: {}", path.display(), e)))?;
    Ok(())
}

/// Result of reading a JSON Lines file with per-line recovery.
pub struct JsonlReport<T> {
    pub entries: Vec<T>,
    /// Lines that failed to parse. Skipped and counted, never fatal.
    pub skipped: usize,
}

/// Read a JSON Lines file, skipping malformed lines.
///
/// The frequency counter emits one evidence entry per line; a single bad
/// line must not reject the whole corpus.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<JsonlReport<T>> {
    let file = File::open(path)
        .map_err(|e| Error::Artifact(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed evidence line"
                );
                skipped += 1;
            }
        }
    }
    Ok(JsonlReport { entries, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        word: String,
        n: u64,
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rows.json");
        let rows = vec![
            Row { word: "que".into(), n: 3 },
            Row { word: "vida".into(), n: 1 },
        ];

        write_json(&path, &rows).unwrap();
        let back: Vec<Row> = read_json(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn write_replaces_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        write_json(&path, &vec![Row { word: "a".into(), n: 1 }]).unwrap();
        write_json(&path, &vec![Row { word: "b".into(), n: 2 }]).unwrap();

        let back: Vec<Row> = read_json(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].word, "b");
    }

    #[test]
    fn jsonl_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.jsonl");
        std::fs::write(
            &path,
            "{\"word\":\"que\",\"n\":3}\nnot json at all\n\n{\"word\":\"vida\",\"n\":1}\n",
        )
        .unwrap();

        let report: JsonlReport<Row> = read_jsonl(&path).unwrap();
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let result: crate::Result<Vec<Row>> = read_json(&path);
        assert!(result.is_err());
    }
}
