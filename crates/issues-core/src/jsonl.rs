//! JSONL snapshot I/O.
//!
//! Each line is either one tagged record (`{"kind":"issue",...}`) or a
//! sequence high-water mark (`{"sequence":"issues","value":7}`).

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IssuesError, Result};
use crate::store::Record;

#[derive(Debug, Serialize, Deserialize)]
struct SequenceLine {
    sequence: String,
    value: u64,
}

/// Records and sequences read back from a snapshot.
#[derive(Debug, Default)]
pub struct LoadedData {
    pub records: Vec<Record>,
    pub sequences: BTreeMap<String, u64>,
}

/// Load a snapshot from a JSONL file.
///
/// # Errors
///
/// Returns `FileNotFound` if the file is missing, `Io` if it cannot be read,
/// or `JsonlParse` if any line is invalid.
pub fn load(path: &Path) -> Result<LoadedData> {
    let file = fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IssuesError::FileNotFound(path.to_path_buf())
        } else {
            IssuesError::Io(e)
        }
    })?;
    let reader = BufReader::new(file);

    let mut loaded = LoadedData::default();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parse_err = |e: serde_json::Error| IssuesError::JsonlParse {
            line: line_num + 1,
            reason: e.to_string(),
        };

        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(parse_err)?;
        if value.get("sequence").is_some() {
            let seq: SequenceLine = serde_json::from_value(value).map_err(parse_err)?;
            loaded.sequences.insert(seq.sequence, seq.value);
        } else {
            let record: Record = serde_json::from_value(value).map_err(parse_err)?;
            loaded.records.push(record);
        }
    }

    Ok(loaded)
}

/// Save a snapshot to a JSONL file with atomic write.
///
/// Sequences are written first, then records in the order given. Uses
/// write-to-temp + rename for atomicity.
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn save(path: &Path, records: &[&Record], sequences: &BTreeMap<String, u64>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("jsonl.tmp");
    let mut file = fs::File::create(&tmp_path)?;

    for (name, value) in sequences {
        let line = SequenceLine {
            sequence: name.clone(),
            value: *value,
        };
        writeln!(file, "{}", serde_json::to_string(&line)?)?;
    }
    for record in records {
        writeln!(file, "{}", serde_json::to_string(record)?)?;
    }

    file.flush()?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, Repository};
    use chrono::Utc;

    fn sample_records() -> Vec<Record> {
        let now = Utc::now();
        vec![
            Record::Repository(Repository {
                owner: "acme".to_string(),
                name: "widget".to_string(),
                created_at: now,
            }),
            Record::Comment(Comment {
                id: 4,
                owner: "acme".to_string(),
                repo: "widget".to_string(),
                issue_number: 1,
                body: "hello".to_string(),
                user: "local-user".to_string(),
                created_at: now,
                updated_at: now,
                pinned: false,
            }),
        ]
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.jsonl");

        let records = sample_records();
        let refs: Vec<&Record> = records.iter().collect();
        let mut sequences = BTreeMap::new();
        sequences.insert("comments".to_string(), 4);

        save(&path, &refs, &sequences).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.records, records);
        assert_eq!(loaded.sequences.get("comments"), Some(&4));
    }

    #[test]
    fn test_lines_are_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.jsonl");
        let records = sample_records();
        let refs: Vec<&Record> = records.iter().collect();
        save(&path, &refs, &BTreeMap::new()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with(r#"{"kind":"repository""#));
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load(Path::new("/nonexistent/issues.jsonl"));
        assert!(matches!(result, Err(IssuesError::FileNotFound(_))));
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blanks.jsonl");
        fs::write(&path, "\n{\"sequence\":\"issues\",\"value\":3}\n\n").unwrap();

        let loaded = load(&path).unwrap();
        assert!(loaded.records.is_empty());
        assert_eq!(loaded.sequences.get("issues"), Some(&3));
    }

    #[test]
    fn test_load_reports_bad_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"sequence\":\"issues\",\"value\":1}\n{\"kind\":\"bogus\"}\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, IssuesError::JsonlParse { line: 2, .. }));
    }
}
