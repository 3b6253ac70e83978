//! Expectation file reconciliation (§4.I, §6). Each test case's recorded
//! steps and stdout are serialized to a JSON file under the recipe's
//! expectation directory. Train mode rewrites mismatched files and deletes
//! unused ones atomically (write-to-temp, then rename); run mode only
//! reports mismatches and never touches disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationRecord {
    pub steps_ran: Vec<String>,
    pub annotations: Vec<String>,
}

impl ExpectationRecord {
    pub fn new(steps_ran: Vec<String>, annotations: Vec<String>) -> Self {
        Self { steps_ran, annotations }
    }
}

/// Reads an expectation file, or `None` if it doesn't exist yet (a new test
/// case with no recorded expectation).
pub fn load(path: &Path) -> io::Result<Option<ExpectationRecord>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let record: ExpectationRecord = serde_json::from_str(&contents)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            Ok(Some(record))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Writes `record` to `path` atomically: write to a sibling temp file in the
/// same directory, then rename over the destination so readers never see a
/// partial write.
pub fn write_atomic(path: &Path, record: &ExpectationRecord) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "expectation path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let body = serde_json::to_string_pretty(record).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    use std::io::Write;
    tmp.write_all(body.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Removes an expectation file that no longer corresponds to any generated
/// test case. Missing files are not an error (already gone).
pub fn remove(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Expectation files present on disk but not produced by this run's
/// generated test cases (§6 `unused_expectation_files`).
pub fn unused_files(existing: &BTreeSet<PathBuf>, used: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
    existing.difference(used).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn roundtrips_through_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.json");
        let record = ExpectationRecord::new(vec!["build".into()], vec!["ok".into()]);
        write_atomic(&path, &record).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn unused_files_is_set_difference() {
        let mut existing = BTreeSet::new();
        existing.insert(PathBuf::from("a.json"));
        existing.insert(PathBuf::from("b.json"));
        let mut used = BTreeSet::new();
        used.insert(PathBuf::from("a.json"));

        let unused = unused_files(&existing, &used);
        assert_eq!(unused, vec![PathBuf::from("b.json")]);
    }

    #[test]
    fn remove_of_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(remove(&path).is_ok());
    }
}
