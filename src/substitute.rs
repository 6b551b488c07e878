//! Username-to-organization substitution for staff-submitted records.
//!
//! Two of the reporting queries expose the Service BC staff username that
//! handled a record. The report audience works in office names, so those
//! columns are rewritten from a static table after the merge. Values not in
//! the table pass through unchanged.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// The static username-to-office table, in report display order.
pub static SUBSTITUTIONS: &[(&str, &str)] = &[
    ("ACHAN", "Service BC - Victoria"),
    ("BDESAI", "Service BC - Nanaimo"),
    ("CFRASER", "Service BC - Kelowna"),
    ("DGILL", "Service BC - Kamloops"),
    ("EHARRIS", "Service BC - Prince George"),
    ("FKAUR", "Service BC - Surrey"),
    ("GLEUNG", "Service BC - Cranbrook"),
];

static SUBSTITUTION_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SUBSTITUTIONS.iter().copied().collect());

pub fn substitution_map() -> &'static HashMap<&'static str, &'static str> {
    &SUBSTITUTION_MAP
}

/// One row of the substitution table as rendered in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionEntry {
    pub username: String,
    pub organization: String,
}

pub fn entries() -> Vec<SubstitutionEntry> {
    SUBSTITUTIONS
        .iter()
        .map(|(username, organization)| SubstitutionEntry {
            username: username.to_string(),
            organization: organization.to_string(),
        })
        .collect()
}

/// Rewrite the named column of a merged CSV in place, replacing mapped
/// usernames with their organization names. Row-preserving; returns the
/// data-row count. The file is replaced atomically via a temp file in the
/// same directory.
pub fn apply(path: &Path, column: &str) -> Result<u64> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let index = headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| {
            Error::Other(format!(
                "column '{}' not present in {}",
                column,
                path.display()
            ))
        })?;

    let parent = path.parent().ok_or_else(|| {
        Error::Other(format!("no parent directory for {}", path.display()))
    })?;
    let tmp = NamedTempFile::new_in(parent)?;
    let mut rows = 0u64;

    {
        let mut writer = csv::Writer::from_writer(tmp.as_file());
        writer.write_record(&headers)?;
        for record in reader.records() {
            let record = record?;
            let mut fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            if let Some(organization) = SUBSTITUTION_MAP.get(fields[index].as_str()) {
                fields[index] = (*organization).to_string();
            }
            writer.write_record(&fields)?;
            rows += 1;
        }
        writer.flush()?;
    }

    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    debug!(rows, column, path = %path.display(), "substitution applied");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_table_has_seven_entries() {
        assert_eq!(SUBSTITUTIONS.len(), 7);
        assert_eq!(substitution_map().len(), 7);
        assert_eq!(entries().len(), 7);
    }

    #[test]
    fn test_mapped_usernames_are_replaced() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "applications.csv",
            "application_number,submitter_username\nAPP-1,ACHAN\nAPP-2,BDESAI\n",
        );

        let rows = apply(&path, "submitter_username").unwrap();
        assert_eq!(rows, 2);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Service BC - Victoria"));
        assert!(content.contains("Service BC - Nanaimo"));
        assert!(!content.contains("ACHAN"));
    }

    #[test]
    fn test_unmapped_values_pass_through() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "applications.csv",
            "application_number,submitter_username\nAPP-1,host-public-user\nAPP-2,\n",
        );

        let rows = apply(&path, "submitter_username").unwrap();
        assert_eq!(rows, 2);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("host-public-user"));
    }

    #[test]
    fn test_apply_is_idempotent_outside_the_map() {
        // Already-substituted office names are not usernames, so a second
        // pass leaves the file unchanged.
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "applications.csv",
            "application_number,submitter_username\nAPP-1,ACHAN\n",
        );

        apply(&path, "submitter_username").unwrap();
        let first = fs::read_to_string(&path).unwrap();
        apply(&path, "submitter_username").unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_only_the_named_column_is_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "applications.csv",
            "note,submitter_username\nACHAN,ACHAN\n",
        );

        apply(&path, "submitter_username").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("ACHAN,Service BC - Victoria"));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "accounts.csv", "sbc_account_id\n1001\n");
        assert!(apply(&path, "submitter_username").is_err());
    }
}
