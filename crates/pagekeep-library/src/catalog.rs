// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document catalog (`documents.json`): what the library knows about each
// PDF beyond the file itself. Keyed by storage filename so identity,
// display name and tags survive rescans of the storage root.

use std::path::Path;

use chrono::{DateTime, Utc};
use pagekeep_core::DocumentId;
use pagekeep_core::error::{PagekeepError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::folders::write_json_atomic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub file_name: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Read the catalog. Absent means empty; anything unparsable is
/// `CatalogCorrupt`.
pub fn load_catalog(path: &Path) -> Result<Vec<DocumentRecord>> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| PagekeepError::CatalogCorrupt(format!("{}: {e}", path.display()))),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no document catalog yet");
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn save_catalog(path: &Path, records: &[DocumentRecord]) -> Result<()> {
    write_json_atomic(path, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("documents.json");
        let record = DocumentRecord {
            id: DocumentId::new(),
            file_name: "scan-20250101-100000.pdf".into(),
            display_name: "Lease".into(),
            created_at: Utc::now(),
            tags: vec!["home".into()],
        };
        save_catalog(&path, std::slice::from_ref(&record)).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("displayName"));
        assert_eq!(load_catalog(&path).expect("load"), vec![record]);
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("documents.json");
        let id = DocumentId::new();
        std::fs::write(
            &path,
            format!(
                r#"[{{"id":"{id}","fileName":"a.pdf","displayName":"A","createdAt":"2025-01-01T10:00:00Z"}}]"#
            ),
        )
        .expect("write");
        let records = load_catalog(&path).expect("load");
        assert!(records[0].tags.is_empty());
    }

    #[test]
    fn absent_is_empty_and_garbage_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("documents.json");
        assert!(load_catalog(&path).expect("absent").is_empty());
        std::fs::write(&path, b"[{").expect("write");
        assert!(matches!(load_catalog(&path), Err(PagekeepError::CatalogCorrupt(_))));
    }
}
