// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folder records (`folders.json`).
//
// The current layout stores member files by bare filename:
//
//   [{"id": "...", "name": "Work", "createdAt": "2025-01-01T10:00:00Z",
//     "pdfFileNames": ["a.pdf", "b.pdf"]}]
//
// Older files stored absolute URLs under `pdfFileURLs` instead. Each record
// is decoded as the current layout first, then as the legacy one, and
// finally as a bare header with no members. Membership is always
// re-resolved against the storage root and entries for missing files are
// dropped, so a folder never fails to load because of stale members. A file
// belongs to at most one folder: the first record listing it keeps it.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use pagekeep_core::FolderId;
use pagekeep_core::error::{PagekeepError, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the epoch some
/// older records count `createdAt` from.
const REFERENCE_DATE_OFFSET: i64 = 978_307_200;

/// A named grouping of library files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Member storage filenames, relative to the storage root.
    pub file_names: Vec<String>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FolderId::new(),
            name: name.into(),
            created_at: Utc::now(),
            file_names: Vec::new(),
        }
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.file_names.iter().any(|f| f == file_name)
    }

    /// Add a member. Returns `false` if it was already present.
    pub fn insert(&mut self, file_name: &str) -> bool {
        if self.contains(file_name) {
            return false;
        }
        self.file_names.push(file_name.to_string());
        true
    }

    /// Drop a member. Returns `false` if it was not present.
    pub fn remove(&mut self, file_name: &str) -> bool {
        let before = self.file_names.len();
        self.file_names.retain(|f| f != file_name);
        before != self.file_names.len()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderRecord {
    id: FolderId,
    name: String,
    #[serde(with = "created_at")]
    created_at: DateTime<Utc>,
    pdf_file_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyFolderRecord {
    id: FolderId,
    name: String,
    #[serde(with = "created_at")]
    created_at: DateTime<Utc>,
    #[serde(rename = "pdfFileURLs")]
    pdf_file_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderHeader {
    id: FolderId,
    name: String,
    #[serde(with = "created_at")]
    created_at: DateTime<Utc>,
}

/// How one record was understood.
enum Decoded {
    Current(FolderRecord),
    Legacy(LegacyFolderRecord),
    HeaderOnly(FolderHeader),
}

fn decode_record(value: serde_json::Value) -> Option<Decoded> {
    if let Ok(record) = serde_json::from_value::<FolderRecord>(value.clone()) {
        return Some(Decoded::Current(record));
    }
    if let Ok(record) = serde_json::from_value::<LegacyFolderRecord>(value.clone()) {
        return Some(Decoded::Legacy(record));
    }
    serde_json::from_value::<FolderHeader>(value)
        .ok()
        .map(Decoded::HeaderOnly)
}

/// Result of reading `folders.json`.
#[derive(Debug, Default)]
pub struct LoadedFolders {
    pub folders: Vec<Folder>,
    /// The on-disk form was legacy or needed repair; write it back.
    pub needs_rewrite: bool,
}

/// Read folder records, migrating and repairing as needed.
///
/// A missing file is an empty list. A file that is not a JSON array is
/// `CatalogCorrupt`; individual unreadable records are skipped.
pub fn load_folders(path: &Path, storage_root: &Path) -> Result<LoadedFolders> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no folder records yet");
            return Ok(LoadedFolders::default());
        }
        Err(err) => return Err(err.into()),
    };

    let records: Vec<serde_json::Value> = serde_json::from_slice(&bytes)
        .map_err(|e| PagekeepError::CatalogCorrupt(format!("{}: {e}", path.display())))?;

    let mut loaded = LoadedFolders::default();
    let mut claimed = HashSet::new();
    for value in records {
        let (mut folder, migrated) = match decode_record(value) {
            Some(Decoded::Current(r)) => (
                Folder {
                    id: r.id,
                    name: r.name,
                    created_at: r.created_at,
                    file_names: r.pdf_file_names,
                },
                false,
            ),
            Some(Decoded::Legacy(r)) => {
                info!(folder = %r.name, "migrating legacy folder record");
                let file_names = r
                    .pdf_file_urls
                    .iter()
                    .filter_map(|url| file_name_from_url(url))
                    .collect();
                (
                    Folder {
                        id: r.id,
                        name: r.name,
                        created_at: r.created_at,
                        file_names,
                    },
                    true,
                )
            }
            Some(Decoded::HeaderOnly(h)) => {
                warn!(folder = %h.name, "folder membership unreadable; starting empty");
                (
                    Folder {
                        id: h.id,
                        name: h.name,
                        created_at: h.created_at,
                        file_names: Vec::new(),
                    },
                    true,
                )
            }
            None => {
                warn!(path = %path.display(), "skipping unreadable folder record");
                loaded.needs_rewrite = true;
                continue;
            }
        };

        let repaired = repair_membership(&mut folder, storage_root, &mut claimed);
        loaded.needs_rewrite |= migrated || repaired;
        loaded.folders.push(folder);
    }

    Ok(loaded)
}

/// Write folders in the current layout, replacing the file atomically.
pub fn save_folders(path: &Path, folders: &[Folder]) -> Result<()> {
    let records: Vec<FolderRecord> = folders
        .iter()
        .map(|f| FolderRecord {
            id: f.id,
            name: f.name.clone(),
            created_at: f.created_at,
            pdf_file_names: f.file_names.clone(),
        })
        .collect();
    write_json_atomic(path, &records)
}

pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Final path component of a legacy URL or path, percent-decoded.
fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last = without_query.trim_end_matches('/').rsplit('/').next()?;
    let decoded = percent_decode_str(last).decode_utf8().ok()?;
    let name = decoded.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Dedupe members, drop ones already `claimed` by an earlier folder and
/// ones that no longer resolve to a file. Returns whether anything changed.
fn repair_membership(
    folder: &mut Folder,
    storage_root: &Path,
    claimed: &mut HashSet<String>,
) -> bool {
    let before = folder.file_names.len();
    let folder_name = folder.name.clone();
    let mut seen = HashSet::new();
    folder.file_names.retain(|name| {
        let plain = !name.contains('/') && !name.contains('\\') && name != ".." && name != ".";
        if !plain || !seen.insert(name.clone()) {
            return false;
        }
        if claimed.contains(name) {
            warn!(file = %name, folder = %folder_name, "file already filed elsewhere; dropping");
            return false;
        }
        let present = storage_root.join(name).is_file();
        if present {
            claimed.insert(name.clone());
        } else {
            warn!(file = %name, "dropping folder member with no file");
        }
        present
    });
    before != folder.file_names.len()
}

/// `createdAt` is written as RFC 3339; older records may hold seconds since
/// 2001-01-01.
mod created_at {
    use super::*;
    use serde::{Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds(f64),
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(serde::de::Error::custom),
            Raw::Seconds(seconds) => {
                let out_of_range =
                    || <D::Error as serde::de::Error>::custom("createdAt out of range");
                let whole = seconds.floor();
                let nanos = ((seconds - whole) * 1e9) as u32;
                let secs = (whole as i64)
                    .checked_add(REFERENCE_DATE_OFFSET)
                    .ok_or_else(out_of_range)?;
                Utc.timestamp_opt(secs, nanos).single().ok_or_else(out_of_range)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, name: &str) {
        std::fs::write(root.join(name), b"%PDF-1.4").expect("write");
    }

    #[test]
    fn current_layout_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "f.pdf");
        let path = dir.path().join("folders.json");

        let mut folder = Folder::new("Work");
        assert!(folder.insert("f.pdf"));
        assert!(!folder.insert("f.pdf"));
        save_folders(&path, std::slice::from_ref(&folder)).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("pdfFileNames"));
        assert!(!raw.contains(dir.path().to_string_lossy().as_ref()));

        let loaded = load_folders(&path, dir.path()).expect("load");
        assert!(!loaded.needs_rewrite);
        assert_eq!(loaded.folders.len(), 1);
        assert_eq!(loaded.folders[0].id, folder.id);
        assert!(loaded.folders[0].contains("f.pdf"));
    }

    #[test]
    fn legacy_urls_migrate_without_duplicates() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "My Scan.pdf");
        let path = dir.path().join("folders.json");
        let id = FolderId::new();
        let legacy = format!(
            r#"[{{"id":"{id}","name":"Work","createdAt":700000000.5,
                "pdfFileURLs":["file:///old/install/Documents/My%20Scan.pdf",
                               "file:///other/root/My%20Scan.pdf"]}}]"#
        );
        std::fs::write(&path, legacy).expect("write");

        let loaded = load_folders(&path, dir.path()).expect("load");
        assert!(loaded.needs_rewrite);
        let folder = &loaded.folders[0];
        assert_eq!(folder.id, id);
        assert_eq!(folder.file_names, vec!["My Scan.pdf".to_string()]);
        assert_eq!(folder.created_at.timestamp(), 700_000_000 + REFERENCE_DATE_OFFSET);

        save_folders(&path, &loaded.folders).expect("save");
        let reloaded = load_folders(&path, dir.path()).expect("reload");
        assert!(!reloaded.needs_rewrite);
        assert_eq!(reloaded.folders[0].file_names, vec!["My Scan.pdf".to_string()]);
    }

    #[test]
    fn missing_members_are_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "kept.pdf");
        let path = dir.path().join("folders.json");

        let mut folder = Folder::new("Mixed");
        folder.insert("kept.pdf");
        folder.insert("gone.pdf");
        save_folders(&path, &[folder]).expect("save");

        let loaded = load_folders(&path, dir.path()).expect("load");
        assert!(loaded.needs_rewrite);
        assert_eq!(loaded.folders[0].file_names, vec!["kept.pdf".to_string()]);
    }

    #[test]
    fn unreadable_membership_keeps_folder_with_no_members() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("folders.json");
        let id = FolderId::new();
        let raw = format!(
            r#"[{{"id":"{id}","name":"Odd","createdAt":"2025-01-01T10:00:00Z","pdfFileNames":42}}]"#
        );
        std::fs::write(&path, raw).expect("write");

        let loaded = load_folders(&path, dir.path()).expect("load");
        assert_eq!(loaded.folders.len(), 1);
        assert_eq!(loaded.folders[0].name, "Odd");
        assert!(loaded.folders[0].file_names.is_empty());
    }

    #[test]
    fn absent_and_malformed_are_distinct() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("folders.json");

        let absent = load_folders(&path, dir.path()).expect("absent is fine");
        assert!(absent.folders.is_empty());

        std::fs::write(&path, b"{not json").expect("write");
        assert!(matches!(
            load_folders(&path, dir.path()),
            Err(PagekeepError::CatalogCorrupt(_))
        ));
    }

    #[test]
    fn file_listed_in_two_folders_stays_in_the_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "F.pdf");
        touch(dir.path(), "G.pdf");
        let path = dir.path().join("folders.json");

        let mut work = Folder::new("Work");
        work.insert("F.pdf");
        let mut home = Folder::new("Home");
        home.insert("F.pdf");
        home.insert("G.pdf");
        save_folders(&path, &[work, home]).expect("save");

        let loaded = load_folders(&path, dir.path()).expect("load");
        assert!(loaded.needs_rewrite);
        assert_eq!(loaded.folders[0].file_names, vec!["F.pdf".to_string()]);
        assert_eq!(loaded.folders[1].file_names, vec!["G.pdf".to_string()]);
    }

    #[test]
    fn huge_numeric_created_at_is_rejected_not_overflowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("folders.json");
        let raw = format!(
            r#"[{{"id":"{}","name":"Far","createdAt":1e300,"pdfFileNames":[]}}]"#,
            FolderId::new()
        );
        std::fs::write(&path, raw).expect("write");

        let loaded = load_folders(&path, dir.path()).expect("load");
        assert!(loaded.folders.is_empty());
        assert!(loaded.needs_rewrite);
    }

    #[test]
    fn legacy_url_parsing() {
        assert_eq!(
            file_name_from_url("file:///a/b/Tax%20Return%202024.pdf").as_deref(),
            Some("Tax Return 2024.pdf")
        );
        assert_eq!(file_name_from_url("/plain/path/x.pdf").as_deref(), Some("x.pdf"));
        assert_eq!(file_name_from_url("file:///a/b/").as_deref(), Some("b"));
        assert_eq!(file_name_from_url(""), None);
    }
}
