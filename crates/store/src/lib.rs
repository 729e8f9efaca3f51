//! Durable key-value store backed by [`redb`].
//!
//! The store is strictly optional: every caller treats it as best-effort
//! and continues in memory-only mode when it is absent or failing.
//! Values are JSON so the on-disk layout matches the documented
//! persistent-state shapes.
//!
//! # Tables
//!
//! | Name              | Key                | Value                          |
//! |-------------------|--------------------|--------------------------------|
//! | `trusted_sources` | domain (str)       | JSON `TrustedSource`           |
//! | `search_cache`    | query hash (str)   | JSON cache entry (opaque here) |
//! | `search_logs`     | sequence (u64)     | JSON `SearchLogEntry`          |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use sahayak_types::{SearchLogEntry, TrustedSource};

const SOURCES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("trusted_sources");
const CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("search_cache");
const LOGS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("search_logs");

pub struct SearchStore {
    db: Database,
    path: PathBuf,
}

impl SearchStore {
    /// Open or create the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)
            .with_context(|| format!("opening store at {}", path.display()))?;

        // Ensure tables exist.
        {
            let tx = db.begin_write()?;
            tx.open_table(SOURCES_TABLE)?;
            tx.open_table(CACHE_TABLE)?;
            tx.open_table(LOGS_TABLE)?;
            tx.commit()?;
        }

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Trusted sources ──────────────────────────────────────────────────────

    /// Upsert one source document, keyed by its normalised domain.
    /// Blocked domains are stored as sources with `source_type = Blocked`.
    pub fn put_source(&self, source: &TrustedSource) -> Result<()> {
        let bytes = serde_json::to_vec(source)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(SOURCES_TABLE)?;
            tbl.insert(source.domain.as_str(), bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove a source document.  Returns `true` if one existed.
    pub fn remove_source(&self, domain: &str) -> Result<bool> {
        let tx = self.db.begin_write()?;
        let existed = {
            let mut tbl = tx.open_table(SOURCES_TABLE)?;
            tbl.remove(domain)?.is_some()
        };
        tx.commit()?;
        Ok(existed)
    }

    /// All persisted source documents, skipping any that no longer parse.
    pub fn load_sources(&self) -> Result<Vec<TrustedSource>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(SOURCES_TABLE)?;
        let mut sources = Vec::new();
        for row in tbl.iter()? {
            let (_, value) = row?;
            match serde_json::from_slice::<TrustedSource>(value.value()) {
                Ok(source) => sources.push(source),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unparseable source document");
                }
            }
        }
        Ok(sources)
    }

    // ── Cache entries ────────────────────────────────────────────────────────

    pub fn put_cache(&self, hash: &str, value: &[u8]) -> Result<()> {
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(CACHE_TABLE)?;
            tbl.insert(hash, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_cache(&self, hash: &str) -> Result<Option<Vec<u8>>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(CACHE_TABLE)?;
        Ok(tbl.get(hash)?.map(|v| v.value().to_vec()))
    }

    pub fn remove_cache(&self, hash: &str) -> Result<bool> {
        let tx = self.db.begin_write()?;
        let existed = {
            let mut tbl = tx.open_table(CACHE_TABLE)?;
            tbl.remove(hash)?.is_some()
        };
        tx.commit()?;
        Ok(existed)
    }

    /// Snapshot of every cache row, for expiry sweeps.
    pub fn cache_entries(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(CACHE_TABLE)?;
        let mut entries = Vec::new();
        for row in tbl.iter()? {
            let (key, value) = row?;
            entries.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(entries)
    }

    pub fn cache_len(&self) -> Result<usize> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(CACHE_TABLE)?;
        Ok(tbl.len()? as usize)
    }

    /// Drop every cache row.  Returns how many were removed.
    pub fn clear_cache(&self) -> Result<usize> {
        let tx = self.db.begin_write()?;
        let removed = {
            let mut tbl = tx.open_table(CACHE_TABLE)?;
            let keys: Vec<String> = tbl
                .iter()?
                .filter_map(|r| r.ok().map(|(k, _)| k.value().to_string()))
                .collect();
            for key in &keys {
                tbl.remove(key.as_str())?;
            }
            keys.len()
        };
        tx.commit()?;
        Ok(removed)
    }

    // ── Search logs ──────────────────────────────────────────────────────────

    /// Append one outcome record under the next sequence number.
    pub fn append_log(&self, entry: &SearchLogEntry) -> Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(LOGS_TABLE)?;
            let next = tbl.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);
            tbl.insert(next, bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The most recent `limit` log records, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<SearchLogEntry>> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(LOGS_TABLE)?;
        let mut logs = Vec::new();
        for row in tbl.iter()?.rev().take(limit) {
            let (_, value) = row?;
            if let Ok(entry) = serde_json::from_slice::<SearchLogEntry>(value.value()) {
                logs.push(entry);
            }
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sahayak_types::{LogAction, ResultOrigin, SearchIntent, SourceType};

    fn open_temp() -> (tempfile::TempDir, SearchStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SearchStore::open(dir.path().join("store.redb")).unwrap();
        (dir, store)
    }

    fn sample_log(query: &str) -> SearchLogEntry {
        SearchLogEntry {
            query: query.to_string(),
            user_id: Some("u1".to_string()),
            timestamp: Utc::now(),
            intent: SearchIntent::JobQuery,
            score: 0.7,
            action: LogAction::SearchComplete,
            source: Some(ResultOrigin::Crawler),
            result_count: 3,
            duration_ms: 1200,
        }
    }

    #[test]
    fn source_round_trip() {
        let (_dir, store) = open_temp();
        let source = TrustedSource::new(
            "ssc.nic.in",
            SourceType::Official,
            "Staff Selection Commission",
            10,
            &["job", "result", "admit_card"],
        );
        store.put_source(&source).unwrap();

        let loaded = store.load_sources().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].domain, "ssc.nic.in");
        assert_eq!(loaded[0].priority, 10);
        assert_eq!(loaded[0].source_type, SourceType::Official);
    }

    #[test]
    fn remove_source_reports_existence() {
        let (_dir, store) = open_temp();
        let source = TrustedSource::new("x.gov.in", SourceType::Official, "X", 8, &[]);
        store.put_source(&source).unwrap();

        assert!(store.remove_source("x.gov.in").unwrap());
        assert!(!store.remove_source("x.gov.in").unwrap());
        assert!(store.load_sources().unwrap().is_empty());
    }

    #[test]
    fn cache_rows_are_opaque_bytes() {
        let (_dir, store) = open_temp();
        store.put_cache("ab12", br#"{"query":"hello"}"#).unwrap();

        let value = store.get_cache("ab12").unwrap().unwrap();
        assert_eq!(value, br#"{"query":"hello"}"#.to_vec());
        assert_eq!(store.cache_len().unwrap(), 1);

        assert!(store.remove_cache("ab12").unwrap());
        assert_eq!(store.get_cache("ab12").unwrap(), None);
    }

    #[test]
    fn clear_cache_removes_everything() {
        let (_dir, store) = open_temp();
        for i in 0..5 {
            store.put_cache(&format!("hash{i}"), b"{}").unwrap();
        }
        assert_eq!(store.clear_cache().unwrap(), 5);
        assert_eq!(store.cache_len().unwrap(), 0);
    }

    #[test]
    fn logs_append_in_sequence_and_read_newest_first() {
        let (_dir, store) = open_temp();
        store.append_log(&sample_log("first")).unwrap();
        store.append_log(&sample_log("second")).unwrap();
        store.append_log(&sample_log("third")).unwrap();

        let recent = store.recent_logs(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "third");
        assert_eq!(recent[1].query, "second");
    }
}
