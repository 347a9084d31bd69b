use ahash::AHashMap;
use bioinsight_core::{BioactivityRecord, CompiledPredicate, Error, Filter, RecordStore, Result};
use parking_lot::RwLock;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use crate::snapshot::DatasetSnapshot;

struct Table {
    rows: Vec<BioactivityRecord>,
    by_id: AHashMap<i64, usize>,
}

/// In-memory bioactivity table.
///
/// Rows are returned in insertion order. Re-inserting an `activity_id`
/// replaces the row in place.
pub struct StorageManager {
    table: RwLock<Table>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: Vec::new(),
                by_id: AHashMap::new(),
            }),
        }
    }

    pub fn from_records(records: Vec<BioactivityRecord>) -> Self {
        let manager = Self::new();
        manager.upsert(records);
        manager
    }

    /// Load a dataset: a `.json` array of rows, or a binary snapshot otherwise
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let records = if is_json {
            let file = File::open(path)?;
            serde_json::from_reader::<_, Vec<BioactivityRecord>>(BufReader::new(file))
                .map_err(|e| Error::Serialization(format!("{:?}: {}", path, e)))?
        } else {
            DatasetSnapshot::load(path)?.records
        };

        let manager = Self::from_records(records);
        info!("Loaded {} bioactivity records from {:?}", manager.len(), path);
        Ok(manager)
    }

    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let records = self.table.read().rows.clone();
        let count = records.len();
        DatasetSnapshot::new(records).save(path.as_ref())?;
        info!("Saved snapshot of {} records to {:?}", count, path.as_ref());
        Ok(())
    }

    pub fn upsert(&self, records: Vec<BioactivityRecord>) {
        let mut table = self.table.write();
        for record in records {
            match table.by_id.get(&record.activity_id).copied() {
                Some(index) => table.rows[index] = record,
                None => {
                    let index = table.rows.len();
                    table.by_id.insert(record.activity_id, index);
                    table.rows.push(record);
                }
            }
        }
    }

    #[inline]
    pub fn get(&self, activity_id: i64) -> Option<BioactivityRecord> {
        let table = self.table.read();
        table.by_id.get(&activity_id).map(|&i| table.rows[i].clone())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for StorageManager {
    fn query(&self, predicate: &CompiledPredicate, limit: usize) -> Result<Vec<BioactivityRecord>> {
        let table = self.table.read();
        Ok(table
            .rows
            .iter()
            .filter(|r| predicate.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioinsight_core::SearchFilter;
    use tempfile::TempDir;

    fn record(id: i64, mw: f64, active: i64) -> BioactivityRecord {
        BioactivityRecord {
            activity_id: id,
            compound_id: Some(format!("CHEMBL{}", id)),
            mw_freebase: mw,
            alogp: 2.5,
            psa: 70.0,
            hbd: 2,
            hba: 4,
            rtb: 3,
            is_active: active,
            target_name: None,
        }
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let store = StorageManager::from_records(vec![record(1, 200.0, 0), record(2, 300.0, 1)]);
        store.upsert(vec![record(1, 250.0, 1)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().mw_freebase, 250.0);
        assert!(store.get(99).is_none());
    }

    #[test]
    fn test_query_respects_predicate_order_and_limit() {
        let store = StorageManager::from_records(
            (0..10).map(|i| record(i, 100.0 * i as f64, i % 2)).collect(),
        );
        let predicate = SearchFilter {
            is_active: Some(1),
            ..Default::default()
        }
        .compile();
        let rows = store.query(&predicate, 3).unwrap();
        assert_eq!(rows.iter().map(|r| r.activity_id).collect::<Vec<_>>(), vec![1, 3, 5]);

        let all = store.query(&CompiledPredicate::universal(), 500).unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_load_json_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bioactivity.json");
        std::fs::write(
            &path,
            r#"[{"activity_id": 7, "compound_id": "CHEMBL7", "mw_freebase": 320.4, "alogp": 3.1,
                 "psa": 75.2, "hbd": 2, "hba": 5, "rtb": 4, "is_active": 1, "target_name": "EGFR"}]"#,
        )
        .unwrap();
        let store = StorageManager::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(7).unwrap().target_name.as_deref(), Some("EGFR"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bioactivity.bin");
        let store = StorageManager::from_records(vec![record(1, 200.0, 0), record(2, 300.0, 1)]);
        store.save_snapshot(&path).unwrap();

        let restored = StorageManager::load(&path).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(2), store.get(2));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(StorageManager::load(dir.path().join("absent.json")).is_err());
    }
}
