// Binary snapshots of the bioactivity table
use atomicwrites::{AllowOverwrite, AtomicFile};
use bioinsight_core::{BioactivityRecord, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current on-disk snapshot layout
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    pub version: u32,
    /// Seconds since the Unix epoch
    pub created_at: u64,
    pub records: Vec<BioactivityRecord>,
}

impl DatasetSnapshot {
    pub fn new(records: Vec<BioactivityRecord>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            version: SNAPSHOT_VERSION,
            created_at,
            records,
        }
    }

    /// Write the snapshot so readers see either the old file or the new one
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = AtomicFile::new(path.as_ref(), AllowOverwrite);
        file.write(|f| {
            let mut writer = BufWriter::new(f);
            bincode::serialize_into(&mut writer, self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writer.flush()
        })
        .map_err(|e| Error::Storage(format!("failed to write snapshot: {}", e)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let snapshot: DatasetSnapshot = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::Serialization(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Storage(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }
}
