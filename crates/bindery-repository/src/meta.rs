//! Revision metadata: labels and annotations persisted independently of
//! package content.
//!
//! Metadata presence is the source of truth for revision visibility: the
//! engine writes the file set first (draft close), then the metadata
//! record, and hides revisions whose record is missing.

use crate::{fsync_dir, RepositoryError};
use bindery_schema::ObjectName;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::trace;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevisionMeta {
    pub name: ObjectName,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub created_at: String,
    pub updated_at: String,
    /// Blake3 checksum for integrity verification. `None` for records
    /// written before checksums were introduced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl PackageRevisionMeta {
    pub fn new(name: ObjectName, namespace: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            name,
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
            checksum: None,
        }
    }

    /// Checksum over the record content, excluding the checksum field itself.
    fn compute_checksum(&self) -> Result<String, RepositoryError> {
        let mut copy = self.clone();
        copy.checksum = None;
        let json = serde_json::to_string_pretty(&copy)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Owns revision labels and annotations, keyed by (namespace, object name).
pub trait MetadataStore: Send + Sync {
    fn get(
        &self,
        namespace: &str,
        name: &ObjectName,
    ) -> Result<PackageRevisionMeta, RepositoryError>;

    fn create(
        &self,
        meta: PackageRevisionMeta,
    ) -> Result<PackageRevisionMeta, RepositoryError>;

    fn update(
        &self,
        meta: PackageRevisionMeta,
    ) -> Result<PackageRevisionMeta, RepositoryError>;

    fn delete(&self, namespace: &str, name: &ObjectName) -> Result<(), RepositoryError>;

    fn list(&self, namespace: &str) -> Result<Vec<PackageRevisionMeta>, RepositoryError>;
}

/// Filesystem-backed metadata store: one JSON record per revision under
/// `<root>/<namespace>/<name>.json`, written atomically and checksummed.
pub struct FsMetadataStore {
    root: PathBuf,
}

impl FsMetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn record_path(&self, namespace: &str, name: &ObjectName) -> PathBuf {
        // Object names may embed subpackage paths; keep records flat.
        let file = format!("{}.json", name.replace('/', "_"));
        self.namespace_dir(namespace).join(file)
    }

    /// Take the store-wide writer lease. Record writes rename into the
    /// shared namespace directories and fsync them, so mutating operations
    /// from concurrent processes are serialised here; readers never take
    /// the lease.
    fn exclusive_writer(&self) -> Result<WriterLease, RepositoryError> {
        fs::create_dir_all(&self.root)?;
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(".writers"))?;
        file.lock_exclusive().map_err(|e| {
            RepositoryError::LockFailed(format!(
                "metadata store at {}: {e}",
                self.root.display()
            ))
        })?;
        trace!("writer lease taken on {}", self.root.display());
        Ok(WriterLease { file })
    }

    fn write_record(&self, meta: &PackageRevisionMeta) -> Result<PackageRevisionMeta, RepositoryError> {
        let dir = self.namespace_dir(&meta.namespace);
        fs::create_dir_all(&dir)?;
        let dest = self.record_path(&meta.namespace, &meta.name);

        let mut record = meta.clone();
        record.checksum = Some(record.compute_checksum()?);
        let content = serde_json::to_string_pretty(&record)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| RepositoryError::Io(e.error))?;
        fsync_dir(&dir)?;

        Ok(record)
    }

    fn read_record(&self, path: &Path) -> Result<PackageRevisionMeta, RepositoryError> {
        let content = fs::read_to_string(path)?;
        let meta: PackageRevisionMeta = serde_json::from_str(&content)?;

        if let Some(ref expected) = meta.checksum {
            let actual = meta.compute_checksum()?;
            if actual != *expected {
                return Err(RepositoryError::IntegrityFailure {
                    name: meta.name.to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok(meta)
    }
}

/// Held for the duration of one mutating metadata operation; the advisory
/// lock is released when the lease drops.
struct WriterLease {
    file: fs::File,
}

impl Drop for WriterLease {
    fn drop(&mut self) {
        if self.file.unlock().is_err() {
            // The fd closes right after, which releases the lock anyway.
            trace!("writer lease unlock failed");
        }
    }
}

impl MetadataStore for FsMetadataStore {
    fn get(
        &self,
        namespace: &str,
        name: &ObjectName,
    ) -> Result<PackageRevisionMeta, RepositoryError> {
        let path = self.record_path(namespace, name);
        if !path.exists() {
            return Err(RepositoryError::MetadataNotFound(name.to_string()));
        }
        self.read_record(&path)
    }

    fn create(
        &self,
        mut meta: PackageRevisionMeta,
    ) -> Result<PackageRevisionMeta, RepositoryError> {
        let _writer = self.exclusive_writer()?;
        let path = self.record_path(&meta.namespace, &meta.name);
        if path.exists() {
            return Err(RepositoryError::AlreadyExists(meta.name.to_string()));
        }
        let now = chrono::Utc::now().to_rfc3339();
        meta.created_at = now.clone();
        meta.updated_at = now;
        self.write_record(&meta)
    }

    fn update(
        &self,
        mut meta: PackageRevisionMeta,
    ) -> Result<PackageRevisionMeta, RepositoryError> {
        let _writer = self.exclusive_writer()?;
        let existing = self.get(&meta.namespace, &meta.name)?;
        meta.created_at = existing.created_at;
        meta.updated_at = chrono::Utc::now().to_rfc3339();
        self.write_record(&meta)
    }

    fn delete(&self, namespace: &str, name: &ObjectName) -> Result<(), RepositoryError> {
        let _writer = self.exclusive_writer()?;
        let path = self.record_path(namespace, name);
        if !path.exists() {
            return Err(RepositoryError::MetadataNotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn list(&self, namespace: &str) -> Result<Vec<PackageRevisionMeta>, RepositoryError> {
        let dir = self.namespace_dir(namespace);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_str().unwrap_or("");
            if name_str.starts_with('.') || !name_str.ends_with(".json") {
                continue;
            }
            match self.read_record(&entry.path()) {
                Ok(meta) => results.push(meta),
                Err(e) => {
                    tracing::warn!("skipping corrupted metadata record '{name_str}': {e}");
                }
            }
        }
        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }
}
