//! Contract Store
//!
//! Owns the per-endpoint artifacts:
//!
//! ```text
//! <schema_dir>/
//! ├── products-contract.schema.json    last accepted schema
//! └── products-generated.schema.json   latest inferred schema
//! <json_dir>/
//! └── products-sample.json             last raw payload
//! ```
//!
//! Every write goes to a temp file in the target directory and is renamed into
//! place, so readers never observe a partially written artifact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::endpoint::EndpointId;
use crate::error::{ContractError, Result, StoreError};
use crate::schema::{to_artifact_json, Schema};

/// The two schema slots kept per endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Last schema a human accepted
    Contract,
    /// Schema inferred from the latest sample
    Generated,
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct ContractStore {
    schema_dir: PathBuf,
    json_dir: PathBuf,
}

impl ContractStore {
    /// Open a store, creating its directories
    pub fn open(schema_dir: impl Into<PathBuf>, json_dir: impl Into<PathBuf>) -> Result<Self> {
        let schema_dir = schema_dir.into();
        let json_dir = json_dir.into();
        for dir in [&schema_dir, &json_dir] {
            fs::create_dir_all(dir).map_err(|e| StoreError::new(dir, e))?;
        }
        Ok(Self {
            schema_dir,
            json_dir,
        })
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    /// Path of a schema artifact
    pub fn path(&self, id: &EndpointId, artifact: Artifact) -> PathBuf {
        match artifact {
            Artifact::Contract => self.schema_dir.join(id.contract_file()),
            Artifact::Generated => self.schema_dir.join(id.generated_file()),
        }
    }

    pub fn sample_path(&self, id: &EndpointId) -> PathBuf {
        self.json_dir.join(id.sample_file())
    }

    /// Load an artifact; `None` when it has never been written
    pub fn load(&self, id: &EndpointId, artifact: Artifact) -> Result<Option<Schema>> {
        let path = self.path(id, artifact);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::new(path, e).into()),
        };
        let schema = Schema::from_slice(&bytes).map_err(|e| {
            ContractError::InvalidSchema(format!("{}: {}", path.display(), e))
        })?;
        Ok(Some(schema))
    }

    /// Raw bytes of an artifact; `None` when absent
    pub fn read_bytes(&self, id: &EndpointId, artifact: Artifact) -> Result<Option<Vec<u8>>> {
        let path = self.path(id, artifact);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::new(path, e).into()),
        }
    }

    /// Checksum of an artifact's current bytes; `None` when absent
    pub fn checksum(&self, id: &EndpointId, artifact: Artifact) -> Result<Option<Checksum>> {
        Ok(self
            .read_bytes(id, artifact)?
            .map(|bytes| Checksum::from_bytes(&bytes)))
    }

    /// Write the generated slot
    pub fn save(&self, id: &EndpointId, schema: &Schema) -> Result<Checksum> {
        let text = schema.to_pretty_json()?;
        let path = self.path(id, Artifact::Generated);
        write_atomic(&path, text.as_bytes())?;
        info!(path = %path.display(), "generated schema written");
        Ok(Checksum::of_str(&text))
    }

    /// Snapshot the raw sample payload
    pub fn save_sample(&self, id: &EndpointId, sample: &Value) -> Result<PathBuf> {
        let text = to_artifact_json(sample)?;
        let path = self.sample_path(id);
        write_atomic(&path, text.as_bytes())?;
        debug!(path = %path.display(), "sample written");
        Ok(path)
    }

    /// Copy the generated artifact byte-for-byte into the contract slot.
    ///
    /// Safe to retry: an interrupted promotion leaves the previous contract in
    /// place, and re-running copies the same generated bytes.
    pub fn promote(&self, id: &EndpointId) -> Result<Checksum> {
        let source = self.path(id, Artifact::Generated);
        let bytes = fs::read(&source).map_err(|e| StoreError::new(&source, e))?;
        let expected = Checksum::from_bytes(&bytes);

        let target = self.path(id, Artifact::Contract);
        write_atomic(&target, &bytes)?;

        let written = fs::read(&target).map_err(|e| StoreError::new(&target, e))?;
        if !expected.verify(&written) {
            return Err(StoreError::new(
                &target,
                io::Error::new(io::ErrorKind::InvalidData, "contract does not match generated artifact after rename"),
            )
            .into());
        }
        info!(
            endpoint = %id,
            checksum = expected.short(),
            "generated schema promoted to contract"
        );
        Ok(expected)
    }
}

/// Write `bytes` to a sibling temp file, fsync, and rename over `path`
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::result::Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StoreError::new(&dir, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::new(&dir, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::new(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::new(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::new(path, e.error))?;
    Ok(())
}
