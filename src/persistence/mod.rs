//! # Persistence Layer
//!
//! Reads the per-device parsed artifacts the collectors drop on disk
//! (YAML or JSON, one file per device) and persists the two state files of
//! the working directory: the normalization map and the topology snapshot.
//! All writes are atomic (write-temp-then-rename); a partial artifact is
//! never observable.

use crate::domain::{ArtifactSource, CoreError, ParsedDeviceArtifact};
use crate::normalize::NormalizationMaps;
use crate::topology::TopologySnapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File name of the persisted normalization map
pub const NORMALIZATION_MAP_FILE: &str = "normalization_map.json";
/// File name of the persisted topology snapshot
pub const TOPOLOGY_SNAPSHOT_FILE: &str = "topology_snapshot.json";

/// Parsed-artifact directory reader: one `<device>.yaml` / `.yml` /
/// `.json` file per device.
pub struct FsArtifactSource {
    dir: PathBuf,
}

impl FsArtifactSource {
    /// A source rooted at the collectors' output directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidate_paths(&self, device: &str) -> [PathBuf; 3] {
        [
            self.dir.join(format!("{device}.yaml")),
            self.dir.join(format!("{device}.yml")),
            self.dir.join(format!("{device}.json")),
        ]
    }
}

#[async_trait]
impl ArtifactSource for FsArtifactSource {
    async fn list_devices(&self) -> Result<Vec<String>, CoreError> {
        let mut devices = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_artifact = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml") | Some("json")
            );
            if !is_artifact {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                devices.push(stem.to_string());
            }
        }
        devices.sort();
        devices.dedup();
        tracing::debug!(count = devices.len(), dir = %self.dir.display(), "listed device artifacts");
        Ok(devices)
    }

    async fn load_device(&self, device: &str) -> Result<ParsedDeviceArtifact, CoreError> {
        for path in self.candidate_paths(device) {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path).await?;
            let artifact = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => serde_json::from_str(&raw)?,
                _ => serde_yaml::from_str(&raw)?,
            };
            return Ok(artifact);
        }
        Err(CoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no parsed artifact for device '{device}' in {}", self.dir.display()),
        )))
    }
}

/// Write a file atomically: temp file in the same directory, then rename.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent).await?;
    let tmp = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact"),
        uuid::Uuid::new_v4()
    ));
    tokio::fs::write(&tmp, contents).await?;
    if let Err(error) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(error.into());
    }
    Ok(())
}

/// The two persisted state files of a working directory
pub struct StateStore {
    work_dir: PathBuf,
}

impl StateStore {
    /// A store rooted at the working directory
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Load the persisted normalization map, if present
    pub async fn load_normalization_maps(&self) -> Result<Option<NormalizationMaps>, CoreError> {
        let path = self.work_dir.join(NORMALIZATION_MAP_FILE);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Persist the normalization map atomically
    pub async fn store_normalization_maps(&self, maps: &NormalizationMaps) -> Result<(), CoreError> {
        let path = self.work_dir.join(NORMALIZATION_MAP_FILE);
        let rendered = serde_json::to_vec_pretty(maps)?;
        write_atomic(&path, &rendered).await
    }

    /// Load the persisted topology snapshot, if present
    pub async fn load_snapshot(&self) -> Result<Option<TopologySnapshot>, CoreError> {
        let path = self.work_dir.join(TOPOLOGY_SNAPSHOT_FILE);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Persist the topology snapshot atomically
    pub async fn store_snapshot(&self, snapshot: &TopologySnapshot) -> Result<(), CoreError> {
        let path = self.work_dir.join(TOPOLOGY_SNAPSHOT_FILE);
        let rendered = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&path, &rendered).await
    }
}
