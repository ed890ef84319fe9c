//! Capture-then-composite pipeline
//!
//! The only entry point outer layers use. A request is validated before it
//! gets here; the pipeline assigns an id, captures, composites, persists and
//! registers the artifact. The raw capture's temporary file is removed on
//! every exit path and nothing is registered unless every step succeeded.

use crate::capture::CaptureBackend;
use crate::compose::Compositor;
use crate::config::PipelineConfig;
use crate::store::{ArtifactStore, MemoryArtifactStore};
use crate::{CaptureRequest, DeviceKind, Error, Quality, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Metadata for a finished mockup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockupArtifact {
    pub id: String,
    pub source_url: String,
    /// Where the PNG was written
    pub output_location: PathBuf,
    /// Path a download handler serves the file under
    pub download_path: String,
    /// Always the frame template's native width
    pub width: u32,
    /// Always the frame template's native height
    pub height: u32,
    pub byte_size: u64,
    /// Hex SHA-256 of the persisted bytes
    pub sha256: String,
    pub device: DeviceKind,
    pub quality: Quality,
    pub created_at: DateTime<Utc>,
}

/// Sequences capture and compositing for each request.
pub struct Pipeline {
    config: PipelineConfig,
    backend: Arc<dyn CaptureBackend>,
    store: Arc<dyn ArtifactStore>,
    compositor: Compositor,
}

impl Pipeline {
    /// Create a pipeline backed by an in-memory artifact registry.
    pub fn new(config: PipelineConfig, backend: Arc<dyn CaptureBackend>) -> Result<Self> {
        Self::with_store(config, backend, Arc::new(MemoryArtifactStore::new()))
    }

    /// Create a pipeline with an explicit artifact registry. Creates the
    /// scratch and output directories.
    pub fn with_store(
        config: PipelineConfig,
        backend: Arc<dyn CaptureBackend>,
        store: Arc<dyn ArtifactStore>,
    ) -> Result<Self> {
        for dir in [&config.temp_dir, &config.output_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::Filesystem(format!("Failed to create {}: {}", dir.display(), e)))?;
        }

        let compositor = Compositor::new(config.assets_dir.clone());
        Ok(Self {
            config,
            backend,
            store,
            compositor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Run one request end to end.
    ///
    /// Dropping the returned future does not stop an in-flight capture or
    /// composite; those run to completion on the blocking pool.
    pub async fn generate(&self, request: &CaptureRequest) -> Result<MockupArtifact> {
        let id = Uuid::new_v4().to_string();
        let profile = self.config.profiles.get(request.device()).clone();
        let quality = request.quality();
        info!(
            "Generating mockup {} for {} ({}, {})",
            id,
            request.target_url(),
            request.device(),
            quality
        );

        let temp = TempCapture::new(self.temp_path(&id));

        let backend = Arc::clone(&self.backend);
        let url = request.target_url().to_string();
        let capture_profile = profile.clone();
        let raw = tokio::task::spawn_blocking(move || backend.capture(&url, &capture_profile, quality))
            .await
            .map_err(|e| Error::Navigation(format!("Capture task failed: {}", e)))??;
        debug!("Captured {} bytes for {}", raw.len(), id);

        // Compose from the persisted copy so the raw buffer is released early
        temp.write(&raw)?;
        drop(raw);

        let compositor = self.compositor.clone();
        let source = temp.path.clone();
        let composite = tokio::task::spawn_blocking(move || {
            let raw = read_capture(&source)?;
            compositor.compose(&raw, &profile)
        })
            .await
            .map_err(|e| Error::Compositing(format!("Compositing task failed: {}", e)))??;

        let output = self.output_path(&id);
        write_artifact(&output, &composite.bytes)?;

        let artifact = MockupArtifact {
            download_path: format!("/api/mockups/{}/download", id),
            source_url: request.target_url().to_string(),
            output_location: output,
            width: composite.width,
            height: composite.height,
            byte_size: composite.byte_size(),
            sha256: hex::encode(Sha256::digest(&composite.bytes)),
            device: request.device(),
            quality,
            created_at: Utc::now(),
            id,
        };
        self.store.put(artifact.clone());

        info!(
            "Mockup {} ready: {}x{}, {} bytes",
            artifact.id, artifact.width, artifact.height, artifact.byte_size
        );
        Ok(artifact)
    }

    /// Path of a registered artifact's file, if both the registration and
    /// the file exist.
    pub fn locate_artifact(&self, id: &str) -> Option<PathBuf> {
        // Ids are always UUIDs; anything else never names a file of ours
        Uuid::parse_str(id).ok()?;
        self.store.get(id)?;
        let path = self.output_path(id);
        path.is_file().then_some(path)
    }

    /// Metadata of a registered artifact.
    pub fn artifact(&self, id: &str) -> Option<MockupArtifact> {
        self.store.get(id)
    }

    pub fn output_path(&self, id: &str) -> PathBuf {
        self.config.output_dir.join(format!("mockup-{}.png", id))
    }

    pub fn temp_path(&self, id: &str) -> PathBuf {
        self.config.temp_dir.join(format!("screenshot-{}.png", id))
    }
}

fn read_capture(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        Error::Filesystem(format!("Failed to read temporary capture {}: {}", path.display(), e))
    })
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Err(e) = std::fs::write(path, bytes) {
        // Never leave a partially written mockup behind
        let _ = std::fs::remove_file(path);
        return Err(Error::Filesystem(format!(
            "Failed to write mockup {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}

/// Raw capture on disk for the duration of one request. Removed on drop.
struct TempCapture {
    path: PathBuf,
}

impl TempCapture {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        std::fs::write(&self.path, bytes).map_err(|e| {
            Error::Filesystem(format!(
                "Failed to write temporary capture {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Drop for TempCapture {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary capture {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove temporary capture {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
