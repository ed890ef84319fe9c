//! Artifact registry
//!
//! The pipeline registers every finished mockup here; download handlers look
//! artifacts up by id. Only successful requests are ever registered.

use crate::pipeline::MockupArtifact;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value registry of finished artifacts, keyed by id.
pub trait ArtifactStore: Send + Sync {
    fn put(&self, artifact: MockupArtifact);
    fn get(&self, id: &str) -> Option<MockupArtifact>;
}

/// In-memory registry; contents are lost on restart.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<String, MockupArtifact>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&self, artifact: MockupArtifact) {
        let mut g = self.artifacts.write().unwrap_or_else(|e| e.into_inner());
        g.insert(artifact.id.clone(), artifact);
    }

    fn get(&self, id: &str) -> Option<MockupArtifact> {
        self.artifacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}
