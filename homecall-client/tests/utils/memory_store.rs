use async_trait::async_trait;
use homecall_client::{ArtifactRef, ArtifactStore, ArtifactUpload, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory persistence collaborator.
#[derive(Clone, Default)]
pub struct MemoryArtifactStore {
    objects: Arc<Mutex<HashMap<ArtifactRef, ArtifactUpload>>>,
    next: Arc<Mutex<u64>>,
    fail_deletes: bool,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads succeed, deletes always fail.
    pub fn with_failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub async fn contains(&self, reference: &ArtifactRef) -> bool {
        self.objects.lock().await.contains_key(reference)
    }

    pub async fn get(&self, reference: &ArtifactRef) -> Option<ArtifactUpload> {
        self.objects.lock().await.get(reference).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, upload: ArtifactUpload) -> Result<ArtifactRef, StoreError> {
        let mut next = self.next.lock().await;
        *next += 1;
        let reference = ArtifactRef(format!("mem://artifact/{}", *next));
        self.objects.lock().await.insert(reference.clone(), upload);
        Ok(reference)
    }

    async fn delete(&self, reference: ArtifactRef) -> Result<(), StoreError> {
        if self.fail_deletes {
            return Err(StoreError::Unavailable("store offline".to_owned()));
        }
        match self.objects.lock().await.remove(&reference) {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownReference(reference.0)),
        }
    }
}
