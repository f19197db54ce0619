use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Stable reference returned by the persistence collaborator.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ArtifactRef(pub String);

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct UploadPart {
    pub payload: Bytes,
    pub content_type: &'static str,
}

/// One artifact, as one or more typed parts.
#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    pub parts: Vec<UploadPart>,
    pub captured_at: DateTime<Utc>,
    pub duration: Option<Duration>,
}

/// External persistence for capture artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, upload: ArtifactUpload) -> Result<ArtifactRef, StoreError>;

    async fn delete(&self, reference: ArtifactRef) -> Result<(), StoreError>;
}
