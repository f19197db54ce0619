use crate::capture::ArtifactRef;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Screenshot {
    pub png: Bytes,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Recording {
    /// VP8 track in an IVF container.
    pub video: Bytes,
    /// Opus track in an Ogg container.
    pub audio: Bytes,
    pub started_at: DateTime<Utc>,
    /// Measured between the start and stop calls, not derived from the data.
    pub duration: Duration,
    pub slices: usize,
}

#[derive(Debug, Clone)]
pub enum ArtifactContent {
    Screenshot(Screenshot),
    Recording(Recording),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Local,
    Persisted(ArtifactRef),
}

#[derive(Debug, Clone)]
pub struct CaptureArtifact {
    pub id: ArtifactId,
    pub content: ArtifactContent,
    pub persistence: Persistence,
}

impl CaptureArtifact {
    pub fn new(content: ArtifactContent) -> Self {
        Self {
            id: ArtifactId::new(),
            content,
            persistence: Persistence::Local,
        }
    }

    pub fn reference(&self) -> Option<&ArtifactRef> {
        match &self.persistence {
            Persistence::Persisted(r) => Some(r),
            Persistence::Local => None,
        }
    }
}

/// Captured artifacts, most recent first.
#[derive(Debug, Default)]
pub struct ArtifactList {
    items: VecDeque<CaptureArtifact>,
}

impl ArtifactList {
    pub fn push_newest(&mut self, artifact: CaptureArtifact) -> ArtifactId {
        let id = artifact.id;
        self.items.push_front(artifact);
        id
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&CaptureArtifact> {
        self.items.iter().find(|a| &a.id == id)
    }

    pub fn get_mut(&mut self, id: &ArtifactId) -> Option<&mut CaptureArtifact> {
        self.items.iter_mut().find(|a| &a.id == id)
    }

    pub fn remove(&mut self, id: &ArtifactId) -> Option<CaptureArtifact> {
        let index = self.items.iter().position(|a| &a.id == id)?;
        self.items.remove(index)
    }

    pub fn position(&self, id: &ArtifactId) -> Option<usize> {
        self.items.iter().position(|a| &a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptureArtifact> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
