use async_trait::async_trait;
use homecall_client::{LocalMedia, MediaAcquisitionError, MediaSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Grants empty local media, or fails with a fixed error.
#[derive(Clone, Default)]
pub struct MockMediaSource {
    failure: Option<MediaAcquisitionError>,
    requests: Arc<AtomicUsize>,
}

impl MockMediaSource {
    pub fn granted() -> Self {
        Self::default()
    }

    pub fn denied() -> Self {
        Self {
            failure: Some(MediaAcquisitionError::PermissionDenied),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn acquire(&self) -> Result<LocalMedia, MediaAcquisitionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(LocalMedia::default()),
        }
    }
}
