use query::QaSystem;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ApiError;

/// The document questions are currently answered against
pub struct ActiveDocument {
    pub name: String,
    pub qa: QaSystem,
}

/// Single active-document slot shared by every request.
///
/// Requests clone the `Arc` out and release the lock before doing any work,
/// so a swap never waits on a running question and a running question keeps
/// answering from the document it started with.
#[derive(Default)]
pub struct Session {
    active: RwLock<Option<Arc<ActiveDocument>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Arc<ActiveDocument>> {
        self.active.read().await.clone()
    }

    pub async fn require(&self) -> Result<Arc<ActiveDocument>, ApiError> {
        self.current().await.ok_or(ApiError::NoActiveDocument)
    }

    /// Replace the active document, history included
    pub async fn activate(&self, document: ActiveDocument) -> Arc<ActiveDocument> {
        let document = Arc::new(document);
        let previous = self.active.write().await.replace(Arc::clone(&document));
        info!(
            document = %document.name,
            previous = previous.as_ref().map(|d| d.name.as_str()).unwrap_or("none"),
            "activated document"
        );
        document
    }
}
