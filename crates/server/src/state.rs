//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;
use vta_forum::{DateRange, Ingestor};
use vta_knowledge::{Answerer, ContentStore};

/// Forum refresh wiring for `POST /api/update`.
pub struct UpdateHandle {
    pub ingestor: Ingestor,
    pub range: DateRange,
    /// Held while an update runs
    pub running: Mutex<()>,
}

impl UpdateHandle {
    pub fn new(ingestor: Ingestor, range: DateRange) -> Self {
        Self {
            ingestor,
            range,
            running: Mutex::new(()),
        }
    }
}

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub answerer: Arc<Answerer>,
    /// `None` when the update endpoint is disabled
    pub update: Option<Arc<UpdateHandle>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>, answerer: Answerer) -> Self {
        Self {
            store,
            answerer: Arc::new(answerer),
            update: None,
        }
    }

    pub fn with_update(mut self, handle: UpdateHandle) -> Self {
        self.update = Some(Arc::new(handle));
        self
    }
}
