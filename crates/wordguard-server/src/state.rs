//! Application state for the API server.

use std::sync::Arc;

use wordguard_core::{Result as DetectorResult, SensitiveWordDetector};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Detector shared by all requests.
    pub detector: Arc<SensitiveWordDetector>,
    /// Maximum number of texts accepted by one batch request.
    pub max_batch_size: usize,
}

impl AppState {
    /// Default cap on texts per batch request.
    pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

    /// Creates application state around a detector.
    pub fn new(detector: Arc<SensitiveWordDetector>) -> Self {
        Self {
            detector,
            max_batch_size: Self::DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Creates application state with the bundled word list.
    pub fn with_default_words() -> DetectorResult<Self> {
        Ok(Self::new(Arc::new(SensitiveWordDetector::with_default_words()?)))
    }

    /// Sets the batch size cap.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }
}
