//! API request and response models.

use serde::{Deserialize, Serialize};

use wordguard_core::{BatchResult, DetectionResult};

/// Request body for POST /api/check and POST /api/safe.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Text to scan.
    pub text: String,
}

/// Response body for POST /api/check.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    #[serde(flatten)]
    pub result: DetectionResult,
    /// Detection latency in microseconds.
    pub latency_us: u64,
}

/// Request body for POST /api/check/batch.
#[derive(Debug, Deserialize)]
pub struct BatchCheckRequest {
    pub texts: Vec<String>,
}

/// Response body for POST /api/check/batch.
#[derive(Debug, Serialize)]
pub struct BatchCheckResponse {
    /// One entry per input text, in input order.
    pub results: BatchResult,
}

/// Response body for POST /api/safe.
#[derive(Debug, Serialize)]
pub struct SafeResponse {
    pub safe: bool,
}

/// Response body for GET /api/words.
#[derive(Debug, Serialize)]
pub struct WordsResponse {
    pub count: usize,
    /// Active terms in sorted order.
    pub words: Vec<String>,
}

/// Request body for POST /api/words.
#[derive(Debug, Deserialize)]
pub struct AddWordRequest {
    pub word: String,
}

/// Response body for POST /api/words.
#[derive(Debug, Serialize)]
pub struct AddWordResponse {
    /// False if the word was already present.
    pub added: bool,
    /// Word count after the call.
    pub count: usize,
}

/// Response body for DELETE /api/words/{word}.
#[derive(Debug, Serialize)]
pub struct RemoveWordResponse {
    /// False if the word was not present.
    pub removed: bool,
    /// Word count after the call.
    pub count: usize,
}

/// Response body for GET /api/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub words: usize,
}
