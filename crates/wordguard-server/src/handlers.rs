//! API route handlers.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::models::{
    AddWordRequest, AddWordResponse, BatchCheckRequest, BatchCheckResponse, CheckRequest,
    CheckResponse, HealthResponse, RemoveWordResponse, SafeResponse, WordsResponse,
};
use crate::state::AppState;

/// POST /api/check - Scan one text.
pub async fn check_text(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>> {
    let start = Instant::now();
    let result = state.detector.detect(&req.text)?;
    let latency_us = start.elapsed().as_micros() as u64;

    debug!(
        chars = result.text_length,
        safe = result.is_safe,
        latency_us,
        "Checked text"
    );

    Ok(Json(CheckResponse { result, latency_us }))
}

/// POST /api/check/batch - Scan several texts.
pub async fn check_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchCheckRequest>,
) -> Result<Json<BatchCheckResponse>> {
    if req.texts.len() > state.max_batch_size {
        return Err(ApiError::BadRequest(format!(
            "batch of {} texts exceeds the limit of {}",
            req.texts.len(),
            state.max_batch_size
        )));
    }

    let results = state.detector.batch_detect(&req.texts);
    debug!(
        texts = results.len(),
        flagged = results.unsafe_count(),
        failed = results.failed_count(),
        "Checked batch"
    );

    Ok(Json(BatchCheckResponse { results }))
}

/// POST /api/safe - Gate a text before it reaches a language model.
pub async fn check_safe(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Json<SafeResponse> {
    Json(SafeResponse {
        safe: state.detector.is_safe_for_llm(&req.text),
    })
}

/// GET /api/words - List active terms.
pub async fn list_words(State(state): State<AppState>) -> Json<WordsResponse> {
    let words: Vec<String> = state.detector.get_sensitive_words().into_iter().collect();
    Json(WordsResponse {
        count: words.len(),
        words,
    })
}

/// POST /api/words - Add a term.
pub async fn add_word(
    State(state): State<AppState>,
    Json(req): Json<AddWordRequest>,
) -> Result<Json<AddWordResponse>> {
    let added = state.detector.add_sensitive_word(&req.word)?;
    let count = state.detector.word_count();
    info!(added, count, "Add word request");

    Ok(Json(AddWordResponse { added, count }))
}

/// DELETE /api/words/{word} - Remove a term.
pub async fn remove_word(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Json<RemoveWordResponse>> {
    let removed = state.detector.remove_sensitive_word(&word)?;
    let count = state.detector.word_count();
    info!(removed, count, "Remove word request");

    Ok(Json(RemoveWordResponse { removed, count }))
}

/// GET /api/health - Liveness check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        words: state.detector.word_count(),
    })
}
