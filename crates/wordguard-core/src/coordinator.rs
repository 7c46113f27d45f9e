//! Keeps the active matcher consistent with the dictionary.
//!
//! ```text
//!            add/remove/load (content changed)
//!   Stable ───────────────────────────────────▶ Dirty
//!     ▲                                           │
//!     └──────── rebuild ok / rollback ◀───────────┘
//! ```
//!
//! The active [`CompiledMatcher`] sits behind an `Arc`. Compilation happens
//! outside the lock; only the pointer swap is done under the write lock, so a
//! detection that already cloned the `Arc` finishes on the matcher it started
//! with and no reader ever sees a half-built automaton.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dictionary::Dictionary;
use crate::error::RebuildError;
use crate::matcher::CompiledMatcher;

/// Whether the active matcher reflects the current dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherState {
    /// The active matcher was compiled from the current dictionary.
    Stable,
    /// The dictionary changed since the last compile.
    Dirty,
}

/// Owns the active matcher and swaps in rebuilt ones.
pub struct RebuildCoordinator {
    active: RwLock<Arc<CompiledMatcher>>,
    state: Mutex<MatcherState>,
    max_terms: usize,
    rebuilds: AtomicU64,
}

impl std::fmt::Debug for RebuildCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildCoordinator")
            .field("active", &*self.active.read())
            .field("state", &*self.state.lock())
            .field("max_terms", &self.max_terms)
            .field("rebuilds", &self.rebuilds.load(Ordering::Relaxed))
            .finish()
    }
}

impl RebuildCoordinator {
    /// Creates a coordinator around an initial matcher.
    pub fn new(initial: CompiledMatcher, max_terms: usize) -> Self {
        Self {
            active: RwLock::new(Arc::new(initial)),
            state: Mutex::new(MatcherState::Stable),
            max_terms,
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Returns the matcher to use for a detection.
    #[inline]
    pub fn current(&self) -> Arc<CompiledMatcher> {
        Arc::clone(&self.active.read())
    }

    /// Returns the current state.
    pub fn state(&self) -> MatcherState {
        *self.state.lock()
    }

    /// Records that the dictionary changed.
    pub fn mark_dirty(&self) {
        *self.state.lock() = MatcherState::Dirty;
    }

    /// Records that the dictionary is back in line with the active matcher.
    pub fn mark_stable(&self) {
        *self.state.lock() = MatcherState::Stable;
    }

    /// Compiles `snapshot` and swaps it in.
    ///
    /// On failure the previous matcher stays active and the state is left
    /// untouched for the caller to resolve.
    pub fn rebuild(&self, snapshot: &Dictionary) -> Result<Arc<CompiledMatcher>, RebuildError> {
        let compiled = match CompiledMatcher::compile(snapshot, self.max_terms) {
            Ok(compiled) => Arc::new(compiled),
            Err(e) => {
                warn!(
                    generation = snapshot.generation(),
                    terms = snapshot.len(),
                    error = %e,
                    "Matcher rebuild failed, keeping previous matcher"
                );
                return Err(e);
            }
        };

        *self.active.write() = Arc::clone(&compiled);
        *self.state.lock() = MatcherState::Stable;
        self.rebuilds.fetch_add(1, Ordering::Relaxed);

        debug!(
            generation = compiled.generation(),
            terms = compiled.term_count(),
            "Matcher rebuilt"
        );
        Ok(compiled)
    }

    /// Returns the number of successful rebuilds.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }
}
