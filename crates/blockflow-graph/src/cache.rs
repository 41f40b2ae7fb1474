//! The resolution cache behind the graph's dirty flag.

use std::sync::Arc;

use crate::resolver::{Evaluator, Resolution};

/// Holds the last resolution until the graph changes.
///
/// Every successful graph mutation calls [`invalidate`](Self::invalidate).
/// The next request then runs a fresh pass, which first clears the
/// evaluator's memo so no result computed against the old graph survives.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    resolution: Option<Arc<Resolution>>,
    evaluator: Evaluator,
    passes: u64,
}

impl ResolutionCache {
    /// Creates an empty, invalid cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cached resolution.
    pub fn invalidate(&mut self) {
        if self.resolution.take().is_some() {
            tracing::debug!("resolution_cache: invalidated");
        }
    }

    /// Whether a resolution is cached.
    pub fn is_valid(&self) -> bool {
        self.resolution.is_some()
    }

    /// How many passes have run.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// The evaluator shared by resolution passes and parameter evaluation.
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub(crate) fn evaluator_mut(&mut self) -> &mut Evaluator {
        &mut self.evaluator
    }

    /// Returns the cached resolution, or runs `compute` to produce one.
    pub(crate) fn get_or_resolve<F>(&mut self, compute: F) -> Arc<Resolution>
    where
        F: FnOnce(&mut Evaluator) -> Resolution,
    {
        if let Some(resolution) = &self.resolution {
            return Arc::clone(resolution);
        }
        self.evaluator.clear_memo();
        self.passes += 1;
        tracing::debug!("resolution_cache: pass {}", self.passes);
        let resolution = Arc::new(compute(&mut self.evaluator));
        self.resolution = Some(Arc::clone(&resolution));
        resolution
    }
}
