use std::sync::{Arc, Mutex};

use classify::ExtractionResult;

/// Results of a successful batch, in the order pipelines finished.
///
/// Read-only: export code iterates it and never needs to mutate it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    results: Vec<ExtractionResult>,
}

impl Aggregate {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractionResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[ExtractionResult] {
        &self.results
    }

    pub fn into_vec(self) -> Vec<ExtractionResult> {
        self.results
    }

    /// Sum of all costs, in whole currency units.
    pub fn total_cost(&self) -> i64 {
        self.results.iter().map(|r| r.cost).sum()
    }
}

impl From<Vec<ExtractionResult>> for Aggregate {
    fn from(results: Vec<ExtractionResult>) -> Self {
        Self { results }
    }
}

impl IntoIterator for Aggregate {
    type Item = ExtractionResult;
    type IntoIter = std::vec::IntoIter<ExtractionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a Aggregate {
    type Item = &'a ExtractionResult;
    type IntoIter = std::slice::Iter<'a, ExtractionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Append-only handle given to each pipeline.
#[derive(Debug, Clone)]
pub(crate) struct AggregateSink {
    inner: Arc<Mutex<Vec<ExtractionResult>>>,
}

impl AggregateSink {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The lock is held only for the push.
    pub(crate) fn append(&self, result: ExtractionResult) {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.push(result);
    }

    /// Moves everything appended so far into an [`Aggregate`].
    pub(crate) fn take(&self) -> Aggregate {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Aggregate::from(std::mem::take(&mut *guard))
    }
}
