//! Choosing one instance when several are registered under a role.

use crate::instance::ServiceInstance;
use std::sync::Arc;

/// Type alias for custom selector functions.
///
/// Receives the candidates sorted by instance id and returns the index of the
/// chosen one, or `None` to report that no candidate is acceptable.
pub type CustomSelectorFn = Arc<dyn Fn(&[ServiceInstance]) -> Option<usize> + Send + Sync>;

/// Built-in selection strategies.
///
/// Candidates are always sorted by instance id before a strategy runs, so every
/// strategy is deterministic for a given registry snapshot. None of them
/// rotates between calls; round-robin is deliberately not offered.
#[derive(Clone, Default)]
pub enum SelectionStrategy {
    /// Pick the instance with the lexicographically lowest id.
    #[default]
    LowestInstanceId,

    /// Pick the instance with the most recent heartbeat.
    /// Ties go to the lowest instance id.
    MostRecentlySeen,

    /// Custom selection logic.
    Custom(CustomSelectorFn),
}

impl SelectionStrategy {
    /// Creates a custom strategy from a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[ServiceInstance]) -> Option<usize> + Send + Sync + 'static,
    {
        SelectionStrategy::Custom(Arc::new(f))
    }

    /// Selects one of `candidates`, which must already be sorted by id.
    pub(crate) fn select<'a>(&self, candidates: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        match self {
            SelectionStrategy::LowestInstanceId => candidates.first(),
            SelectionStrategy::MostRecentlySeen => candidates
                .iter()
                .rev()
                .max_by_key(|instance| instance.last_seen()),
            SelectionStrategy::Custom(f) => f(candidates).and_then(|idx| candidates.get(idx)),
        }
    }
}

impl std::fmt::Debug for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowestInstanceId => write!(f, "SelectionStrategy::LowestInstanceId"),
            Self::MostRecentlySeen => write!(f, "SelectionStrategy::MostRecentlySeen"),
            Self::Custom(_) => write!(f, "SelectionStrategy::Custom"),
        }
    }
}
