//! Shared per-model result lists.
//!
//! Observers read snapshots while the orchestrator writes. Every write goes
//! through one lock so a request can only leave `Running` once.

use super::types::{ModelResults, StressRequestResult};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct ResultStore {
    models: RwLock<Vec<ModelResults>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop previous results and open an empty list per model.
    pub fn reset(&self, models: &[String]) {
        let mut guard = self.models.write().unwrap_or_else(PoisonError::into_inner);
        *guard = models
            .iter()
            .map(|m| ModelResults {
                model_name: m.clone(),
                results: Vec::new(),
            })
            .collect();
    }

    /// Append a freshly dispatched request.
    pub fn register(&self, result: StressRequestResult) {
        let mut guard = self.models.write().unwrap_or_else(PoisonError::into_inner);
        match guard.iter_mut().find(|m| m.model_name == result.model_name) {
            Some(entry) => entry.results.push(result),
            None => guard.push(ModelResults {
                model_name: result.model_name.clone(),
                results: vec![result],
            }),
        }
    }

    /// Replace the running entry carrying the same id with its outcome.
    ///
    /// Returns `false`, leaving the store untouched, when no running entry
    /// with that id exists.
    pub fn resolve(&self, outcome: StressRequestResult) -> bool {
        let mut guard = self.models.write().unwrap_or_else(PoisonError::into_inner);
        let slot = guard
            .iter_mut()
            .filter(|m| m.model_name == outcome.model_name)
            .flat_map(|m| m.results.iter_mut())
            .find(|r| r.id == outcome.id && r.is_running());

        match slot {
            Some(entry) => {
                *entry = outcome;
                true
            }
            None => {
                tracing::warn!(
                    model = %outcome.model_name,
                    request_id = %outcome.id,
                    "Ignoring outcome for a request that is not running"
                );
                false
            }
        }
    }

    /// Fail every entry still `Running`. Returns how many were failed.
    pub fn abandon_running(&self) -> usize {
        let mut guard = self.models.write().unwrap_or_else(PoisonError::into_inner);
        let mut abandoned = 0;
        for entry in guard.iter_mut().flat_map(|m| m.results.iter_mut()) {
            if entry.is_running() {
                *entry = entry.clone().abandon();
                abandoned += 1;
            }
        }
        abandoned
    }

    pub fn snapshot(&self) -> Vec<ModelResults> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn results_for(&self, model: &str) -> Vec<StressRequestResult> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.model_name == model)
            .map(|m| m.results.clone())
            .unwrap_or_default()
    }

    pub fn running_count(&self) -> usize {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flat_map(|m| m.results.iter())
            .filter(|r| r.is_running())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::types::{RequestStatus, ABANDONED_ERROR};
    use crate::upstream::UpstreamError;

    #[test]
    fn test_reset_opens_empty_lists_in_order() {
        let store = ResultStore::new();
        store.reset(&["b".to_string(), "a".to_string()]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].model_name, "b");
        assert!(snap[1].results.is_empty());
    }

    #[test]
    fn test_register_then_resolve_replaces_in_place() {
        let store = ResultStore::new();
        store.reset(&["m".to_string()]);

        let first = StressRequestResult::running("m", 1, 0);
        let second = StressRequestResult::running("m", 1, 1);
        store.register(first.clone());
        store.register(second.clone());
        assert_eq!(store.running_count(), 2);

        assert!(store.resolve(second.fail(&UpstreamError::Network("refused".into()), 12)));
        let results = store.results_for("m");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, RequestStatus::Running);
        assert_eq!(results[1].status, RequestStatus::Failed);
        assert_eq!(store.running_count(), 1);
    }

    #[test]
    fn test_second_resolution_is_rejected() {
        let store = ResultStore::new();
        let pending = StressRequestResult::running("m", 1, 0);
        store.register(pending.clone());

        assert!(store.resolve(pending.clone().fail(&UpstreamError::Timeout(10), 10)));
        assert!(!store.resolve(pending.fail(&UpstreamError::Timeout(10), 20)));
        assert_eq!(store.results_for("m")[0].response_time_ms, 10);
    }

    #[test]
    fn test_resolve_unknown_id_is_rejected() {
        let store = ResultStore::new();
        store.reset(&["m".to_string()]);
        let stray = StressRequestResult::running("m", 1, 0);
        assert!(!store.resolve(stray.fail(&UpstreamError::Timeout(1), 1)));
        assert!(store.results_for("m").is_empty());
    }

    #[test]
    fn test_abandon_running_fails_only_open_entries() {
        let store = ResultStore::new();
        store.reset(&["a".to_string(), "b".to_string()]);

        let done = StressRequestResult::running("a", 1, 0);
        store.register(done.clone());
        store.register(StressRequestResult::running("a", 1, 1));
        store.register(StressRequestResult::running("b", 1, 0));
        assert!(store.resolve(done.fail(&UpstreamError::Timeout(10), 10)));

        assert_eq!(store.abandon_running(), 2);
        assert_eq!(store.running_count(), 0);
        let a = store.results_for("a");
        assert_eq!(a[0].error.as_deref(), Some("Request timeout after 10ms"));
        assert_eq!(a[1].error.as_deref(), Some(ABANDONED_ERROR));
        assert_eq!(store.results_for("b")[0].status, RequestStatus::Failed);

        assert_eq!(store.abandon_running(), 0);
    }

    #[test]
    fn test_results_for_unknown_model_is_empty() {
        let store = ResultStore::new();
        assert!(store.results_for("ghost").is_empty());
    }
}
