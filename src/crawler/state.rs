//! Per-crawl bookkeeping shared by all branches of one request.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Identifiers already requested in this crawl, with the largest remaining
/// depth each was requested at.
pub(crate) struct CrawlState {
    requested: Mutex<HashMap<String, usize>>,
}

impl CrawlState {
    pub(crate) fn new(root: &str, depth: usize) -> Self {
        let mut requested = HashMap::new();
        requested.insert(root.to_string(), depth);
        Self {
            requested: Mutex::new(requested),
        }
    }

    /// Record a request for `resource` with `remaining` depth.
    ///
    /// Returns false if it was already requested with at least that much depth
    /// left, in which case the earlier request covers everything this one would
    /// discover.
    pub(crate) fn claim(&self, resource: &str, remaining: usize) -> bool {
        let mut requested = self.requested.lock().unwrap_or_else(PoisonError::into_inner);
        match requested.get(resource) {
            Some(&previous) if previous >= remaining => false,
            _ => {
                requested.insert(resource.to_string(), remaining);
                true
            }
        }
    }

    pub(crate) fn requested_count(&self) -> usize {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_claimed() {
        let state = CrawlState::new("a", 3);
        assert!(!state.claim("a", 2));
        assert!(!state.claim("a", 3));
        assert_eq!(state.requested_count(), 1);
    }

    #[test]
    fn test_deeper_request_reclaims() {
        let state = CrawlState::new("root", 4);
        assert!(state.claim("b", 1));
        assert!(!state.claim("b", 1));
        assert!(state.claim("b", 2));
        assert!(!state.claim("b", 1));
        assert_eq!(state.requested_count(), 2);
    }
}
