//! Result storage and per-request completion.
//!
//! [`ResultStore`] keeps the latest result per operation name for polling
//! GETs. [`Correlator`] hands a specific POST the result of its own command
//! when the caller asked to wait.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use serde_json::{json, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Latest result per operation name.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: RwLock<HashMap<String, Value>>,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `result` under `operation`, replacing any earlier entry.
    pub fn put(&self, operation: &str, result: Value) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.to_string(), result);
    }

    /// Returns the latest result for `operation`.
    #[must_use]
    pub fn get(&self, operation: &str) -> Option<Value> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(operation)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sentinel returned by a GET for an operation that has not run yet.
    #[must_use]
    pub fn no_data(operation: &str) -> Value {
        json!({
            "success": false,
            "error": format!("No data available. Call POST /{operation} first."),
        })
    }
}

/// Outstanding waiters keyed by command id.
#[derive(Debug, Default)]
pub struct Correlator {
    waiters: Mutex<HashMap<Uuid, oneshot::Sender<Value>>>,
}

impl Correlator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in the result of command `id`.
    ///
    /// The receiver yields the result, or an error if the command is
    /// discarded before it runs.
    pub fn register(&self, id: Uuid) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        rx
    }

    /// Delivers a result. Returns `false` if nobody was waiting.
    pub fn resolve(&self, id: Uuid, result: &Value) -> bool {
        let waiter = self
            .waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        waiter.is_some_and(|tx| tx.send(result.clone()).is_ok())
    }

    /// Drops the waiter for `id`, e.g. after the caller timed out.
    pub fn forget(&self, id: Uuid) {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Drops every waiter; their receivers observe cancellation.
    pub fn cancel_all(&self) -> usize {
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        let count = waiters.len();
        waiters.clear();
        count
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_result_wins() {
        let store = ResultStore::new();
        assert!(store.get("list_bodies").is_none());
        store.put("list_bodies", json!({"success": true, "count": 1}));
        store.put("list_bodies", json!({"success": true, "count": 2}));
        assert_eq!(store.get("list_bodies").unwrap()["count"], 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn no_data_sentinel() {
        assert_eq!(
            ResultStore::no_data("find_face"),
            json!({"success": false, "error": "No data available. Call POST /find_face first."})
        );
    }

    #[test]
    fn resolve_reaches_waiter() {
        let correlator = Correlator::new();
        let id = Uuid::new_v4();
        let mut rx = correlator.register(id);
        assert!(correlator.resolve(id, &json!({"success": true})));
        assert_eq!(rx.try_recv().unwrap(), json!({"success": true}));
        assert!(!correlator.resolve(id, &json!({})));
    }

    #[test]
    fn cancel_closes_receivers() {
        let correlator = Correlator::new();
        let rx = correlator.register(Uuid::new_v4());
        assert_eq!(correlator.cancel_all(), 1);
        assert!(tokio_test::block_on(rx).is_err());
        assert_eq!(correlator.pending(), 0);
    }
}
