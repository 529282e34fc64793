//! Advisory transactions.
//!
//! A transaction remembers the host's history marker when it began and the
//! operations dispatched while it was open. Nothing is isolated: other
//! clients' commands land in the same log and a rollback undoes them too.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

/// Operations that manage transactions and are never recorded in one.
const CONTROL_OPERATIONS: [&str; 3] = [
    "begin_transaction",
    "commit_transaction",
    "rollback_transaction",
];

/// An open transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub name: String,
    /// Host history marker at begin.
    pub marker: usize,
    /// Operations dispatched since begin, in order.
    pub operations: Vec<String>,
    pub started_at: DateTime<Utc>,
}

/// Open transactions in begin order.
#[derive(Debug, Default)]
pub struct TransactionLog {
    open: IndexMap<String, Transaction>,
}

impl TransactionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction at `marker` and returns it.
    pub fn begin(&mut self, name: &str, marker: usize) -> &Transaction {
        let id = Uuid::new_v4().to_string();
        let transaction = Transaction {
            id: id.clone(),
            name: name.to_string(),
            marker,
            operations: Vec::new(),
            started_at: Utc::now(),
        };
        self.open.entry(id).or_insert(transaction)
    }

    /// Appends `operation` to every open transaction.
    pub fn record(&mut self, operation: &str) {
        if CONTROL_OPERATIONS.contains(&operation) {
            return;
        }
        for transaction in self.open.values_mut() {
            transaction.operations.push(operation.to_string());
        }
    }

    /// Closes a transaction, returning it if it was open.
    pub fn finish(&mut self, id: &str) -> Option<Transaction> {
        self.open.shift_remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.open.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
