//! Operation name to handler mapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::command::Args;
use super::transactions::TransactionLog;
use crate::host::{CadHost, HostResult};

/// What a handler may touch while it runs on the host thread.
pub struct HandlerContext<'a> {
    pub host: &'a mut dyn CadHost,
    pub transactions: &'a mut TransactionLog,
}

/// Handler result data; the pump adds `"success"`.
pub type HandlerOutput = Map<String, Value>;

/// A command handler.
pub type Handler =
    Arc<dyn Fn(&mut HandlerContext<'_>, &Args) -> HostResult<HandlerOutput> + Send + Sync>;

/// Handler registry. Lookup is by exact operation name.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Handler>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("Dispatcher").field("handlers", &names).finish()
    }
}

impl Dispatcher {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding a handler for every queued catalogue operation.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut dispatcher = Self::new();
        crate::handlers::register_all(&mut dispatcher);
        dispatcher
    }

    /// Registers `handler` under `operation`, replacing any earlier one.
    pub fn register<F>(&mut self, operation: &str, handler: F)
    where
        F: Fn(&mut HandlerContext<'_>, &Args) -> HostResult<HandlerOutput> + Send + Sync + 'static,
    {
        self.handlers.insert(operation.to_string(), Arc::new(handler));
    }

    #[must_use]
    pub fn get(&self, operation: &str) -> Option<Handler> {
        self.handlers.get(operation).cloned()
    }

    #[must_use]
    pub fn contains(&self, operation: &str) -> bool {
        self.handlers.contains_key(operation)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}
