//! The bridge core.
//!
//! HTTP workers turn requests into [`Command`]s and push them onto the
//! [`CommandQueue`]. The single host thread runs the [`Pump`] on every tick:
//! it drains the queue, dispatches each command to its handler against the
//! [`CadHost`](crate::host::CadHost), stores the normalised result in the
//! [`ResultStore`] and wakes any POST waiting on that command through the
//! [`Correlator`]. [`Bridge`] owns the threads and the listener.

pub mod command;
pub mod dispatch;
pub mod lifecycle;
pub mod pump;
pub mod queue;
pub mod results;
pub mod snapshot;
pub mod transactions;

use std::sync::atomic::{AtomicBool, Ordering};

pub use command::{Args, Command};
pub use dispatch::{Dispatcher, Handler, HandlerContext, HandlerOutput};
pub use lifecycle::{Bridge, BridgeOptions, StopReport};
pub use pump::{Pump, TickReport};
pub use queue::CommandQueue;
pub use results::{Correlator, ResultStore};
pub use snapshot::ParameterSnapshot;
pub use transactions::{Transaction, TransactionLog};

/// State shared between HTTP workers and the host thread.
#[derive(Debug, Default)]
pub struct BridgeContext {
    pub queue: CommandQueue,
    pub results: ResultStore,
    pub correlator: Correlator,
    pub snapshot: ParameterSnapshot,
    stopping: AtomicBool,
}

impl BridgeContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `command` and returns its id.
    pub fn submit(&self, command: Command) -> uuid::Uuid {
        let id = command.id;
        self.queue.push(command);
        id
    }

    /// Marks the bridge as stopping; the pump dispatches nothing further.
    pub fn begin_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    /// Clears the stop flag before a (re)start.
    pub fn reset(&self) {
        self.stopping.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}
