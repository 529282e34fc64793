//! Starting and stopping the bridge.
//!
//! A running bridge owns three execution contexts:
//!
//! - the **host thread** (`cad-host`), the only place the [`CadHost`] is
//!   touched; it runs the pump whenever a tick event arrives,
//! - the **trigger thread** (`cad-trigger`), which posts a tick event every
//!   `tick_interval`; at most one tick is ever pending,
//! - the **HTTP listener**, an axum server on the caller's tokio runtime.

use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::dispatch::Dispatcher;
use super::pump::Pump;
use super::BridgeContext;
use crate::config::Config;
use crate::error::BridgeError;
use crate::host::CadHost;
use crate::receiver;

/// Listener address and pump cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// `host:port` to bind; port 0 picks an ephemeral port.
    pub bind: String,
    pub tick_interval: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BridgeOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            bind: config.receiver.bind_addr(),
            tick_interval: Duration::from_millis(config.pump.tick_interval_ms),
        }
    }
}

/// What `stop` threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Queued commands that never ran.
    pub discarded: usize,
    /// Waiting POSTs that were answered with 503.
    pub cancelled: usize,
}

enum HostEvent {
    Tick,
    Deregister,
}

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopSignal {
    /// Sleeps up to `timeout`; returns `true` once the signal is set.
    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .cvar
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    fn set(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cvar.notify_all();
    }
}

struct Running {
    addr: SocketAddr,
    stop: Arc<StopSignal>,
    trigger: JoinHandle<()>,
    host_thread: JoinHandle<Option<Box<dyn CadHost>>>,
    events: SyncSender<HostEvent>,
    server: tokio::task::JoinHandle<std::io::Result<()>>,
    shutdown: oneshot::Sender<()>,
}

/// The bridge: command receiver, queue, pump and result store.
pub struct Bridge {
    ctx: Arc<BridgeContext>,
    options: BridgeOptions,
    dispatcher: Dispatcher,
    host: Option<Box<dyn CadHost>>,
    running: Option<Running>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("options", &self.options)
            .field("running", &self.local_addr())
            .field("queued", &self.ctx.queue.len())
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Creates a stopped bridge with the default handlers.
    pub fn new(host: Box<dyn CadHost>, options: BridgeOptions) -> Self {
        Self::with_dispatcher(host, options, Dispatcher::with_defaults())
    }

    /// Creates a stopped bridge with a custom handler registry.
    pub fn with_dispatcher(
        host: Box<dyn CadHost>,
        options: BridgeOptions,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            ctx: Arc::new(BridgeContext::new()),
            options,
            dispatcher,
            host: Some(host),
            running: None,
        }
    }

    /// Shared state, for inspection and tests.
    #[must_use]
    pub fn context(&self) -> Arc<BridgeContext> {
        Arc::clone(&self.ctx)
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address the receiver is listening on while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// The host, while the bridge is stopped.
    #[must_use]
    pub fn host(&self) -> Option<&dyn CadHost> {
        self.host.as_deref()
    }

    /// Binds the listener, then starts the host thread, the trigger thread
    /// and the HTTP server. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if already running, if no design is open, if the host was lost
    /// to an earlier panic, or if the listener cannot be bound or a thread
    /// cannot be spawned. On error the bridge stays stopped and keeps its
    /// host, so `start` can be retried; this holds for a failed thread spawn
    /// too.
    pub async fn start(&mut self) -> Result<SocketAddr, BridgeError> {
        if self.running.is_some() {
            return Err(BridgeError::AlreadyRunning);
        }
        let mut host = self.host.take().ok_or(BridgeError::HostUnavailable)?;
        if !host.has_active_design() {
            host.alert("No active design. Open or create a design before starting the bridge.");
            self.host = Some(host);
            return Err(BridgeError::NoActiveDesign);
        }
        self.ctx.snapshot.replace(host.model_parameters());

        let bound = match TcpListener::bind(&self.options.bind).await {
            Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
            Err(e) => Err(e),
        };
        let (listener, addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                self.host = Some(host);
                return Err(BridgeError::Bind {
                    addr: self.options.bind.clone(),
                    source,
                });
            }
        };

        self.ctx.reset();
        let stop = Arc::new(StopSignal::default());
        let (events, events_rx) = mpsc::sync_channel(1);

        let pump = Pump::new(Arc::clone(&self.ctx), self.dispatcher.clone());
        let spawned = spawn_host_thread(
            thread::Builder::new().name("cad-host".into()),
            host,
            move |host| host_loop(host, pump, &events_rx),
        );
        let host_thread = match spawned {
            Ok(handle) => handle,
            Err((source, host)) => {
                self.host = host;
                return Err(BridgeError::Spawn {
                    thread: "host",
                    source,
                });
            }
        };

        let trigger = {
            let stop = Arc::clone(&stop);
            let events = events.clone();
            let interval = self.options.tick_interval;
            thread::Builder::new()
                .name("cad-trigger".into())
                .spawn(move || trigger_loop(&stop, &events, interval))
        };
        let trigger = match trigger {
            Ok(handle) => handle,
            Err(source) => {
                // Hand the host back before reporting.
                let _ = events.send(HostEvent::Deregister);
                self.host = host_thread.join().ok().flatten();
                return Err(BridgeError::Spawn {
                    thread: "trigger",
                    source,
                });
            }
        };

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let app = receiver::router(Arc::clone(&self.ctx));
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(%addr, "command receiver listening");
        self.running = Some(Running {
            addr,
            stop,
            trigger,
            host_thread,
            events,
            server,
            shutdown,
        });
        Ok(addr)
    }

    /// Stops the bridge.
    ///
    /// Order: stop flag, trigger joined, host thread deregistered and joined,
    /// queue drained and waiters cancelled, listener shut down gracefully,
    /// queue drained again for requests that raced the shutdown.
    ///
    /// # Errors
    ///
    /// Fails if the bridge is not running, or if the host thread panicked; in
    /// that case the host is gone and the bridge cannot be restarted.
    pub async fn stop(&mut self) -> Result<StopReport, BridgeError> {
        let running = self.running.take().ok_or(BridgeError::NotRunning)?;
        let Running {
            addr,
            stop,
            trigger,
            host_thread,
            events,
            server,
            shutdown,
        } = running;

        self.ctx.begin_stop();
        stop.set();

        let joined = tokio::task::spawn_blocking(move || {
            if trigger.join().is_err() {
                warn!("trigger thread panicked");
            }
            let _ = events.send(HostEvent::Deregister);
            drop(events);
            host_thread.join()
        })
        .await;
        let host_lost = match joined {
            Ok(Ok(Some(host))) => {
                self.host = Some(host);
                false
            }
            _ => {
                error!("host thread panicked; host is no longer available");
                true
            }
        };

        let mut report = StopReport {
            discarded: self.ctx.queue.drain().len(),
            cancelled: self.ctx.correlator.cancel_all(),
        };

        let _ = shutdown.send(());
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%addr, error = %e, "command receiver ended with an error"),
            Err(e) => warn!(%addr, error = %e, "command receiver task failed"),
        }

        report.discarded += self.ctx.queue.drain().len();
        report.cancelled += self.ctx.correlator.cancel_all();
        info!(
            %addr,
            discarded = report.discarded,
            cancelled = report.cancelled,
            "command receiver stopped"
        );

        if host_lost {
            return Err(BridgeError::HostThreadPanicked);
        }
        Ok(report)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            // Without a join: threads exit on their own once the signal is
            // set and the event sender is gone.
            self.ctx.begin_stop();
            running.stop.set();
            let _ = running.shutdown.send(());
        }
    }
}

/// Spawns the host thread with `host` parked in a slot the thread empties
/// on entry. If the spawn fails the closure never ran and the host is
/// returned alongside the error.
fn spawn_host_thread<F>(
    builder: thread::Builder,
    host: Box<dyn CadHost>,
    run: F,
) -> Result<JoinHandle<Option<Box<dyn CadHost>>>, (std::io::Error, Option<Box<dyn CadHost>>)>
where
    F: FnOnce(Box<dyn CadHost>) -> Box<dyn CadHost> + Send + 'static,
{
    let slot = Arc::new(Mutex::new(Some(host)));
    let taken = Arc::clone(&slot);
    builder
        .spawn(move || {
            let host = taken.lock().unwrap_or_else(PoisonError::into_inner).take();
            host.map(run)
        })
        .map_err(|e| (e, slot.lock().unwrap_or_else(PoisonError::into_inner).take()))
}

fn host_loop(
    mut host: Box<dyn CadHost>,
    mut pump: Pump,
    events: &Receiver<HostEvent>,
) -> Box<dyn CadHost> {
    debug!("host thread registered");
    while let Ok(event) = events.recv() {
        match event {
            HostEvent::Tick => {
                let report = pump.tick(host.as_mut());
                if report.dispatched + report.dropped > 0 {
                    debug!(
                        dispatched = report.dispatched,
                        dropped = report.dropped,
                        failed = report.failed,
                        "pump tick"
                    );
                }
            }
            HostEvent::Deregister => break,
        }
    }
    debug!("host thread deregistered");
    host
}

fn trigger_loop(stop: &StopSignal, events: &SyncSender<HostEvent>, interval: Duration) {
    while !stop.wait(interval) {
        match events.try_send(HostEvent::Tick) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedHost;

    fn options() -> BridgeOptions {
        BridgeOptions {
            bind: "127.0.0.1:0".into(),
            tick_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn stop_signal_wakes_waiter() {
        let signal = Arc::new(StopSignal::default());
        assert!(!signal.wait(Duration::from_millis(1)));
        let setter = Arc::clone(&signal);
        let handle = thread::spawn(move || setter.set());
        assert!(signal.wait(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn failed_host_spawn_returns_the_host() {
        // No address space can hold this stack, so the OS refuses the thread.
        let builder = thread::Builder::new().stack_size(1 << 60);
        let Err((_, host)) = spawn_host_thread(builder, Box::new(SimulatedHost::new()), |h| h)
        else {
            panic!("thread with an impossible stack was spawned");
        };
        assert!(host.is_some_and(|h| h.has_active_design()));
    }

    #[test]
    fn host_thread_hands_the_host_back_on_exit() {
        let handle = spawn_host_thread(
            thread::Builder::new(),
            Box::new(SimulatedHost::new()),
            |h| h,
        )
        .map_err(|(e, _)| e)
        .unwrap();
        assert!(handle.join().unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_twice_is_rejected() {
        let mut bridge = Bridge::new(Box::new(SimulatedHost::new()), options());
        bridge.start().await.unwrap();
        assert!(matches!(
            bridge.start().await,
            Err(BridgeError::AlreadyRunning)
        ));
        bridge.stop().await.unwrap();
        assert!(!bridge.is_running());
        assert!(bridge.host().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_design_refuses_to_start() {
        let mut bridge = Bridge::new(Box::new(SimulatedHost::without_design()), options());
        assert!(matches!(
            bridge.start().await,
            Err(BridgeError::NoActiveDesign)
        ));
        assert!(!bridge.is_running());
        assert!(bridge.host().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bind_failure_leaves_bridge_stopped() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let mut bridge = Bridge::new(
            Box::new(SimulatedHost::new()),
            BridgeOptions {
                bind: addr.to_string(),
                ..options()
            },
        );
        assert!(matches!(
            bridge.start().await,
            Err(BridgeError::Bind { .. })
        ));
        assert!(!bridge.is_running());
        assert!(bridge.host().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_when_stopped_is_an_error() {
        let mut bridge = Bridge::new(Box::new(SimulatedHost::new()), options());
        assert!(matches!(bridge.stop().await, Err(BridgeError::NotRunning)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_after_stop() {
        let mut bridge = Bridge::new(Box::new(SimulatedHost::new()), options());
        bridge.start().await.unwrap();
        bridge.stop().await.unwrap();
        let addr = bridge.start().await.unwrap();
        assert_eq!(bridge.local_addr(), Some(addr));
        bridge.stop().await.unwrap();
    }
}
