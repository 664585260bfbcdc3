//! Long-lived task management: spawning critical tasks, cooperative shutdown
//! signalling, and surfacing task failures to the process top level.

use std::any::Any;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::panic;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::select;
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::futures::Notified;
use tokio::sync::{mpsc, Notify};
use tracing::*;

/// Error produced when a critical task panics or returns an error.
#[derive(Debug, thiserror::Error)]
pub struct CriticalTaskError {
    task_name: String,
    cause: Option<String>,
}

impl Display for CriticalTaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let task_name = &self.task_name;
        if let Some(cause) = &self.cause {
            write!(f, "critical task `{task_name}` failed: `{cause}`")
        } else {
            write!(f, "critical task `{task_name}` failed")
        }
    }
}

impl CriticalTaskError {
    fn from_panic(task_name: &str, error: Box<dyn Any>) -> Self {
        let cause = match error.downcast::<String>() {
            Ok(value) => Some(*value),
            Err(error) => error.downcast::<&str>().ok().map(|s| s.to_string()),
        };

        Self {
            task_name: task_name.to_string(),
            cause,
        }
    }

    fn from_err(task_name: &str, error: anyhow::Error) -> Self {
        Self {
            task_name: task_name.to_string(),
            cause: Some(format!("{error:#}")),
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }
}

/// Shared flag used to request shutdown across all tasks.
#[derive(Debug, Clone)]
pub struct ShutdownSignal(Arc<AtomicBool>, Arc<Notify>);

impl ShutdownSignal {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)), Arc::new(Notify::new()))
    }

    /// Send shutdown signal.
    pub fn send(&self) {
        self.0.fetch_or(true, Ordering::Relaxed);
        self.1.notify_waiters();
    }

    fn subscribe(&self) -> Shutdown {
        Shutdown(self.clone())
    }

    fn should_shutdown(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn notified(&self) -> Notified<'_> {
        self.1.notified()
    }
}

struct Shutdown(ShutdownSignal);

impl Shutdown {
    fn should_shutdown(&self) -> bool {
        self.0.should_shutdown()
    }

    async fn wait_for_shutdown(&self) {
        while !self.should_shutdown() {
            self.0.notified().await
        }
    }
}

/// Per-task handle for observing the shutdown signal.  Dropping it marks the
/// task as finished for the graceful-shutdown accounting.
pub struct ShutdownGuard(Shutdown, Arc<AtomicUsize>);

impl ShutdownGuard {
    fn new(shutdown: Shutdown, counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(shutdown, counter)
    }

    /// Check if shutdown signal has been sent.
    pub fn should_shutdown(&self) -> bool {
        self.0.should_shutdown()
    }

    /// Waits until shutdown signal is sent.
    pub async fn wait_for_shutdown(&self) {
        self.0.wait_for_shutdown().await
    }

    /// A standalone guard whose signal never fires, for driving task bodies
    /// directly in tests.
    pub fn never() -> Self {
        Self::new(
            ShutdownSignal::new().subscribe(),
            Arc::new(AtomicUsize::new(0)),
        )
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.1.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the shutdown signal and the failure channel for a set of critical
/// tasks.  The process main thread parks in [`TaskManager::monitor`].
pub struct TaskManager {
    tokio_handle: Handle,
    failed_tasks_tx: mpsc::UnboundedSender<CriticalTaskError>,
    failed_tasks_rx: mpsc::UnboundedReceiver<CriticalTaskError>,
    shutdown_signal: ShutdownSignal,
    pending_tasks_counter: Arc<AtomicUsize>,
}

impl TaskManager {
    pub fn new(tokio_handle: Handle) -> Self {
        let (failed_tasks_tx, failed_tasks_rx) = mpsc::unbounded_channel();

        Self {
            tokio_handle,
            failed_tasks_tx,
            failed_tasks_rx,
            shutdown_signal: ShutdownSignal::new(),
            pending_tasks_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor {
            tokio_handle: self.tokio_handle.clone(),
            failed_tasks_tx: self.failed_tasks_tx.clone(),
            shutdown_signal: self.shutdown_signal.clone(),
            pending_tasks_counter: self.pending_tasks_counter.clone(),
        }
    }

    /// Get shutdown signal trigger.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown_signal.clone()
    }

    /// Sends a shutdown on ctrl-c.
    pub fn start_signal_listeners(&self) {
        let shutdown_signal = self.shutdown_signal();

        self.tokio_handle.spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            warn!("got INT, initiating shutdown");
            shutdown_signal.send()
        });
    }

    /// Parks until a critical task fails (returning the error) or the
    /// shutdown signal fires (returning `Ok`), then waits out the grace
    /// period for remaining tasks.
    pub fn monitor(mut self, shutdown_timeout: Option<Duration>) -> Result<(), CriticalTaskError> {
        let shutdown = self.shutdown_signal.subscribe();
        let res = self.tokio_handle.clone().block_on(async {
            tokio::select! {
                msg = self.failed_tasks_rx.recv() => {
                    match msg {
                        Some(error) => Err(error),
                        None => Ok(()),
                    }
                }
                _ = shutdown.wait_for_shutdown() => Ok(()),
            }
        });

        self.shutdown_signal.send();
        if !self.wait_for_graceful_shutdown(shutdown_timeout) {
            info!("shutdown grace period expired, exiting anyway");
        }

        res
    }

    fn wait_for_graceful_shutdown(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| std::time::Instant::now() + t);
        while self.pending_tasks_counter.load(Ordering::Relaxed) > 0 {
            if deadline
                .map(|d| std::time::Instant::now() > d)
                .unwrap_or(false)
            {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        debug!("gracefully shut down");
        true
    }
}

/// A type that can spawn new critical tasks.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    tokio_handle: Handle,
    failed_tasks_tx: mpsc::UnboundedSender<CriticalTaskError>,
    shutdown_signal: ShutdownSignal,
    pending_tasks_counter: Arc<AtomicUsize>,
}

impl TaskExecutor {
    pub fn handle(&self) -> &Handle {
        &self.tokio_handle
    }

    /// Spawns a future that runs until it completes or the shutdown signal
    /// fires.  A panic or `Err` return is reported as a critical failure and
    /// triggers process shutdown.
    pub fn spawn_critical_async<F>(
        &self,
        name: &'static str,
        fut: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let failed_tasks_tx = self.failed_tasks_tx.clone();
        let shutdown = self.shutdown_signal.subscribe();

        let task = panic::AssertUnwindSafe(fut)
            .catch_unwind()
            .map(move |result| {
                let task_error = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(CriticalTaskError::from_err(name, e)),
                    Err(panic_err) => Some(CriticalTaskError::from_panic(name, panic_err)),
                };
                if let Some(err) = task_error {
                    error!(%name, %err, "critical task failed");
                    let _ = failed_tasks_tx.send(err);
                }
            });

        let task = async move {
            let task = pin!(task);
            let shutdown = pin!(shutdown.wait_for_shutdown());
            let _ = select(shutdown, task).await;
        };

        info!(%name, "starting critical async task");
        self.tokio_handle.spawn(task)
    }

    /// Like [`Self::spawn_critical_async`] but hands the task a
    /// [`ShutdownGuard`] so it can wind down cooperatively instead of being
    /// dropped at a cancellation point.
    pub fn spawn_critical_async_with_shutdown<F>(
        &self,
        name: &'static str,
        async_func: impl FnOnce(ShutdownGuard) -> F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let failed_tasks_tx = self.failed_tasks_tx.clone();
        let shutdown = ShutdownGuard::new(
            self.shutdown_signal.subscribe(),
            self.pending_tasks_counter.clone(),
        );
        let fut = async_func(shutdown);

        let task = panic::AssertUnwindSafe(fut)
            .catch_unwind()
            .map(move |result| {
                let task_error = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(CriticalTaskError::from_err(name, e)),
                    Err(panic_err) => Some(CriticalTaskError::from_panic(name, panic_err)),
                };
                if let Some(err) = task_error {
                    error!(%name, %err, "critical task failed");
                    let _ = failed_tasks_tx.send(err);
                }
            });

        info!(%name, "starting critical async task");
        self.tokio_handle.spawn(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_async_panic() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let manager = TaskManager::new(runtime.handle().clone());
        let executor = manager.executor();

        // don't print the stack trace for the expected panic
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));

        executor.spawn_critical_async("panictask", async {
            panic!("intentional panic");
        });

        let err = manager
            .monitor(Some(Duration::from_secs(5)))
            .expect_err("should give error");

        panic::set_hook(original_hook);

        assert_eq!(err.task_name(), "panictask");
    }

    #[test]
    fn test_critical_async_err() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let manager = TaskManager::new(runtime.handle().clone());
        let executor = manager.executor();

        executor.spawn_critical_async("errtask", async {
            Err(anyhow::anyhow!("deliberate failure"))
        });

        let err = manager
            .monitor(Some(Duration::from_secs(5)))
            .expect_err("should give error");
        assert_eq!(err.task_name(), "errtask");
    }

    #[test]
    fn test_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let manager = TaskManager::new(runtime.handle().clone());
        let executor = manager.executor();

        executor.spawn_critical_async_with_shutdown("looptask", |shutdown| async move {
            loop {
                if shutdown.should_shutdown() {
                    break Ok(());
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let shutdown_sig = manager.shutdown_signal();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            shutdown_sig.send();
        });

        let res = manager.monitor(Some(Duration::from_secs(5)));
        assert!(res.is_ok(), "should exit successfully");
    }
}
