//! Lifecycle coordinator: cancellation signals and exit callbacks.
//!
//! ```text
//! Running ──shutdown()──► Exiting ──pre-exit done──► Exited ──post-exit done──► Complete
//!   │                      (pre-exit callbacks)       (post-exit callbacks)
//!   └─ root token cancelled on entry to Exiting; linked tokens follow
//! ```
//!
//! One `Lifecycle` per process by convention. It is a cheap handle; clone it
//! into whatever needs to register callbacks or observe cancellation.

use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecyclePhase {
    Running = 0,
    /// Pre-exit callbacks are running.
    Exiting = 1,
    /// Post-exit callbacks are running.
    Exited = 2,
    /// Torn down; further registrations are rejected.
    Complete = 3,
}

impl LifecyclePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecyclePhase::Running,
            1 => LifecyclePhase::Exiting,
            2 => LifecyclePhase::Exited,
            _ => LifecyclePhase::Complete,
        }
    }
}

/// Which callback list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPhase {
    PreExit,
    PostExit,
}

impl fmt::Display for ExitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitPhase::PreExit => write!(f, "pre-exit"),
            ExitPhase::PostExit => write!(f, "post-exit"),
        }
    }
}

pub type CallbackResult = Result<(), anyhow::Error>;

enum Callback {
    /// Dispatched onto the blocking pool so it cannot stall its siblings.
    Sync(Box<dyn FnOnce() -> CallbackResult + Send>),
    Async(Box<dyn FnOnce() -> BoxFuture<'static, CallbackResult> + Send>),
}

struct Registered {
    label: String,
    callback: Callback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub label: String,
    pub message: String,
}

/// One or more callbacks of a phase failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} {phase} callback(s) failed: {}", .failures.len(), summarize(.failures))]
pub struct AggregateCallbackError {
    pub phase: ExitPhase,
    pub failures: Vec<CallbackFailure>,
}

fn summarize(failures: &[CallbackFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.label, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Cannot register '{label}': lifecycle already torn down")]
    TornDown { label: String },
}

/// Outcome of a full shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub pre_exit_ran: usize,
    pub post_exit_ran: usize,
    pub pre_exit: Option<AggregateCallbackError>,
    pub post_exit: Option<AggregateCallbackError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.pre_exit.is_none() && self.post_exit.is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &AggregateCallbackError> {
        self.pre_exit.iter().chain(self.post_exit.iter())
    }
}

struct Inner {
    root: CancellationToken,
    phase: AtomicU8,
    pre_exit: Mutex<Vec<Registered>>,
    post_exit: Mutex<Vec<Registered>>,
    report: Mutex<Option<ShutdownReport>>,
    done: Notify,
}

#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                root: CancellationToken::new(),
                phase: AtomicU8::new(LifecyclePhase::Running as u8),
                pre_exit: Mutex::new(Vec::new()),
                post_exit: Mutex::new(Vec::new()),
                report: Mutex::new(None),
                done: Notify::new(),
            }),
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        LifecyclePhase::from_u8(self.inner.phase.load(Ordering::SeqCst))
    }

    fn advance(&self, phase: LifecyclePhase) {
        self.inner.phase.store(phase as u8, Ordering::SeqCst);
        tracing::debug!(?phase, "lifecycle phase");
    }

    /// New token cancelled whenever the root is. Cancelling it never
    /// affects the root or its siblings.
    pub fn linked_token(&self) -> CancellationToken {
        self.inner.root.child_token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.root.is_cancelled()
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.inner.root.cancelled().await
    }

    /// Run `callback` on the blocking pool when exiting starts.
    pub fn on_pre_exit<F>(&self, label: impl Into<String>, callback: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> CallbackResult + Send + 'static,
    {
        self.register(ExitPhase::PreExit, label.into(), Callback::Sync(Box::new(callback)))
    }

    /// Spawn and await `callback` when exiting starts.
    pub fn on_pre_exit_async<F, Fut>(
        &self,
        label: impl Into<String>,
        callback: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.register(
            ExitPhase::PreExit,
            label.into(),
            Callback::Async(Box::new(move || callback().boxed())),
        )
    }

    /// Run `callback` on the blocking pool after every pre-exit callback finished.
    pub fn on_post_exit<F>(&self, label: impl Into<String>, callback: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> CallbackResult + Send + 'static,
    {
        self.register(ExitPhase::PostExit, label.into(), Callback::Sync(Box::new(callback)))
    }

    pub fn on_post_exit_async<F, Fut>(
        &self,
        label: impl Into<String>,
        callback: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.register(
            ExitPhase::PostExit,
            label.into(),
            Callback::Async(Box::new(move || callback().boxed())),
        )
    }

    /// Phase checks happen under the list lock so a registration either
    /// lands in a batch that will still run or is rejected; lock order is
    /// always pre-exit before post-exit.
    fn register(&self, phase: ExitPhase, label: String, callback: Callback) -> Result<(), LifecycleError> {
        let entry = Registered { label, callback };
        match phase {
            ExitPhase::PreExit => {
                let mut pre = self.inner.pre_exit.lock();
                if self.phase() <= LifecyclePhase::Exiting {
                    pre.push(entry);
                    return Ok(());
                }
                // Pre-exit already over: run with the post-exit batch instead.
                let mut post = self.inner.post_exit.lock();
                self.push_post(&mut post, entry)
            }
            ExitPhase::PostExit => {
                let mut post = self.inner.post_exit.lock();
                self.push_post(&mut post, entry)
            }
        }
    }

    fn push_post(&self, post: &mut Vec<Registered>, entry: Registered) -> Result<(), LifecycleError> {
        if self.phase() == LifecyclePhase::Complete {
            tracing::warn!(label = %entry.label, "exit callback registered after teardown; ignored");
            return Err(LifecycleError::TornDown { label: entry.label });
        }
        post.push(entry);
        Ok(())
    }

    /// Cancel the root token without running callbacks.
    pub fn request_shutdown(&self) {
        if !self.inner.root.is_cancelled() {
            tracing::info!("shutdown requested");
            self.inner.root.cancel();
        }
    }

    /// Cancel, run pre-exit callbacks, then post-exit callbacks.
    ///
    /// Safe to call from several places. The phases run on a spawned task, so
    /// dropping a caller never stalls them; every caller receives the same report.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.request_shutdown();

        let started = self
            .inner
            .phase
            .compare_exchange(
                LifecyclePhase::Running as u8,
                LifecyclePhase::Exiting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if started {
            tracing::debug!(phase = ?LifecyclePhase::Exiting, "lifecycle phase");
            let lifecycle = self.clone();
            tokio::spawn(async move { lifecycle.run_phases().await });
        }
        self.wait_for_report().await
    }

    async fn run_phases(&self) {
        let (pre_exit_ran, pre_failures) = self
            .drain(&self.inner.pre_exit, ExitPhase::PreExit, LifecyclePhase::Exited)
            .await;
        let (post_exit_ran, post_failures) = self
            .drain(&self.inner.post_exit, ExitPhase::PostExit, LifecyclePhase::Complete)
            .await;

        let report = ShutdownReport {
            pre_exit_ran,
            post_exit_ran,
            pre_exit: aggregate(ExitPhase::PreExit, pre_failures),
            post_exit: aggregate(ExitPhase::PostExit, post_failures),
        };
        tracing::info!(
            pre_exit = pre_exit_ran,
            post_exit = post_exit_ran,
            clean = report.is_clean(),
            "shutdown complete"
        );

        *self.inner.report.lock() = Some(report);
        self.inner.done.notify_waiters();
    }

    /// Run batches until the list stays empty, then advance to `next`.
    async fn drain(
        &self,
        list: &Mutex<Vec<Registered>>,
        phase: ExitPhase,
        next: LifecyclePhase,
    ) -> (usize, Vec<CallbackFailure>) {
        let mut ran = 0;
        let mut failures = Vec::new();
        loop {
            let batch = {
                let mut guard = list.lock();
                if guard.is_empty() {
                    self.advance(next);
                    break;
                }
                mem::take(&mut *guard)
            };
            ran += batch.len();
            failures.extend(run_batch(phase, batch).await);
        }
        (ran, failures)
    }

    async fn wait_for_report(&self) -> ShutdownReport {
        loop {
            // Subscribe before checking to avoid missing notify_waiters()
            let notified = self.inner.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let ready = self.inner.report.lock().clone();
            if let Some(report) = ready {
                return report;
            }
            notified.await;
        }
    }

    /// Spawn a task that runs [`shutdown`](Self::shutdown) on Ctrl-C or SIGTERM.
    ///
    /// The task ends quietly if shutdown is triggered some other way first.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let lifecycle = self.clone();
        tokio::spawn(async move {
            if lifecycle.wait_for_signal().await {
                tracing::info!("termination signal received");
                let report = lifecycle.shutdown().await;
                for error in report.errors() {
                    tracing::warn!(%error, "exit callbacks failed");
                }
            }
        })
    }

    /// `true` if a signal arrived, `false` if the root was cancelled first.
    async fn wait_for_signal(&self) -> bool {
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to install SIGTERM handler");
                        return tokio::select! {
                            res = tokio::signal::ctrl_c() => res.is_ok(),
                            _ = self.cancelled() => false,
                        };
                    }
                };
            tokio::select! {
                res = tokio::signal::ctrl_c() => res.is_ok(),
                _ = sigterm.recv() => true,
                _ = self.cancelled() => false,
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                res = tokio::signal::ctrl_c() => res.is_ok(),
                _ = self.cancelled() => false,
            }
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("phase", &self.phase())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Start every callback of a batch, then wait for all of them.
async fn run_batch(phase: ExitPhase, batch: Vec<Registered>) -> Vec<CallbackFailure> {
    let (labels, handles): (Vec<String>, Vec<JoinHandle<CallbackResult>>) = batch
        .into_iter()
        .map(|entry| {
            let handle = match entry.callback {
                Callback::Sync(f) => tokio::task::spawn_blocking(f),
                Callback::Async(f) => tokio::spawn(f()),
            };
            (entry.label, handle)
        })
        .unzip();

    join_all(handles)
        .await
        .into_iter()
        .zip(labels)
        .filter_map(|(result, label)| {
            let message = match result {
                Ok(Ok(())) => return None,
                Ok(Err(e)) => format!("{:#}", e),
                Err(join) if join.is_panic() => "callback panicked".to_string(),
                Err(join) => join.to_string(),
            };
            tracing::warn!(%phase, %label, %message, "exit callback failed");
            Some(CallbackFailure { label, message })
        })
        .collect()
}

fn aggregate(phase: ExitPhase, failures: Vec<CallbackFailure>) -> Option<AggregateCallbackError> {
    if failures.is_empty() {
        None
    } else {
        Some(AggregateCallbackError { phase, failures })
    }
}
