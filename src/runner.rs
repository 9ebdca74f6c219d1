//! Invocation runner: executes one bound command and maps its result to an
//! [`ExitOutcome`].

use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::binder::BoundCommand;
use crate::exit;
use crate::lifecycle::Lifecycle;

pub type CommandResult = Result<(), CommandError>;

/// A bound, runnable command.
///
/// Long-running bodies should select on [`InvocationContext::cancel`];
/// nothing interrupts them forcibly.
pub trait Command: Send + 'static {
    fn execute(self: Box<Self>, ctx: InvocationContext) -> BoxFuture<'static, CommandResult>;
}

/// Declared failure: the message is shown to the user and the process exits
/// with `exit_code`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandFailure {
    pub message: String,
    pub exit_code: i32,
}

impl CommandFailure {
    /// A code of `0` would read as success, so it becomes [`exit::GENERAL_FAILURE`].
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code: if exit_code == exit::SUCCESS {
                exit::GENERAL_FAILURE
            } else {
                exit_code
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Failed(#[from] CommandFailure),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// What a command gets besides its own fields.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub cancel: CancellationToken,
    pub lifecycle: Lifecycle,
    pub invocation_id: Uuid,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Failure { message: String, exit_code: i32 },
}

impl ExitOutcome {
    pub fn code(&self) -> i32 {
        match self {
            ExitOutcome::Success => exit::SUCCESS,
            ExitOutcome::Failure { exit_code, .. } => *exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }
}

/// Failures the runner does not recover from.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0:#}")]
    Unexpected(anyhow::Error),

    #[error("Command '{command}' panicked: {message}")]
    Panicked { command: String, message: String },
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        exit::UNEXPECTED
    }
}

#[derive(Debug, Clone)]
pub struct InvocationRunner {
    lifecycle: Lifecycle,
}

impl InvocationRunner {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    /// Run `bound` to completion under `cancel`. No retries.
    pub async fn run(
        &self,
        bound: BoundCommand,
        cancel: CancellationToken,
    ) -> Result<ExitOutcome, RunError> {
        let invocation_id = Uuid::new_v4();
        let name = bound.name();
        let span = tracing::info_span!("invocation", command = %name, id = %invocation_id);

        let ctx = InvocationContext {
            cancel,
            lifecycle: self.lifecycle.clone(),
            invocation_id,
            path: bound.path().to_vec(),
        };
        let command = bound.into_command();

        tracing::info!(parent: &span, "invocation started");
        // Spawned so a panicking body surfaces as a JoinError
        let handle = tokio::spawn(command.execute(ctx).instrument(span.clone()));

        let outcome = match handle.await {
            Ok(Ok(())) => Ok(ExitOutcome::Success),
            Ok(Err(CommandError::Failed(failure))) => Ok(ExitOutcome::Failure {
                message: failure.message,
                exit_code: failure.exit_code,
            }),
            Ok(Err(CommandError::Unexpected(e))) => Err(RunError::Unexpected(e)),
            Err(join) => Err(RunError::Panicked {
                command: name,
                message: panic_message(join),
            }),
        };

        match &outcome {
            Ok(outcome) => tracing::info!(parent: &span, code = outcome.code(), "invocation finished"),
            Err(e) => tracing::warn!(parent: &span, error = %e, "invocation failed"),
        }
        outcome
    }
}

fn panic_message(join: tokio::task::JoinError) -> String {
    if !join.is_panic() {
        return join.to_string();
    }
    let payload = join.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
