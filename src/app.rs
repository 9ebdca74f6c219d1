//! End-to-end pipeline: argv → dispatch → bind → run → exit code.

use thiserror::Error;

use crate::binder::{wants_help, Binder};
use crate::config::EnvSource;
use crate::dispatch::CommandRegistry;
use crate::error::{BindError, DispatchError};
use crate::exit;
use crate::help::{HelpRenderer, PlainHelp};
use crate::lifecycle::Lifecycle;
use crate::runner::{ExitOutcome, InvocationRunner, RunError};
use crate::types::TypeRegistry;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Run(#[from] RunError),
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Dispatch(e) => e.exit_code(),
            AppError::Bind(e) => e.exit_code(),
            AppError::Run(e) => e.exit_code(),
        }
    }
}

/// What an invocation produced when nothing went wrong in the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Help was requested; the rendered text.
    Help(String),
    Completed(ExitOutcome),
}

pub struct App {
    registry: CommandRegistry,
    types: TypeRegistry,
    env: Box<dyn EnvSource>,
    lifecycle: Lifecycle,
    renderer: Box<dyn HelpRenderer>,
    strict_shutdown: bool,
}

impl App {
    pub fn new(registry: CommandRegistry, types: TypeRegistry, env: impl EnvSource + 'static) -> Self {
        Self {
            registry,
            types,
            env: Box::new(env),
            lifecycle: Lifecycle::new(),
            renderer: Box::new(PlainHelp::default()),
            strict_shutdown: false,
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_renderer(mut self, renderer: impl HelpRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Turn failed exit callbacks into [`exit::UNEXPECTED`] when the command succeeded.
    pub fn with_strict_shutdown(mut self, strict: bool) -> Self {
        self.strict_shutdown = strict;
        self
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Resolve, bind and run one command without printing anything.
    pub async fn invoke(&self, argv: &[String]) -> Result<Invocation, AppError> {
        if argv.is_empty() || wants_help(&argv[..1]) {
            let commands: Vec<_> = self.registry.commands().iter().collect();
            return Ok(Invocation::Help(self.renderer.render_index(&commands)));
        }

        let resolved = self.registry.resolve(argv)?;
        let descriptor = resolved.descriptor;
        tracing::debug!(command = %descriptor.name(), args = resolved.args.len(), "resolved command");

        let binder = Binder::new(&self.types, self.env.as_ref());
        let bound = match binder.bind(descriptor, resolved.args) {
            Ok(bound) => bound,
            Err(BindError::HelpRequested { .. }) => {
                return Ok(Invocation::Help(self.renderer.render_command(descriptor)));
            }
            Err(e) => {
                tracing::debug!(command = %descriptor.name(), kind = e.kind(), "binding failed");
                return Err(e.into());
            }
        };

        let runner = InvocationRunner::new(self.lifecycle.clone());
        let outcome = runner.run(bound, self.lifecycle.linked_token()).await?;
        Ok(Invocation::Completed(outcome))
    }

    /// Like [`invoke`](Self::invoke), printing help to stdout and errors to
    /// stderr as `error: <message>`.
    pub async fn run(&self, argv: &[String]) -> i32 {
        match self.invoke(argv).await {
            Ok(Invocation::Help(text)) => {
                print!("{}", text);
                exit::SUCCESS
            }
            Ok(Invocation::Completed(ExitOutcome::Success)) => exit::SUCCESS,
            Ok(Invocation::Completed(ExitOutcome::Failure { message, exit_code })) => {
                eprintln!("error: {}", message);
                exit_code
            }
            Err(e) => {
                eprintln!("error: {}", e);
                e.exit_code()
            }
        }
    }

    /// Run the exit phases and settle the final exit code.
    pub async fn finish(&self, code: i32) -> i32 {
        let report = self.lifecycle.shutdown().await;
        for error in report.errors() {
            tracing::warn!(%error, "exit callbacks failed");
        }
        if self.strict_shutdown && code == exit::SUCCESS && !report.is_clean() {
            exit::UNEXPECTED
        } else {
            code
        }
    }
}
