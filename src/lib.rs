//! Argument parsing and command dispatch core.
//!
//! ```text
//! argv → CommandRegistry::resolve → Binder::bind → InvocationRunner::run → exit code
//!                                      │                    │
//!                                TypeRegistry          Lifecycle (cancellation + exit callbacks)
//! ```

pub mod app;
pub mod binder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exit;
pub mod help;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod runner;
pub mod types;

pub use app::{App, AppError, Invocation};
pub use binder::{Binder, BoundCommand, BoundValues, ValueSource};
pub use dispatch::CommandRegistry;
pub use error::{BindError, DescriptorError, DispatchError, Target, TypeError};
pub use lifecycle::{Lifecycle, LifecyclePhase, ShutdownReport};
pub use metadata::{ArgumentDescriptor, CommandDescriptor, OptionDescriptor};
pub use runner::{
    Command, CommandError, CommandFailure, CommandResult, ExitOutcome, InvocationContext,
    InvocationRunner,
};
pub use types::{CaseMode, EnumDef, TypeId, TypeParser, TypeRegistry, Value};
