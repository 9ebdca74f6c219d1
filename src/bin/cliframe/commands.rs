//! Sample commands wired into the demo binary.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::future::BoxFuture;
use futures::FutureExt;

use cliframe::error::{BindError, DispatchError};
use cliframe::exit;
use cliframe::metadata::FromBound;
use cliframe::{
    ArgumentDescriptor, BoundValues, Command, CommandDescriptor, CommandFailure, CommandRegistry,
    CommandResult, EnumDef, InvocationContext, OptionDescriptor, TypeId,
};

pub const LEVEL_ENUM: &str = "Level";

pub fn level_enum() -> EnumDef {
    EnumDef::new(LEVEL_ENUM, ["info", "debug", "warn", "error"])
}

/// Every demo command. `config_env` is the `[env]` table from the config file.
pub fn registry(config_env: BTreeMap<String, String>) -> Result<CommandRegistry, DispatchError> {
    let mut registry = CommandRegistry::new();

    registry.register(
        CommandDescriptor::builder("greet")
            .about("Greet someone, optionally several times")
            .option(
                OptionDescriptor::new("name", TypeId::String)
                    .short('n')
                    .env("CLIFRAME_GREET_NAME")
                    .required()
                    .describe("Who to greet"),
            )
            .argument(ArgumentDescriptor::new(0, "count", TypeId::I32).describe("Repetitions"))
            .build::<Greet>()?,
    )?;

    registry.register(
        CommandDescriptor::builder("wait")
            .about("Sleep until the timeout or an interrupt")
            .option(
                OptionDescriptor::short_only('s', "seconds", TypeId::U64)
                    .describe("Seconds to wait; 0 waits for an interrupt"),
            )
            .build::<Wait>()?,
    )?;

    registry.register(
        CommandDescriptor::builder("inspect")
            .about("Print the bound values as JSON")
            .argument(
                ArgumentDescriptor::new(0, "values", TypeId::list(TypeId::String))
                    .required()
                    .describe("Values to echo back"),
            )
            .option(
                OptionDescriptor::new("level", TypeId::enumeration(LEVEL_ENUM))
                    .ignore_case()
                    .env("CLIFRAME_LEVEL")
                    .describe("Verbosity level"),
            )
            .option(
                OptionDescriptor::new("tag", TypeId::list(TypeId::String))
                    .short('t')
                    .describe("Repeatable tag"),
            )
            .option(OptionDescriptor::new("feature", TypeId::BoolMap).describe("Feature toggles as key[=bool]"))
            .option(OptionDescriptor::new("dry-run", TypeId::Bool).describe("Skip side effects"))
            .build_with(|values: &BoundValues| -> Result<Box<dyn Command>, BindError> {
                Ok(Box::new(Inspect {
                    values: values.clone(),
                }))
            })?,
    )?;

    let config_env = Arc::new(config_env);
    registry.register(
        CommandDescriptor::builder("env show")
            .about("List environment fallbacks from the config file")
            .build_with(move |_: &BoundValues| -> Result<Box<dyn Command>, BindError> {
                Ok(Box::new(EnvShow {
                    vars: Arc::clone(&config_env),
                }))
            })?,
    )?;

    Ok(registry)
}

struct Greet {
    name: String,
    count: i32,
}

impl FromBound for Greet {
    fn from_bound(values: &BoundValues) -> Result<Self, BindError> {
        Ok(Self {
            name: values.value("name")?,
            count: values.value("count")?,
        })
    }
}

impl Greet {
    async fn run(self, ctx: InvocationContext) -> CommandResult {
        if self.name == "nobody" {
            return Err(CommandFailure::new("There is nobody to greet", 3).into());
        }
        for _ in 0..self.count.max(1) {
            println!("Hello, {}!", self.name);
        }

        let name = self.name;
        ctx.lifecycle
            .on_post_exit("farewell", move || {
                tracing::info!(%name, "said goodbye");
                Ok(())
            })
            .context("registering farewell callback")?;
        Ok(())
    }
}

impl Command for Greet {
    fn execute(self: Box<Self>, ctx: InvocationContext) -> BoxFuture<'static, CommandResult> {
        (*self).run(ctx).boxed()
    }
}

struct Wait {
    seconds: u64,
}

impl FromBound for Wait {
    fn from_bound(values: &BoundValues) -> Result<Self, BindError> {
        Ok(Self {
            seconds: values.value("seconds")?,
        })
    }
}

impl Wait {
    async fn run(self, ctx: InvocationContext) -> CommandResult {
        let seconds = self.seconds;
        let timeout = async move {
            if seconds == 0 {
                futures::future::pending::<()>().await
            } else {
                tokio::time::sleep(Duration::from_secs(seconds)).await
            }
        };
        tokio::select! {
            _ = timeout => {
                println!("waited {}s", seconds);
                Ok(())
            }
            _ = ctx.cancel.cancelled() => {
                Err(CommandFailure::new("Interrupted", exit::INTERRUPTED).into())
            }
        }
    }
}

impl Command for Wait {
    fn execute(self: Box<Self>, ctx: InvocationContext) -> BoxFuture<'static, CommandResult> {
        (*self).run(ctx).boxed()
    }
}

struct Inspect {
    values: BoundValues,
}

impl Inspect {
    async fn run(self) -> CommandResult {
        let json = serde_json::to_string_pretty(&self.values.to_json())
            .context("serializing bound values")?;
        println!("{}", json);
        Ok(())
    }
}

impl Command for Inspect {
    fn execute(self: Box<Self>, _ctx: InvocationContext) -> BoxFuture<'static, CommandResult> {
        (*self).run().boxed()
    }
}

struct EnvShow {
    vars: Arc<BTreeMap<String, String>>,
}

impl Command for EnvShow {
    fn execute(self: Box<Self>, _ctx: InvocationContext) -> BoxFuture<'static, CommandResult> {
        async move {
            if self.vars.is_empty() {
                println!("(no [env] entries configured)");
            }
            for (name, value) in self.vars.iter() {
                let shadowed = std::env::var_os(name).is_some();
                println!("{}={}{}", name, value, if shadowed { " (overridden by process env)" } else { "" });
            }
            Ok(())
        }
        .boxed()
    }
}
