//! Command registry: resolves a command path to its descriptor.

use strsim::levenshtein;

use crate::error::DispatchError;
use crate::metadata::CommandDescriptor;

/// Maximum edit distance for "did you mean" suggestions.
const MAX_SUGGESTION_DISTANCE: usize = 2;
const MAX_SUGGESTIONS: usize = 3;

/// A resolved command and the args left for the binder.
#[derive(Debug)]
pub struct Resolved<'r, 'a> {
    pub descriptor: &'r CommandDescriptor,
    pub args: &'a [String],
}

/// Registered commands, in registration order.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Paths must be unique.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), DispatchError> {
        if self.commands.iter().any(|c| c.path() == descriptor.path()) {
            return Err(DispatchError::DuplicateCommand {
                path: descriptor.name(),
            });
        }
        tracing::debug!(command = %descriptor.name(), "registered command");
        self.commands.push(descriptor);
        Ok(())
    }

    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn get(&self, path: &[&str]) -> Option<&CommandDescriptor> {
        self.commands
            .iter()
            .find(|c| c.path().iter().map(String::as_str).eq(path.iter().copied()))
    }

    /// Longest registered path that prefixes `tokens`; exact, case-sensitive.
    pub fn resolve<'r, 'a>(&'r self, tokens: &'a [String]) -> Result<Resolved<'r, 'a>, DispatchError> {
        let best = self
            .commands
            .iter()
            .filter(|c| tokens.starts_with(c.path()))
            .max_by_key(|c| c.path().len());

        match best {
            Some(descriptor) => Ok(Resolved {
                descriptor,
                args: &tokens[descriptor.path().len()..],
            }),
            None => {
                let requested = requested_path(tokens);
                let suggestions = self.suggest(&requested);
                tracing::debug!(%requested, ?suggestions, "command not found");
                Err(DispatchError::CommandNotFound {
                    requested,
                    suggestions,
                })
            }
        }
    }

    /// Registered names within edit distance of `requested`, nearest first.
    pub fn suggest(&self, requested: &str) -> Vec<String> {
        let mut scored: Vec<(usize, String)> = self
            .commands
            .iter()
            .map(|c| {
                let name = c.name();
                // Compare against the same number of segments the user typed
                let depth = requested.split(' ').count().min(c.path().len());
                let prefix = c.path()[..depth].join(" ");
                (levenshtein(requested, &prefix).min(levenshtein(requested, &name)), name)
            })
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .collect();
        scored.sort();
        scored.dedup_by(|a, b| a.1 == b.1);
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, name)| name)
            .collect()
    }
}

/// Leading non-flag tokens, joined with spaces. Falls back to the first
/// token when argv opens with a flag.
fn requested_path(tokens: &[String]) -> String {
    let path = tokens
        .iter()
        .take_while(|t| !t.starts_with('-'))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    match tokens.first() {
        Some(first) if path.is_empty() => first.clone(),
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BoundValues;
    use crate::error::BindError;
    use crate::runner::{Command, CommandResult, InvocationContext};
    use futures::future::BoxFuture;
    use futures::FutureExt;

    struct Noop;

    impl Command for Noop {
        fn execute(self: Box<Self>, _ctx: InvocationContext) -> BoxFuture<'static, CommandResult> {
            async { Ok(()) }.boxed()
        }
    }

    fn command(path: &str) -> CommandDescriptor {
        CommandDescriptor::builder(path)
            .build_with(|_: &BoundValues| -> Result<Box<dyn Command>, BindError> {
                Ok(Box::new(Noop))
            })
            .unwrap()
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for path in ["greet", "env", "env show", "env set"] {
            registry.register(command(path)).unwrap();
        }
        registry
    }

    fn raw(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_paths_rejected() {
        let mut registry = registry();
        assert_eq!(
            registry.register(command("env show")),
            Err(DispatchError::DuplicateCommand {
                path: "env show".into()
            })
        );
    }

    #[test]
    fn longest_path_wins() {
        let registry = registry();
        let tokens = raw(&["env", "show", "--all"]);
        let resolved = registry.resolve(&tokens).unwrap();
        assert_eq!(resolved.descriptor.name(), "env show");
        assert_eq!(resolved.args, ["--all"]);

        let tokens = raw(&["env", "--all"]);
        assert_eq!(registry.resolve(&tokens).unwrap().descriptor.name(), "env");
    }

    #[test]
    fn matching_is_case_sensitive_and_exact() {
        let registry = registry();
        assert!(registry.resolve(&raw(&["Greet"])).is_err());
        assert!(registry.resolve(&raw(&["gre"])).is_err());
    }

    #[test]
    fn not_found_suggests_nearest() {
        let registry = registry();
        let err = registry.resolve(&raw(&["gret", "--name", "x"])).unwrap_err();
        assert_eq!(
            err,
            DispatchError::CommandNotFound {
                requested: "gret".into(),
                suggestions: vec!["greet".into()],
            }
        );
    }

    #[test]
    fn leading_flag_is_reported_as_requested() {
        let registry = registry();
        let err = registry.resolve(&raw(&["--x", "greet"])).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::CommandNotFound { ref requested, .. } if requested == "--x"
        ));
        assert!(err.to_string().starts_with("Command '--x' not found"));
    }

    #[test]
    fn nested_suggestions() {
        let registry = registry();
        assert_eq!(registry.suggest("env shw"), ["env show", "env set"]);
        assert!(registry.suggest("deploy").is_empty());
    }

    #[test]
    fn get_by_segments() {
        let registry = registry();
        assert!(registry.get(&["env", "set"]).is_some());
        assert!(registry.get(&["set"]).is_none());
    }
}
