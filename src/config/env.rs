//! Environment sources consulted for option fallbacks.

use std::collections::HashMap;

/// Supplies environment-variable values to the binder.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment. Non-UTF-8 values are treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// First source that yields a value wins.
#[derive(Default)]
pub struct LayeredEnv {
    layers: Vec<Box<dyn EnvSource>>,
}

impl LayeredEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl EnvSource + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }
}

impl EnvSource for LayeredEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.var(name))
    }
}
