//! Access to environment entries, injected so variable resolution can be
//! tested without touching the process environment.

use indexmap::IndexMap;

/// Trait for environment providers.
pub trait Env {
    /// Returns the value of `name`, or `None` if it is unset.
    fn get(&self, name: &str) -> Option<String>;

    /// Returns the names of every entry.
    fn names(&self) -> Vec<String>;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEnv;

impl Env for OsEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn names(&self) -> Vec<String> {
        std::env::vars_os().filter_map(|(name, _)| name.into_string().ok()).collect()
    }
}

/// A fixed set of entries.
#[derive(Debug, Default, Clone)]
pub struct MemoryEnv {
    vars: IndexMap<String, String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl Env for MemoryEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }
}
