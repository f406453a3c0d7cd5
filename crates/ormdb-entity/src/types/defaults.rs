//! Named default-value providers.
//!
//! A schema refers to a provider by tag instead of embedding a closure, so it
//! stays serializable.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Timelike};

use crate::value::Value;

/// Produces a fresh default value each time it is called.
pub trait DefaultProvider: Send + Sync {
    /// Compute the default.
    fn produce(&self) -> Value;
}

impl<F> DefaultProvider for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn produce(&self) -> Value {
        self()
    }
}

/// Providers by tag.
#[derive(Clone)]
pub struct DefaultProviders {
    providers: BTreeMap<String, Arc<dyn DefaultProvider>>,
}

impl DefaultProviders {
    /// A registry without any provider.
    pub fn empty() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Register or replace a provider.
    pub fn register(&mut self, tag: impl Into<String>, provider: impl DefaultProvider + 'static) -> &mut Self {
        self.providers.insert(tag.into(), Arc::new(provider));
        self
    }

    /// Look up a provider.
    pub fn get(&self, tag: &str) -> Option<Arc<dyn DefaultProvider>> {
        self.providers.get(tag).cloned()
    }

    /// Whether a tag is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.providers.contains_key(tag)
    }
}

fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

impl Default for DefaultProviders {
    fn default() -> Self {
        let mut providers = Self::empty();
        providers
            .register("now", || Value::Datetime(now()))
            .register("today", || Value::Date(Local::now().date_naive()))
            .register("empty_string", || Value::String(String::new()));
        providers
    }
}

impl fmt::Debug for DefaultProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.providers.keys()).finish()
    }
}
