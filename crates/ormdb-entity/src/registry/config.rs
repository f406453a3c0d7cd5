//! Registry configuration.

use std::fmt;
use std::sync::Arc;

use super::cache::{DefinitionCache, MemoryCache, NullCache};
use crate::catalog::DEFAULT_LOCALE;
use crate::hooks::HookDispatcher;
use crate::serializer::{RawSerializer, Serializer};
use crate::types::{DefaultProvider, DefaultProviders, PropertyType, TypeRegistry};
use crate::validation::{Validator, ValidatorFactory};

/// Definition registry configuration.
#[derive(Clone)]
pub struct RegistryConfig {
    /// Locale new entities start in.
    pub default_locale: String,

    /// Cache of serialized definition schemas.
    pub cache: Arc<dyn DefinitionCache>,

    /// Factory for entity validators. None uses `Validator::new`.
    pub validator_factory: Option<ValidatorFactory>,

    /// Hooks shared by every definition.
    pub hooks: HookDispatcher,

    /// Property types by tag.
    pub types: TypeRegistry,

    /// Default-value providers by tag.
    pub providers: DefaultProviders,

    /// Serializer handed to every definition.
    pub serializer: Arc<dyn Serializer>,
}

impl RegistryConfig {
    /// Create a configuration with the built-in types and providers, no
    /// cache and no validator factory.
    pub fn new() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_string(),
            cache: Arc::new(NullCache),
            validator_factory: None,
            hooks: HookDispatcher::new(),
            types: TypeRegistry::default(),
            providers: DefaultProviders::default(),
            serializer: Arc::new(RawSerializer),
        }
    }

    /// Set the default locale.
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Set the cache backend.
    pub fn with_cache(mut self, cache: impl DefinitionCache + 'static) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Share a cache backend with other registries.
    pub fn with_shared_cache(mut self, cache: Arc<dyn DefinitionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Cache schemas in memory.
    pub fn with_memory_cache(self) -> Self {
        self.with_cache(MemoryCache::new())
    }

    /// Set the validator factory.
    pub fn with_validator_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Validator + Send + Sync + 'static,
    {
        self.validator_factory = Some(Arc::new(factory));
        self
    }

    /// Set the hook dispatcher.
    pub fn with_hooks(mut self, hooks: HookDispatcher) -> Self {
        self.hooks = hooks;
        self
    }

    /// Register a custom property type.
    pub fn with_type(mut self, property_type: impl PropertyType + 'static) -> Self {
        self.types.register(property_type);
        self
    }

    /// Register a default-value provider.
    pub fn with_default_provider(
        mut self,
        tag: impl Into<String>,
        provider: impl DefaultProvider + 'static,
    ) -> Self {
        self.providers.register(tag, provider);
        self
    }

    /// Set the serializer.
    pub fn with_serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    /// Check if a validator factory is configured.
    pub fn has_validator_factory(&self) -> bool {
        self.validator_factory.is_some()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("default_locale", &self.default_locale)
            .field("cache", &self.cache)
            .field("validator_factory", &self.validator_factory.is_some())
            .field("hooks", &self.hooks)
            .field("types", &self.types)
            .field("providers", &self.providers)
            .field("serializer", &self.serializer)
            .finish()
    }
}
