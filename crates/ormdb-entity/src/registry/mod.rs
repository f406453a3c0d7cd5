//! Definition registry.
//!
//! The registry maps class identifiers to definition sources and builds each
//! [`Definition`] lazily, on first lookup. Every class owns a slot guarded by
//! its own mutex, so a class is built at most once even when many threads
//! ask for it at the same time, while different classes build in parallel.

mod cache;
mod config;
mod global;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::catalog::{Definition, DefinitionSchema};
use crate::entity::Entity;
use crate::error::{Result, SchemaError};
use crate::hooks::HookDispatcher;
use crate::validation::Validator;
use crate::value::Value;

pub use cache::{cache_key, DefinitionCache, MemoryCache, NullCache, CACHE_PREFIX};
pub use config::RegistryConfig;
pub use global::{clear_global, global, install_global};

/// Produces the schema of a class.
pub type DefinitionSource = Arc<dyn Fn() -> DefinitionSchema + Send + Sync>;

/// A type describing an entity class.
pub trait EntityModel {
    /// Class identifier.
    const CLASS: &'static str;

    /// Fill in the schema of the class.
    fn definition(schema: DefinitionSchema) -> DefinitionSchema;
}

type Slot = Arc<Mutex<Option<Arc<Definition>>>>;

/// Lazily built, cached definitions by class.
pub struct DefinitionRegistry {
    config: RegistryConfig,
    sources: DashMap<String, DefinitionSource>,
    slots: DashMap<String, Slot>,
}

impl DefinitionRegistry {
    /// Create a registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            sources: DashMap::new(),
            slots: DashMap::new(),
        }
    }

    /// Registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Attach a definition source to a class.
    ///
    /// A definition already built for the class is kept.
    pub fn register<F>(&self, class: impl Into<String>, source: F) -> &Self
    where
        F: Fn() -> DefinitionSchema + Send + Sync + 'static,
    {
        self.sources.insert(class.into(), Arc::new(source));
        self
    }

    /// Attach a fixed schema; its class names the entry.
    pub fn register_schema(&self, schema: DefinitionSchema) -> &Self {
        let class = schema.class.clone();
        self.register(class, move || schema.clone())
    }

    /// Attach the source of an [`EntityModel`].
    pub fn register_model<M: EntityModel>(&self) -> &Self {
        self.register(M::CLASS, || M::definition(DefinitionSchema::new(M::CLASS)))
    }

    /// Whether a source is registered for the class.
    pub fn is_registered(&self, class: &str) -> bool {
        self.sources.contains_key(class)
    }

    /// Definition of a class, built on first call.
    ///
    /// A source must not look up its own class.
    pub fn get(&self, class: &str) -> Result<Arc<Definition>> {
        let slot = self.slot(class);
        let mut published = slot.lock();
        if let Some(definition) = published.as_ref() {
            return Ok(Arc::clone(definition));
        }
        let definition = Arc::new(self.build(class)?);
        *published = Some(Arc::clone(&definition));
        Ok(definition)
    }

    /// Definition of a model, registering it first if needed.
    pub fn get_model<M: EntityModel>(&self) -> Result<Arc<Definition>> {
        if !self.is_registered(M::CLASS) {
            self.register_model::<M>();
        }
        self.get(M::CLASS)
    }

    /// Whether the definition of a class has been built.
    pub fn has(&self, class: &str) -> bool {
        let slot = self.slots.get(class).map(|slot| Arc::clone(slot.value()));
        slot.is_some_and(|slot| slot.lock().is_some())
    }

    /// Every built definition.
    pub fn definitions(&self) -> Vec<Arc<Definition>> {
        // Slots are locked only after the map guards are released.
        let slots: Vec<Slot> = self.slots.iter().map(|slot| Arc::clone(slot.value())).collect();
        slots.iter().filter_map(|slot| slot.lock().clone()).collect()
    }

    /// Create an entity of a class.
    pub fn make(
        &self,
        class: &str,
        attrs: BTreeMap<String, Value>,
        locale: Option<&str>,
    ) -> Result<Entity> {
        self.get(class)?.make(attrs, locale)
    }

    /// A fresh validator from the configured factory.
    pub fn create_validator(&self) -> Validator {
        match &self.config.validator_factory {
            Some(factory) => factory(),
            None => Validator::new(),
        }
    }

    /// Locale new entities start in.
    pub fn default_locale(&self) -> &str {
        &self.config.default_locale
    }

    /// Hooks shared by every definition.
    pub fn hooks(&self) -> &HookDispatcher {
        &self.config.hooks
    }

    fn slot(&self, class: &str) -> Slot {
        if let Some(slot) = self.slots.get(class) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(class.to_string()).or_default().value())
    }

    #[instrument(level = "debug", skip(self))]
    fn build(&self, class: &str) -> Result<Definition> {
        let source = self
            .sources
            .get(class)
            .map(|source| Arc::clone(source.value()))
            .ok_or_else(|| SchemaError::UnknownClass(class.to_string()))?;

        let json = self
            .config
            .cache
            .fetch(&cache_key(class), &mut || -> Result<String> {
                Ok(serde_json::to_string(&source())?)
            })?;
        let schema: DefinitionSchema = serde_json::from_str(&json)?;
        if schema.class != class {
            return Err(SchemaError::InvalidSchema {
                class: class.to_string(),
                reason: format!("source describes class {}", schema.class),
            }
            .into());
        }

        let definition = Definition::build(schema, &self.config.types, &self.config.providers)?
            .with_default_locale(self.config.default_locale.clone())
            .with_hooks(self.config.hooks.clone())
            .with_validator_factory(self.config.validator_factory.clone())
            .with_serializer(Arc::clone(&self.config.serializer));

        debug!(
            class,
            properties = definition.properties().len(),
            "definition built"
        );
        Ok(definition)
    }
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionRegistry")
            .field("config", &self.config)
            .field("sources", &self.sources.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::PropertySchema;
    use crate::error::Error;

    fn article() -> DefinitionSchema {
        DefinitionSchema::new("Article")
            .with_property(PropertySchema::integer("id"))
            .with_property(PropertySchema::generic("title").i18n())
    }

    struct Comment;

    impl EntityModel for Comment {
        const CLASS: &'static str = "Comment";

        fn definition(schema: DefinitionSchema) -> DefinitionSchema {
            schema
                .with_property(PropertySchema::integer("id"))
                .with_property(PropertySchema::reference("article", "Article"))
        }
    }

    #[test]
    fn test_get_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let registry = DefinitionRegistry::default();
        let counter = Arc::clone(&builds);
        registry.register("Article", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            article()
        });

        assert!(!registry.has("Article"));
        let first = registry.get("Article").unwrap();
        let second = registry.get("Article").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(registry.has("Article"));
        assert_eq!(registry.definitions().len(), 1);
    }

    #[test]
    fn test_unknown_class() {
        let registry = DefinitionRegistry::default();
        let err = registry.get("Ghost").unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::UnknownClass(ref c)) if c == "Ghost"));
        assert!(!registry.has("Ghost"));
    }

    #[test]
    fn test_mismatched_class() {
        let registry = DefinitionRegistry::default();
        registry.register("Post", article);
        assert!(matches!(
            registry.get("Post"),
            Err(Error::Schema(SchemaError::InvalidSchema { .. }))
        ));
    }

    #[test]
    fn test_registry_context_attached() {
        let hooks = HookDispatcher::new();
        let registry = DefinitionRegistry::new(
            RegistryConfig::new()
                .with_default_locale("fr")
                .with_hooks(hooks.clone())
                .with_validator_factory(|| {
                    let mut validator = Validator::new();
                    validator.set("origin", Value::from("factory"));
                    validator
                }),
        );
        registry.register_schema(article());

        let definition = registry.get("Article").unwrap();
        assert_eq!(definition.default_locale(), "fr");
        assert_eq!(
            definition.create_validator().parameter("origin"),
            Some(&Value::from("factory"))
        );
        assert_eq!(
            registry.create_validator().parameter("origin"),
            Some(&Value::from("factory"))
        );

        let entity = registry.make("Article", BTreeMap::new(), None).unwrap();
        assert_eq!(entity.locale(), "fr");
        assert!(entity.is_new());
    }

    #[test]
    fn test_model_lookup() {
        let registry = DefinitionRegistry::default();
        let definition = registry.get_model::<Comment>().unwrap();
        assert_eq!(definition.class(), "Comment");
        assert!(definition.has_property("article"));
        assert!(registry.is_registered("Comment"));
    }

    #[test]
    fn test_memory_cache_reused_across_registries() {
        let cache: Arc<dyn DefinitionCache> = Arc::new(MemoryCache::new());

        let first = DefinitionRegistry::new(RegistryConfig::new().with_shared_cache(Arc::clone(&cache)));
        first.register_schema(article());
        first.get("Article").unwrap();

        // The second source is never called: the cached schema wins.
        let second = DefinitionRegistry::new(RegistryConfig::new().with_shared_cache(cache));
        second.register("Article", || DefinitionSchema::new("Article"));
        let definition = second.get("Article").unwrap();
        assert!(definition.has_property("title"));
    }
}
