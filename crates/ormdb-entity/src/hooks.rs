//! Extension points around entity reads, writes and validation.
//!
//! Collaborators implement [`EntityHook`] and register it on the
//! [`HookDispatcher`] shared by a registry. Hooks run inline on the calling
//! thread, in registration order. Every method has a no-op default, so a hook
//! only overrides the points it cares about.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::entity::Entity;
use crate::error::Result;
use crate::validation::Validator;
use crate::value::Value;

/// Outcome of the `validation` extension point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFlow {
    /// Run the validator.
    Continue,
    /// Fail validation with this message without running the validator.
    Veto(String),
}

/// Listener for entity extension points.
pub trait EntityHook: Send + Sync {
    /// Answer a soft read. `Some` short-circuits the stored value.
    fn get(&self, _entity: &Entity, _name: &str, _locale: &str) -> Option<Value> {
        None
    }

    /// Load the translations of an entity for `locale` after a miss on
    /// `name`. The returned map (property → value) is merged without marking
    /// anything dirty.
    fn get_translations(
        &self,
        _entity: &Entity,
        _name: &str,
        _locale: &str,
    ) -> Option<BTreeMap<String, Value>> {
        None
    }

    /// Inspect or rewrite a value before it is coerced and stored.
    /// Returning an error vetoes the write.
    fn pre_set(&self, _entity: &Entity, _name: &str, _value: &mut Value, _locale: &str) -> Result<()> {
        Ok(())
    }

    /// Add record-level rules once the property rules are assembled.
    fn prepare_validator(&self, _entity: &Entity, _validator: &mut Validator) {}

    /// Called before a validation run with the snapshot about to be checked.
    fn validation(
        &self,
        _entity: &Entity,
        _validator: &mut Validator,
        _groups: &[String],
        _data: &mut BTreeMap<String, Value>,
    ) -> ValidationFlow {
        ValidationFlow::Continue
    }
}

/// Ordered set of hooks shared by every definition of a registry.
///
/// Cloning shares the underlying list.
#[derive(Clone, Default)]
pub struct HookDispatcher {
    hooks: Arc<RwLock<Vec<Arc<dyn EntityHook>>>>,
}

impl HookDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook after the existing ones.
    pub fn register(&self, hook: impl EntityHook + 'static) -> &Self {
        self.hooks.write().push(Arc::new(hook));
        self
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    /// Whether no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    // Hooks may re-enter the entity API, so callbacks run on a snapshot
    // taken without holding the lock.
    fn snapshot(&self) -> Vec<Arc<dyn EntityHook>> {
        self.hooks.read().clone()
    }

    /// First non-`None` answer to a soft read.
    pub fn get(&self, entity: &Entity, name: &str, locale: &str) -> Option<Value> {
        self.snapshot()
            .iter()
            .find_map(|hook| hook.get(entity, name, locale))
    }

    /// First non-`None` translation load.
    pub fn get_translations(
        &self,
        entity: &Entity,
        name: &str,
        locale: &str,
    ) -> Option<BTreeMap<String, Value>> {
        self.snapshot()
            .iter()
            .find_map(|hook| hook.get_translations(entity, name, locale))
    }

    /// Run every pre-set hook; the first error stops the chain.
    pub fn pre_set(&self, entity: &Entity, name: &str, value: &mut Value, locale: &str) -> Result<()> {
        for hook in self.snapshot() {
            hook.pre_set(entity, name, value, locale)?;
        }
        Ok(())
    }

    /// Let every hook add rules.
    pub fn prepare_validator(&self, entity: &Entity, validator: &mut Validator) {
        for hook in self.snapshot() {
            hook.prepare_validator(entity, validator);
        }
    }

    /// Run the validation hooks; the first veto stops the chain.
    pub fn validation(
        &self,
        entity: &Entity,
        validator: &mut Validator,
        groups: &[String],
        data: &mut BTreeMap<String, Value>,
    ) -> ValidationFlow {
        for hook in self.snapshot() {
            if let ValidationFlow::Veto(reason) = hook.validation(entity, validator, groups, data) {
                return ValidationFlow::Veto(reason);
            }
        }
        ValidationFlow::Continue
    }
}

impl fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("hooks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Definition, DefinitionSchema, PropertySchema};
    use crate::error::Error;

    struct Upper;

    impl EntityHook for Upper {
        fn pre_set(&self, _entity: &Entity, name: &str, value: &mut Value, _locale: &str) -> Result<()> {
            if name == "title" {
                if let Value::String(s) = value {
                    *s = s.to_uppercase();
                }
            }
            Ok(())
        }
    }

    struct ReadOnly;

    impl EntityHook for ReadOnly {
        fn pre_set(&self, _entity: &Entity, name: &str, _value: &mut Value, _locale: &str) -> Result<()> {
            if name == "slug" {
                return Err(Error::vetoed(name, "read only"));
            }
            Ok(())
        }

        fn get(&self, _entity: &Entity, name: &str, _locale: &str) -> Option<Value> {
            (name == "computed").then(|| Value::from("from hook"))
        }
    }

    fn entity(hooks: HookDispatcher) -> Entity {
        let schema = DefinitionSchema::new("Article")
            .with_property(PropertySchema::generic("title"))
            .with_property(PropertySchema::generic("slug"));
        let definition = Definition::build(schema, &Default::default(), &Default::default())
            .unwrap()
            .with_hooks(hooks);
        Entity::new(Arc::new(definition))
    }

    #[test]
    fn test_hooks_run_in_order() {
        let hooks = HookDispatcher::new();
        hooks.register(Upper).register(ReadOnly);
        assert_eq!(hooks.len(), 2);

        let mut article = entity(hooks.clone());
        article.set("title", "hello").unwrap();
        assert_eq!(article.get("title"), Value::from("HELLO"));

        let err = article.set("slug", "x").unwrap_err();
        assert!(matches!(err, Error::Vetoed { .. }));
        assert_eq!(article.get("slug"), Value::Null);
        assert_eq!(article.get("computed"), Value::from("from hook"));
    }

    #[test]
    fn test_registration_is_shared() {
        let hooks = HookDispatcher::new();
        let article = entity(hooks.clone());
        assert_eq!(article.get("computed"), Value::Null);

        hooks.register(ReadOnly);
        assert_eq!(article.get("computed"), Value::from("from hook"));
    }
}
