//! ORMDB Entity - Typed, locale-aware entity attributes.
//!
//! This crate provides the attribute layer of ORMDB entities: per-class
//! definitions built lazily from schemas, typed property coercion and
//! serialization, per-locale translations, change tracking, hook dispatch
//! and rule-based validation.
//!
//! ```ignore
//! let registry = DefinitionRegistry::default();
//! registry.register_schema(
//!     DefinitionSchema::new("Article")
//!         .with_property(PropertySchema::integer("id"))
//!         .with_property(PropertySchema::generic("title").i18n().required()),
//! );
//!
//! let mut article = registry.make("Article", Default::default(), None)?;
//! article.set("title", "Hello")?;
//! article.set_in("title", "Bonjour", "fr")?;
//! assert!(article.valid(&[]));
//! ```

pub mod catalog;
pub mod collection;
pub mod entity;
pub mod error;
pub mod hooks;
pub mod registry;
pub mod serializer;
pub mod types;
pub mod validation;
pub mod value;

pub use catalog::{Definition, DefaultSpec, DefinitionSchema, Property, PropertySchema, DEFAULT_LOCALE};
pub use collection::ManyCollection;
pub use entity::{Entity, LocaleArg, SetOptions, ALL_LOCALES};
pub use error::{CoercionError, Error, Result, SchemaError};
pub use hooks::{EntityHook, HookDispatcher, ValidationFlow};
pub use registry::{
    clear_global, global, install_global, DefinitionCache, DefinitionRegistry, EntityModel,
    MemoryCache, NullCache, RegistryConfig,
};
pub use serializer::{RawSerializer, Serializer};
pub use types::{DefaultProvider, DefaultProviders, PropertyType, TypeRegistry};
pub use validation::{Report, RuleRegistry, RuleSpec, Validator, ValidatorFactory, Violation};
pub use value::{EntityRef, FromValue, Value};
