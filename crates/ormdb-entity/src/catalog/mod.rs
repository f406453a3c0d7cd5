//! Entity definitions.
//!
//! A [`DefinitionSchema`] is the persistable description of a class. Building
//! it against the type and default-provider registries yields a
//! [`Definition`], the immutable form entities are bound to.

mod definition;
mod property;
mod schema;

pub use definition::{Definition, DEFAULT_LOCALE};
pub use property::Property;
pub use schema::{DefaultSpec, DefinitionSchema, PropertySchema};
