//! Pass-through property type.

use super::PropertyType;

/// Stores whatever it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericType;

impl PropertyType for GenericType {
    fn tag(&self) -> &str {
        "generic"
    }
}
