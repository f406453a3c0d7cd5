//! Process-wide default registry.
//!
//! Purely a convenience: nothing in the crate reads it, every API takes a
//! registry or a definition explicitly. Install one at startup and clear it
//! at shutdown (or between tests).

use std::sync::Arc;

use parking_lot::RwLock;

use super::DefinitionRegistry;

static GLOBAL: RwLock<Option<Arc<DefinitionRegistry>>> = parking_lot::const_rwlock(None);

/// Install the default registry, returning the one it replaces.
pub fn install_global(registry: Arc<DefinitionRegistry>) -> Option<Arc<DefinitionRegistry>> {
    GLOBAL.write().replace(registry)
}

/// The default registry, if one is installed.
pub fn global() -> Option<Arc<DefinitionRegistry>> {
    GLOBAL.read().clone()
}

/// Remove the default registry, returning it.
pub fn clear_global() -> Option<Arc<DefinitionRegistry>> {
    GLOBAL.write().take()
}
