//! Integration tests for the definition registry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use ormdb_entity::{
    clear_global, global, install_global, DefinitionCache, DefinitionRegistry, DefinitionSchema,
    MemoryCache, PropertySchema, RegistryConfig, Value,
};

fn user_schema() -> DefinitionSchema {
    DefinitionSchema::new("User")
        .with_property(PropertySchema::integer("id"))
        .with_property(PropertySchema::generic("name").required().with_length(20))
        .with_property(PropertySchema::datetime("created").with_default_provider("now"))
}

#[test]
fn test_concurrent_lookups_build_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = DefinitionRegistry::default();
    let counter = Arc::clone(&builds);
    registry.register("User", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        user_schema()
    });

    let definitions: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.get("User").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    for definition in &definitions[1..] {
        assert!(Arc::ptr_eq(&definitions[0], definition));
    }
}

#[test]
fn test_classes_build_independently() {
    let registry = DefinitionRegistry::default();
    registry.register_schema(user_schema());
    registry.register_schema(
        DefinitionSchema::new("Group").with_property(PropertySchema::generic("label")),
    );

    thread::scope(|scope| {
        scope.spawn(|| registry.get("User").unwrap());
        scope.spawn(|| registry.get("Group").unwrap());
    });

    assert!(registry.has("User"));
    assert!(registry.has("Group"));
    let mut classes: Vec<String> = registry
        .definitions()
        .iter()
        .map(|d| d.class().to_string())
        .collect();
    classes.sort();
    assert_eq!(classes, ["Group", "User"]);
}

#[test]
fn test_shared_memory_cache() {
    let cache = Arc::new(MemoryCache::new());
    let shared: Arc<dyn DefinitionCache> = cache.clone();

    let registry = DefinitionRegistry::new(RegistryConfig::new().with_shared_cache(shared));
    registry.register_schema(user_schema());
    registry.get("User").unwrap();

    let stored = cache.get("definitions.User").unwrap();
    let schema: DefinitionSchema = serde_json::from_str(&stored).unwrap();
    assert_eq!(schema, user_schema());
}

#[test]
fn test_registry_made_entities() {
    let registry = DefinitionRegistry::new(RegistryConfig::new().with_default_locale("de"));
    registry.register_schema(user_schema());

    let attrs = BTreeMap::from([("name".to_string(), Value::from("Ada"))]);
    let user = registry.make("User", attrs, Some("fr")).unwrap();
    assert_eq!(user.locale(), "fr");
    assert_eq!(user.get("name"), Value::from("Ada"));
    assert!(user.get("created").as_datetime().is_some());
    assert!(user.valid(&[]));

    let unknown = registry.make("Ghost", BTreeMap::new(), None);
    assert!(unknown.is_err());
}

#[test]
fn test_global_registry() {
    let registry = Arc::new(DefinitionRegistry::default());
    registry.register_schema(user_schema());
    install_global(Arc::clone(&registry));

    let definition = global().unwrap().get("User").unwrap();
    assert_eq!(definition.class(), "User");

    clear_global();
    assert!(global().is_none());
}
