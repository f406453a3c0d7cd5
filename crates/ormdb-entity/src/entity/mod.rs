//! Entity attribute engine.
//!
//! An [`Entity`] holds the values of one instance of a class, bound to the
//! class [`Definition`]. Values of the active locale live in the base map;
//! values of other locales for i18n properties live in the translation map.
//!
//! There are two ways in and out:
//!
//! - the hard path (`set_raw`, `get_raw`) stores and reads values as given;
//! - the soft path (`set`, `get` and their variants) runs the hooks and
//!   coerces values through the property type first.
//!
//! Both paths treat a write of the value already stored as a no-op, so it
//! never marks the property dirty.

mod changes;
mod locale;
mod validation;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::catalog::Definition;
use crate::collection::ManyCollection;
use crate::error::Result;
use crate::value::{EntityRef, FromValue, Value};

pub use locale::{LocaleArg, ALL_LOCALES};

/// Bag names that can never hold an undeclared attribute.
pub const RESERVED_NAMES: [&str; 2] = ["properties", "translations"];

/// Options of a soft write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOptions {
    /// Target locale.
    pub locale: LocaleArg,
    /// Run the pre-set hooks.
    pub hook: bool,
    /// Record the write in the dirty sets.
    pub track_change: bool,
    /// Turn coercion failures into Null and swallow hook errors.
    pub silent: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            locale: LocaleArg::Active,
            hook: true,
            track_change: true,
            silent: false,
        }
    }
}

impl SetOptions {
    /// Default options: active locale, hooks on, tracked, not silent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target another locale.
    pub fn locale(mut self, locale: impl Into<LocaleArg>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Skip the pre-set hooks.
    pub fn without_hook(mut self) -> Self {
        self.hook = false;
        self
    }

    /// Do not record the write.
    pub fn untracked(mut self) -> Self {
        self.track_change = false;
        self
    }

    /// Collapse failures to Null instead of returning them.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// One instance of an entity class.
///
/// Not `Sync`: missing translations are loaded lazily on read.
#[derive(Debug, Clone)]
pub struct Entity {
    definition: Arc<Definition>,
    locale: String,
    properties: BTreeMap<String, Value>,
    translations: RefCell<BTreeMap<String, BTreeMap<String, Value>>>,
    extra: BTreeMap<String, Value>,
    changed: BTreeSet<String>,
    translations_changed: BTreeMap<String, BTreeSet<String>>,
    parameters: BTreeMap<String, Value>,
}

impl Entity {
    /// A new entity in the definition's default locale, defaults loaded.
    pub fn new(definition: Arc<Definition>) -> Self {
        let mut entity = Self::without_defaults(definition);
        entity.load_defaults();
        entity
    }

    /// A new entity without any value.
    pub fn without_defaults(definition: Arc<Definition>) -> Self {
        let locale = definition.default_locale().to_string();
        Self {
            definition,
            locale,
            properties: BTreeMap::new(),
            translations: RefCell::new(BTreeMap::new()),
            extra: BTreeMap::new(),
            changed: BTreeSet::new(),
            translations_changed: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// A new entity in `locale` (or the default one), defaults loaded, then
    /// `attrs` applied through the soft path.
    pub fn with_attributes(
        definition: Arc<Definition>,
        attrs: BTreeMap<String, Value>,
        locale: Option<&str>,
    ) -> Result<Self> {
        let mut entity = Self::without_defaults(definition);
        if let Some(locale) = locale {
            entity.locale = locale.to_string();
        }
        entity.load_defaults();
        entity.set_many(attrs, SetOptions::default())?;
        Ok(entity)
    }

    /// Class definition.
    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    /// Class identifier.
    pub fn class(&self) -> &str {
        self.definition.class()
    }

    /// Store every property's default without marking it dirty.
    pub fn load_defaults(&mut self) -> &mut Self {
        let definition = Arc::clone(&self.definition);
        for property in definition.properties() {
            let value = property.default_value(definition.class());
            self.store(property.name(), value, &LocaleArg::Active, false);
        }
        self
    }

    /// Whether the entity has no id yet.
    pub fn is_new(&self) -> bool {
        self.get("id").is_null()
    }

    /// Whether the entity has an id.
    pub fn is_old(&self) -> bool {
        !self.is_new()
    }

    /// Reference to this entity, once it has an integer id.
    pub fn reference(&self) -> Option<EntityRef> {
        self.get("id")
            .as_i64()
            .map(|id| EntityRef::new(self.class(), id))
    }

    // Hard path

    /// Store a value in the active locale, bypassing hooks and coercion.
    pub fn set_raw(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.set_raw_with(name, value, &SetOptions::default())
    }

    /// Store a value bypassing hooks and coercion. Only the locale and
    /// tracking options apply.
    pub fn set_raw_with(&mut self, name: &str, value: impl Into<Value>, options: &SetOptions) -> &mut Self {
        let name = name.to_lowercase();
        let value = value.into();
        if let LocaleArg::Many(locales) = &options.locale {
            let mut values = into_locale_map(value);
            for locale in locales {
                let value = values.remove(locale).unwrap_or_default();
                self.store(&name, value, &LocaleArg::One(locale.clone()), options.track_change);
            }
            return self;
        }
        self.store(&name, value, &options.locale, options.track_change);
        self
    }

    /// Read a stored value in the active locale, bypassing the `get` hook.
    pub fn get_raw(&self, name: &str) -> Value {
        self.get_raw_in(name, LocaleArg::Active)
    }

    /// Read a stored value, bypassing the `get` hook.
    ///
    /// A missing translation gets one load attempt through the
    /// `get_translations` hook. Unknown names read as Null.
    pub fn get_raw_in(&self, name: &str, locale: impl Into<LocaleArg>) -> Value {
        let name = name.to_lowercase();
        let locale = locale.into();
        let Some(property) = self.definition.property(&name) else {
            return self.extra.get(&name).cloned().unwrap_or_default();
        };
        if !property.is_i18n() || locale.is_active(&self.locale) {
            return self.properties.get(&name).cloned().unwrap_or_default();
        }
        match locale {
            LocaleArg::One(locale) => self.translation(&name, &locale),
            LocaleArg::Many(locales) => self.per_locale(&locales, |l| self.get_raw_in(&name, l)),
            _ => self.per_locale(&self.locales(), |l| self.get_raw_in(&name, l)),
        }
    }

    // Soft path

    /// Write a value in the active locale through hooks and coercion.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_with(name, value, SetOptions::default())
    }

    /// Write a value in `locale` through hooks and coercion.
    pub fn set_in(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        locale: impl Into<LocaleArg>,
    ) -> Result<&mut Self> {
        self.set_with(name, value, SetOptions::default().locale(locale))
    }

    /// Write several values with the same options.
    pub fn set_many(&mut self, values: BTreeMap<String, Value>, options: SetOptions) -> Result<&mut Self> {
        for (name, value) in values {
            self.set_with(&name, value, options.clone())?;
        }
        Ok(self)
    }

    /// Write a value: pre-set hooks, then coercion, then the store.
    ///
    /// With [`LocaleArg::Many`], `value` is a locale → value map fanned out
    /// to each listed locale; a missing entry writes Null. With
    /// [`LocaleArg::All`], `value` is a locale → value map for an i18n
    /// property.
    pub fn set_with(&mut self, name: &str, value: impl Into<Value>, options: SetOptions) -> Result<&mut Self> {
        let name = name.to_lowercase();
        let mut value = value.into();

        if let LocaleArg::Many(locales) = &options.locale {
            let mut values = into_locale_map(value);
            for locale in locales {
                let value = values.remove(locale).unwrap_or_default();
                let options = options.clone().locale(LocaleArg::One(locale.clone()));
                self.set_with(&name, value, options)?;
            }
            return Ok(self);
        }

        let definition = Arc::clone(&self.definition);

        if options.hook {
            let locale = options.locale.label(&self.locale).to_string();
            if let Err(e) = definition.hooks().pre_set(self, &name, &mut value, &locale) {
                if !options.silent {
                    return Err(e);
                }
                debug!(class = definition.class(), property = %name, error = %e, "pre-set failure swallowed, write skipped");
                return Ok(self);
            }
        }

        let Some(property) = definition.property(&name) else {
            if RESERVED_NAMES.contains(&name.as_str()) {
                warn!(class = definition.class(), name = %name, "ignoring write to reserved name");
                return Ok(self);
            }
            let value = match value {
                Value::List(items) => {
                    Value::Collection(ManyCollection::new(definition.class(), &name).with_items(items))
                }
                other => other,
            };
            self.extra.insert(name, value);
            return Ok(self);
        };

        let class = definition.class();
        let value = match (value, &options.locale) {
            (Value::Map(values), LocaleArg::All) if property.is_i18n() => {
                let mut coerced = BTreeMap::new();
                for (locale, value) in values {
                    coerced.insert(locale, property.coerce(value, class, options.silent)?);
                }
                Value::Map(coerced)
            }
            (value, _) => property.coerce(value, class, options.silent)?,
        };

        self.store(&name, value, &options.locale, options.track_change);
        Ok(self)
    }

    /// Read a value in the active locale, consulting the `get` hook first.
    pub fn get(&self, name: &str) -> Value {
        self.get_with(name, LocaleArg::Active, true)
    }

    /// Read a value in `locale`, consulting the `get` hook first.
    ///
    /// [`LocaleArg::Many`] and [`LocaleArg::All`] return a locale → value
    /// map for i18n properties.
    pub fn get_in(&self, name: &str, locale: impl Into<LocaleArg>) -> Value {
        self.get_with(name, locale, true)
    }

    /// Read a value; with `hook`, a non-null answer from the `get` hook wins.
    pub fn get_with(&self, name: &str, locale: impl Into<LocaleArg>, hook: bool) -> Value {
        let name = name.to_lowercase();
        let locale = locale.into();
        let i18n = self
            .definition
            .property(&name)
            .is_some_and(|p| p.is_i18n());

        if i18n {
            match &locale {
                LocaleArg::Many(locales) => {
                    return self.per_locale(locales, |l| self.get_with(&name, l, hook));
                }
                LocaleArg::All => {
                    return self.per_locale(&self.locales(), |l| self.get_with(&name, l, hook));
                }
                _ => {}
            }
        }

        if hook {
            let label = locale.label(&self.locale);
            if let Some(value) = self.definition.hooks().get(self, &name, label) {
                if !value.is_null() {
                    return value;
                }
            }
        }
        self.get_raw_in(&name, locale)
    }

    /// Read a value as `T`; `None` when it has another shape.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        T::from_value(&self.get(name))
    }

    /// Whether a non-null value is stored under `name` in the active locale.
    pub fn has(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let stored = if self.definition.has_property(&name) {
            self.properties.get(&name)
        } else {
            self.extra.get(&name)
        };
        stored.is_some_and(|v| !v.is_null())
    }

    /// Drop the value stored under `name` in the active locale.
    pub fn unset(&mut self, name: &str) -> &mut Self {
        let name = name.to_lowercase();
        if self.definition.has_property(&name) {
            self.properties.remove(&name);
        } else {
            self.extra.remove(&name);
        }
        self
    }

    /// Transient parameter.
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Set a transient parameter; it is not part of the entity's values.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    // Serializer access

    /// Property values in the active locale.
    pub fn to_array_raw(&self) -> BTreeMap<String, Value> {
        self.definition.serializer().to_array_raw(self)
    }

    /// Encoded property values in the active locale.
    pub fn to_array(&self) -> serde_json::Map<String, serde_json::Value> {
        self.definition.serializer().to_array(self)
    }

    /// Encoded property values as JSON text.
    pub fn to_json(&self) -> Result<String> {
        self.definition.serializer().to_json(self)
    }

    /// Property values with i18n properties keyed by locale.
    pub fn to_array_raw_i18n(&self, locales: &[String]) -> BTreeMap<String, Value> {
        self.definition.serializer().to_array_raw_i18n(self, locales)
    }

    /// Encoded property values with i18n properties keyed by locale.
    pub fn to_array_i18n(&self, locales: &[String]) -> serde_json::Map<String, serde_json::Value> {
        self.definition.serializer().to_array_i18n(self, locales)
    }

    /// Encoded property values with translations as JSON text.
    pub fn to_json_i18n(&self, locales: &[String]) -> Result<String> {
        self.definition.serializer().to_json_i18n(self, locales)
    }

    // Storage

    fn store(&mut self, name: &str, value: Value, locale: &LocaleArg, track: bool) {
        let Some(property) = self.definition.property(name) else {
            if !RESERVED_NAMES.contains(&name) {
                self.extra.insert(name.to_string(), value);
            }
            return;
        };
        let i18n = property.is_i18n();

        if !i18n || locale.is_active(&self.locale) {
            self.store_base(name, value, i18n, track);
            return;
        }
        match locale {
            LocaleArg::One(locale) => self.store_translation(locale, name, value, track),
            LocaleArg::All => match value {
                Value::Map(values) => {
                    for (locale, value) in values {
                        if locale == self.locale {
                            self.store_base(name, value, true, track);
                        } else {
                            self.store_translation(&locale, name, value, track);
                        }
                    }
                }
                other => {
                    warn!(
                        class = self.definition.class(),
                        property = name,
                        kind = other.type_name(),
                        "writing all locales needs a locale map"
                    );
                }
            },
            _ => {}
        }
    }

    fn store_base(&mut self, name: &str, value: Value, i18n: bool, track: bool) {
        if self.properties.get(name) == Some(&value) {
            return;
        }
        self.properties.insert(name.to_string(), value);
        if track {
            let locale = i18n.then(|| self.locale.clone());
            self.mark_changed(name, locale.as_deref());
        }
    }

    fn store_translation(&mut self, locale: &str, name: &str, value: Value, track: bool) {
        let bucket = self
            .translations
            .get_mut()
            .entry(locale.to_string())
            .or_default();
        if bucket.get(name) == Some(&value) {
            return;
        }
        bucket.insert(name.to_string(), value);
        if track {
            self.mark_changed(name, Some(locale));
        }
    }

    fn stored_translation(&self, name: &str, locale: &str) -> Option<Value> {
        self.translations
            .borrow()
            .get(locale)
            .and_then(|bucket| bucket.get(name))
            .cloned()
    }

    fn translation(&self, name: &str, locale: &str) -> Value {
        if let Some(value) = self.stored_translation(name, locale) {
            return value;
        }

        trace!(class = self.class(), property = name, locale, "loading translations");
        if let Some(loaded) = self.definition.hooks().get_translations(self, name, locale) {
            let mut translations = self.translations.borrow_mut();
            let bucket = translations.entry(locale.to_string()).or_default();
            for (key, value) in loaded {
                bucket.entry(key.to_lowercase()).or_insert(value);
            }
        }
        self.stored_translation(name, locale).unwrap_or_default()
    }

    fn per_locale(&self, locales: &[String], read: impl Fn(LocaleArg) -> Value) -> Value {
        Value::Map(
            locales
                .iter()
                .map(|locale| (locale.clone(), read(LocaleArg::One(locale.clone()))))
                .collect(),
        )
    }
}

fn into_locale_map(value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Map(values) => values,
        other => {
            warn!(kind = other.type_name(), "expected a locale map");
            BTreeMap::new()
        }
    }
}
