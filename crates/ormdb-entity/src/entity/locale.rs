//! Locale selection and translation.

use tracing::trace;

use super::Entity;

/// Token selecting every locale at once.
pub const ALL_LOCALES: &str = "all";

/// Which locale a read or write targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocaleArg {
    /// The entity's active locale.
    #[default]
    Active,
    /// A single locale.
    One(String),
    /// Every locale; writes take a locale → value map.
    All,
    /// Several locales; writes take a locale → value map and reads return one.
    Many(Vec<String>),
}

impl LocaleArg {
    /// A single locale; `"all"` selects every locale.
    pub fn one(locale: impl Into<String>) -> Self {
        let locale = locale.into();
        if locale == ALL_LOCALES {
            LocaleArg::All
        } else {
            LocaleArg::One(locale)
        }
    }

    /// Several locales.
    pub fn many(locales: impl IntoIterator<Item = impl Into<String>>) -> Self {
        LocaleArg::Many(locales.into_iter().map(Into::into).collect())
    }

    /// Name handed to hooks.
    pub(crate) fn label<'a>(&'a self, active: &'a str) -> &'a str {
        match self {
            LocaleArg::Active | LocaleArg::Many(_) => active,
            LocaleArg::One(locale) => locale,
            LocaleArg::All => ALL_LOCALES,
        }
    }

    /// The single locale this targets, if it is the active one.
    pub(crate) fn is_active(&self, active: &str) -> bool {
        match self {
            LocaleArg::Active => true,
            LocaleArg::One(locale) => locale == active,
            _ => false,
        }
    }
}

impl From<&str> for LocaleArg {
    fn from(locale: &str) -> Self {
        LocaleArg::one(locale)
    }
}

impl From<String> for LocaleArg {
    fn from(locale: String) -> Self {
        LocaleArg::one(locale)
    }
}

impl From<&String> for LocaleArg {
    fn from(locale: &String) -> Self {
        LocaleArg::one(locale.as_str())
    }
}

impl From<Option<&str>> for LocaleArg {
    fn from(locale: Option<&str>) -> Self {
        locale.map(LocaleArg::one).unwrap_or_default()
    }
}

impl From<Vec<String>> for LocaleArg {
    fn from(locales: Vec<String>) -> Self {
        LocaleArg::Many(locales)
    }
}

impl From<&[&str]> for LocaleArg {
    fn from(locales: &[&str]) -> Self {
        LocaleArg::many(locales.iter().copied())
    }
}

impl Entity {
    /// Active locale.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Switch the active locale without moving any value.
    pub fn set_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.locale = locale.into();
        self
    }

    /// The active locale followed by every locale holding translations.
    pub fn locales(&self) -> Vec<String> {
        let mut locales = vec![self.locale.clone()];
        for locale in self.translations.borrow().keys() {
            if *locale != self.locale {
                locales.push(locale.clone());
            }
        }
        locales
    }

    /// A copy of this entity in another locale.
    ///
    /// The current base values are archived under the current locale and the
    /// values stored for `locale` become the base values. i18n properties
    /// without a translation keep the current value. Promoted values that
    /// differ from the current ones are marked changed in the new locale.
    /// `self` is unchanged.
    pub fn translate(&self, locale: impl Into<String>) -> Entity {
        let locale = locale.into();
        let mut translated = self.clone();
        translated.locale = locale.clone();

        let translations = translated.translations.get_mut();
        let promoted = translations.remove(&locale).unwrap_or_default();
        translations.insert(self.locale.clone(), self.properties.clone());

        trace!(
            class = self.definition.class(),
            from = %self.locale,
            to = %locale,
            promoted = promoted.len(),
            "translating entity"
        );
        for (name, value) in promoted {
            if translated.properties.get(&name) == Some(&value) {
                continue;
            }
            let i18n = self
                .definition
                .property(&name)
                .is_some_and(|p| p.is_i18n());
            translated.properties.insert(name.clone(), value);
            translated.mark_changed(&name, i18n.then_some(locale.as_str()));
        }
        translated
    }
}
