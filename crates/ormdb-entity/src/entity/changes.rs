//! Dirty tracking.

use std::collections::BTreeSet;

use super::Entity;

impl Entity {
    /// Names written since the last reset: non-i18n properties plus the i18n
    /// properties of the active locale.
    pub fn changed(&self) -> BTreeSet<String> {
        let mut changed = self.changed.clone();
        if let Some(names) = self.translations_changed.get(&self.locale) {
            changed.extend(names.iter().cloned());
        }
        changed
    }

    /// i18n properties written for `locale`, or with `None`, the locales
    /// holding any written translation.
    pub fn changed_for_locale(&self, locale: Option<&str>) -> BTreeSet<String> {
        match locale {
            Some(locale) => self
                .translations_changed
                .get(locale)
                .cloned()
                .unwrap_or_default(),
            None => self
                .translations_changed
                .iter()
                .filter(|(_, names)| !names.is_empty())
                .map(|(locale, _)| locale.clone())
                .collect(),
        }
    }

    /// Whether `name` was written since the last reset.
    pub fn is_changed(&self, name: &str) -> bool {
        self.changed().contains(&name.to_lowercase())
    }

    /// Forget every recorded write.
    pub fn reset_changed(&mut self) -> &mut Self {
        self.changed.clear();
        self.translations_changed.clear();
        self
    }

    /// Mark or unmark `name` as written.
    pub fn set_changed(&mut self, name: &str, changed: bool) -> &mut Self {
        let name = name.to_lowercase();
        if changed {
            self.changed.insert(name);
        } else {
            self.changed.remove(&name);
            if let Some(names) = self.translations_changed.get_mut(&self.locale) {
                names.remove(&name);
            }
        }
        self
    }

    pub(super) fn mark_changed(&mut self, name: &str, locale: Option<&str>) {
        match locale {
            Some(locale) => {
                self.translations_changed
                    .entry(locale.to_string())
                    .or_default()
                    .insert(name.to_string());
            }
            None => {
                self.changed.insert(name.to_string());
            }
        }
    }
}
