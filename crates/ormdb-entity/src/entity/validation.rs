//! Validator assembly and validation runs.

use std::collections::BTreeMap;

use tracing::debug;

use super::{Entity, LocaleArg};
use crate::catalog::Property;
use crate::hooks::ValidationFlow;
use crate::validation::{Report, Validator, Violation};
use crate::value::Value;

/// Report message set whenever an entity fails validation.
pub const INVALID_MESSAGE: &str = "Entity is not valid";

impl Entity {
    /// Assemble a validator for this entity.
    ///
    /// With `locales`, each i18n property gets one path per locale
    /// (`title.fr`), otherwise one path per property. `many` properties get
    /// one path per element (`tags.0`). Definition messages are merged last,
    /// `entity` and `class` are bound as validator parameters, then the hooks
    /// may add record-level rules.
    pub fn validator(&self, locales: &[String]) -> Validator {
        let definition = self.definition();
        let mut validator = definition.create_validator();

        for property in definition.properties() {
            let name = property.name();
            if property.is_i18n() && !locales.is_empty() {
                for locale in locales {
                    let base = format!("{}.{}", name, locale);
                    if property.is_many() {
                        let value = self.get_with(name, LocaleArg::One(locale.clone()), false);
                        attach_elements(&mut validator, property, &base, &value);
                    } else {
                        attach(&mut validator, property, base, true);
                    }
                }
            } else if property.is_many() {
                let value = self.get_with(name, LocaleArg::Active, false);
                attach_elements(&mut validator, property, name, &value);
            } else {
                attach(&mut validator, property, name.to_string(), false);
            }
        }

        validator.attributes_messages(definition.messages().clone());
        validator
            .set("entity", self.reference().map(Value::Reference).unwrap_or_default())
            .set("class", Value::from(self.class()));

        definition.hooks().prepare_validator(self, &mut validator);
        validator
    }

    /// Whether the entity passes validation for `groups`.
    pub fn valid(&self, groups: &[String]) -> bool {
        self.errors(groups).is_valid()
    }

    /// Validation report for `groups`.
    pub fn errors(&self, groups: &[String]) -> Report {
        self.run_validation(self.to_array_raw(), &[], groups)
    }

    /// Whether the entity and its translations pass validation.
    ///
    /// An empty `locales` means every locale the entity holds.
    pub fn valid_i18n(&self, locales: &[String], groups: &[String]) -> bool {
        self.errors_i18n(locales, groups).is_valid()
    }

    /// Validation report covering translations.
    pub fn errors_i18n(&self, locales: &[String], groups: &[String]) -> Report {
        let locales = if locales.is_empty() {
            self.locales()
        } else {
            locales.to_vec()
        };
        self.run_validation(self.to_array_raw_i18n(&locales), &locales, groups)
    }

    fn run_validation(
        &self,
        mut data: BTreeMap<String, Value>,
        locales: &[String],
        groups: &[String],
    ) -> Report {
        let mut validator = self.validator(locales);
        let flow = self
            .definition()
            .hooks()
            .validation(self, &mut validator, groups, &mut data);

        let mut report = match flow {
            ValidationFlow::Continue => validator.errors(&data, groups),
            ValidationFlow::Veto(reason) => {
                debug!(class = self.class(), reason = %reason, "validation vetoed by hook");
                let mut report = Report::new();
                report.add_record(Violation {
                    rule: "validation".to_string(),
                    message: reason,
                });
                report
            }
        };
        if report.has_errors() {
            report.set_message(INVALID_MESSAGE);
        }
        report
    }
}

fn attach(validator: &mut Validator, property: &Property, path: String, label: bool) {
    let attribute = validator.attribute(path);
    property.prepare_validator(attribute);
    if label {
        attribute.label(property.name());
    }
    attribute.rule_messages(property.messages());
}

fn attach_elements(validator: &mut Validator, property: &Property, base: &str, value: &Value) {
    if let Value::Collection(collection) = value {
        for index in 0..collection.len() {
            attach(validator, property, format!("{}.{}", base, index), true);
        }
    }
}
