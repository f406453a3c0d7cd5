//! Rule-based validator over attribute snapshots.
//!
//! A validator is a set of attribute paths, each carrying rule invocations and
//! message overrides. Paths address nested data with dots: `title.fr` reads
//! the `fr` key of the `title` map, `tags.1` the second element of a list.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::report::{Report, Violation};
use super::rules::{RuleContext, RuleRegistry, RuleSpec};
use crate::value::Value;

/// Message placeholder values, keyed by placeholder name without the colon.
pub type MessageParams = BTreeMap<String, String>;

/// Callback that rewrites placeholder values before a message is rendered.
pub type ParamFormatter = Arc<dyn Fn(&mut MessageParams) + Send + Sync>;

/// Creates the validators entities assemble their rules into.
pub type ValidatorFactory = Arc<dyn Fn() -> Validator + Send + Sync>;

/// Rules and messages for a single attribute path.
#[derive(Clone, Default)]
pub struct AttributeValidator {
    rules: Vec<RuleSpec>,
    messages: BTreeMap<String, String>,
    formatters: Vec<ParamFormatter>,
}

impl AttributeValidator {
    /// Add a rule invocation.
    pub fn rule(&mut self, name: impl Into<String>, params: Vec<Value>) -> &mut Self {
        self.rules.push(RuleSpec::new(name, params));
        self
    }

    /// Add several rule invocations.
    pub fn rules(&mut self, rules: impl IntoIterator<Item = RuleSpec>) -> &mut Self {
        self.rules.extend(rules);
        self
    }

    /// Override messages per rule name.
    pub fn rule_messages<K, V>(&mut self, messages: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (rule, message) in messages {
            self.messages.insert(rule.into().to_lowercase(), message.into());
        }
        self
    }

    /// Rewrite placeholder values before rendering messages.
    pub fn format_parameters<F>(&mut self, formatter: F) -> &mut Self
    where
        F: Fn(&mut MessageParams) + Send + Sync + 'static,
    {
        self.formatters.push(Arc::new(formatter));
        self
    }

    /// Render messages with `label` as the `:attribute` placeholder.
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        self.format_parameters(move |params| {
            params.insert("attribute".to_string(), label.clone());
        })
    }

    /// Rule invocations in order.
    pub fn rule_specs(&self) -> &[RuleSpec] {
        &self.rules
    }

    /// Whether a rule with this name is attached.
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }
}

impl fmt::Debug for AttributeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeValidator")
            .field("rules", &self.rules)
            .field("messages", &self.messages)
            .field("formatters", &self.formatters.len())
            .finish()
    }
}

/// Validator for a whole record.
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<RuleRegistry>,
    attributes: Vec<(String, AttributeValidator)>,
    record_rules: Vec<RuleSpec>,
    attribute_messages: BTreeMap<String, BTreeMap<String, String>>,
    parameters: BTreeMap<String, Value>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Validator using the built-in rules.
    pub fn new() -> Self {
        Self::with_registry(RuleRegistry::builtin())
    }

    /// Validator resolving rule names against `registry`.
    pub fn with_registry(registry: Arc<RuleRegistry>) -> Self {
        Self {
            registry,
            attributes: Vec::new(),
            record_rules: Vec::new(),
            attribute_messages: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Rule registry in use.
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Get or create the validator for an attribute path.
    pub fn attribute(&mut self, path: impl Into<String>) -> &mut AttributeValidator {
        let path = path.into();
        let index = match self.attributes.iter().position(|(p, _)| *p == path) {
            Some(index) => index,
            None => {
                self.attributes.push((path, AttributeValidator::default()));
                self.attributes.len() - 1
            }
        };
        &mut self.attributes[index].1
    }

    /// Validator for a path, if one was created.
    pub fn get_attribute(&self, path: &str) -> Option<&AttributeValidator> {
        self.attributes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, a)| a)
    }

    /// Attribute paths in creation order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(p, _)| p.as_str())
    }

    /// Add a record-level rule; it receives the whole snapshot as a map.
    pub fn rule(&mut self, name: impl Into<String>, params: Vec<Value>) -> &mut Self {
        self.record_rules.push(RuleSpec::new(name, params));
        self
    }

    /// Add several record-level rules.
    pub fn rules(&mut self, rules: impl IntoIterator<Item = RuleSpec>) -> &mut Self {
        self.record_rules.extend(rules);
        self
    }

    /// Merge per-attribute message overrides (attribute → rule → message).
    ///
    /// Keys may be full paths or bare property names.
    pub fn attributes_messages(
        &mut self,
        messages: impl IntoIterator<Item = (String, BTreeMap<String, String>)>,
    ) -> &mut Self {
        for (attribute, rules) in messages {
            self.attribute_messages
                .entry(attribute.to_lowercase())
                .or_default()
                .extend(rules);
        }
        self
    }

    /// Bind a parameter readable by rules through the context.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Read a bound parameter.
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Whether `data` passes every applicable rule.
    pub fn valid(&self, data: &BTreeMap<String, Value>, groups: &[String]) -> bool {
        self.errors(data, groups).is_valid()
    }

    /// Run every applicable rule against `data`.
    pub fn errors(&self, data: &BTreeMap<String, Value>, groups: &[String]) -> Report {
        let mut report = Report::new();

        for (path, attribute) in &self.attributes {
            let input = resolve(data, path).unwrap_or(&Value::Null);
            let ctx = RuleContext {
                attribute: Some(path.as_str()),
                data,
                parameters: &self.parameters,
            };
            for spec in attribute.rules.iter().filter(|r| r.applies(groups)) {
                if let Some(violation) = self.check(spec, input, &ctx, Some((path.as_str(), attribute))) {
                    report.add(path.clone(), violation);
                }
            }
        }

        if !self.record_rules.is_empty() {
            let record = Value::Map(data.clone());
            let ctx = RuleContext {
                attribute: None,
                data,
                parameters: &self.parameters,
            };
            for spec in self.record_rules.iter().filter(|r| r.applies(groups)) {
                if let Some(violation) = self.check(spec, &record, &ctx, None) {
                    report.add_record(violation);
                }
            }
        }

        report
    }

    fn check(
        &self,
        spec: &RuleSpec,
        input: &Value,
        ctx: &RuleContext<'_>,
        attribute: Option<(&str, &AttributeValidator)>,
    ) -> Option<Violation> {
        let path = attribute.map(|(p, _)| p).unwrap_or("record");

        let Some(rule) = self.registry.get(&spec.name) else {
            warn!(rule = %spec.name, attribute = path, "validation rule is not registered");
            return Some(Violation {
                rule: spec.name.clone(),
                message: format!("{} failed unregistered rule {}.", path, spec.name),
            });
        };

        if input.is_empty() && !rule.applies_to_empty() {
            return None;
        }
        if rule.validate(input, &spec.params, ctx) {
            return None;
        }

        let mut params = MessageParams::new();
        params.insert("attribute".to_string(), path.to_string());
        params.insert("rule".to_string(), spec.name.clone());
        for (name, value) in rule.parameter_names().iter().zip(&spec.params) {
            params.insert(name.to_string(), value.to_string());
        }

        let template = self
            .message_override(path, attribute, &spec.name)
            .unwrap_or_else(|| rule.message().to_string());

        if let Some((_, attr)) = attribute {
            for formatter in &attr.formatters {
                formatter(&mut params);
            }
        }

        Some(Violation {
            rule: spec.name.clone(),
            message: render(&template, &params),
        })
    }

    fn message_override(
        &self,
        path: &str,
        attribute: Option<(&str, &AttributeValidator)>,
        rule: &str,
    ) -> Option<String> {
        // Full path, then bare property name, then the attribute's own messages.
        let property = path.split('.').next().unwrap_or(path);
        self.attribute_messages
            .get(path)
            .and_then(|m| m.get(rule))
            .or_else(|| {
                self.attribute_messages
                    .get(property)
                    .and_then(|m| m.get(rule))
            })
            .or_else(|| attribute.and_then(|(_, a)| a.messages.get(rule)))
            .cloned()
    }
}

/// Resolve a dotted path inside a snapshot.
pub fn resolve<'a>(data: &'a BTreeMap<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = current.child(segment)?;
    }
    Some(current)
}

fn render(template: &str, params: &MessageParams) -> String {
    // Longest names first so `:attribute` is not clobbered by a shorter key.
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    let mut out = template.to_string();
    for key in keys {
        out = out.replace(&format!(":{}", key), &params[key]);
    }
    out
}
