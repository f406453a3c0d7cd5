//! Validation rules and the registry that resolves them by name.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Inputs available to a rule besides the value under test.
pub struct RuleContext<'a> {
    /// Path of the attribute being validated, or `None` for record rules.
    pub attribute: Option<&'a str>,
    /// The whole data snapshot.
    pub data: &'a BTreeMap<String, Value>,
    /// Parameters bound on the validator with `Validator::set`.
    pub parameters: &'a BTreeMap<String, Value>,
}

impl RuleContext<'_> {
    /// Read a validator parameter.
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

/// A named validation rule.
pub trait Rule: Send + Sync {
    /// Whether `input` satisfies the rule.
    fn validate(&self, input: &Value, params: &[Value], ctx: &RuleContext<'_>) -> bool;

    /// Default message; `:attribute` and the parameter names are substituted.
    fn message(&self) -> &str {
        ":attribute is invalid."
    }

    /// Names for positional parameters, used as message placeholders.
    fn parameter_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Empty values skip every rule except the ones returning true here.
    fn applies_to_empty(&self) -> bool {
        false
    }
}

/// A rule invocation declared in a schema or on a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Registered rule name.
    pub name: String,
    /// Positional parameters.
    #[serde(default)]
    pub params: Vec<Value>,
    /// Validation groups; empty means always applied.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl RuleSpec {
    /// Create a rule invocation.
    pub fn new(name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            params,
            groups: Vec::new(),
        }
    }

    /// Restrict the rule to the given groups.
    pub fn in_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the rule runs for the requested groups.
    pub fn applies(&self, groups: &[String]) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| groups.contains(g))
    }
}

/// Rule built from a closure.
pub struct FnRule<F> {
    func: F,
    message: String,
}

impl<F> FnRule<F>
where
    F: Fn(&Value, &[Value], &RuleContext<'_>) -> bool + Send + Sync,
{
    /// Wrap a closure with its failure message.
    pub fn new(message: impl Into<String>, func: F) -> Self {
        Self {
            func,
            message: message.into(),
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&Value, &[Value], &RuleContext<'_>) -> bool + Send + Sync,
{
    fn validate(&self, input: &Value, params: &[Value], ctx: &RuleContext<'_>) -> bool {
        (self.func)(input, params, ctx)
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Rule name to implementation.
#[derive(Clone)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Shared registry holding only the built-in rules.
    pub fn builtin() -> Arc<RuleRegistry> {
        static BUILTIN: OnceLock<Arc<RuleRegistry>> = OnceLock::new();
        BUILTIN.get_or_init(|| Arc::new(RuleRegistry::default())).clone()
    }

    /// Register or replace a rule.
    pub fn register(&mut self, name: impl Into<String>, rule: impl Rule + 'static) -> &mut Self {
        self.rules.insert(name.into().to_lowercase(), Arc::new(rule));
        self
    }

    /// Register a closure rule.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, message: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Value, &[Value], &RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.register(name, FnRule::new(message, func))
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(name)
    }

    /// Whether a rule is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("required", Required)
            .register("maxlength", MaxLength)
            .register("minlength", MinLength)
            .register("in", In)
            .register("instanceof", InstanceOf)
            .register("integer", Integer)
            .register("min", Min)
            .register("max", Max);
        registry
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Value must be present and non-empty.
pub struct Required;

impl Rule for Required {
    fn validate(&self, input: &Value, params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        if matches!(params.first(), Some(Value::Bool(false))) {
            return true;
        }
        !input.is_empty()
    }

    fn message(&self) -> &str {
        ":attribute is required."
    }

    fn applies_to_empty(&self) -> bool {
        true
    }
}

/// String length or element count must not exceed the parameter.
pub struct MaxLength;

impl Rule for MaxLength {
    fn validate(&self, input: &Value, params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        match (input.length(), params.first().and_then(Value::as_i64)) {
            (Some(len), Some(max)) => len as i64 <= max,
            _ => true,
        }
    }

    fn message(&self) -> &str {
        ":attribute must be at most :length characters long."
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["length"]
    }
}

/// String length or element count must reach the parameter.
pub struct MinLength;

impl Rule for MinLength {
    fn validate(&self, input: &Value, params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        match (input.length(), params.first().and_then(Value::as_i64)) {
            (Some(len), Some(min)) => len as i64 >= min,
            _ => true,
        }
    }

    fn message(&self) -> &str {
        ":attribute must be at least :length characters long."
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["length"]
    }
}

/// Value must be one of the listed values.
pub struct In;

impl Rule for In {
    fn validate(&self, input: &Value, params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        match params.first().and_then(Value::as_list) {
            Some(allowed) => allowed.contains(input),
            None => params.contains(input),
        }
    }

    fn message(&self) -> &str {
        ":attribute must be one of :values."
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["values"]
    }
}

/// Value must be an instance of any of the given kinds.
///
/// A kind is `date`, `datetime`, or an entity class name for references.
pub struct InstanceOf;

impl InstanceOf {
    fn matches(input: &Value, kind: &str) -> bool {
        match input {
            Value::Date(_) => kind == "date",
            Value::Datetime(_) => kind == "datetime",
            Value::Reference(r) => r.class == kind,
            _ => false,
        }
    }
}

impl Rule for InstanceOf {
    fn validate(&self, input: &Value, params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        params
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| Self::matches(input, kind))
    }

    fn message(&self) -> &str {
        ":attribute must be an instance of :kind."
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["kind"]
    }
}

/// Value must be an integer.
pub struct Integer;

impl Rule for Integer {
    fn validate(&self, input: &Value, _params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        matches!(input, Value::Int(_))
    }

    fn message(&self) -> &str {
        ":attribute must be an integer."
    }
}

/// Numeric value must be at least the parameter.
pub struct Min;

impl Rule for Min {
    fn validate(&self, input: &Value, params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        match (input.as_f64(), params.first().and_then(Value::as_f64)) {
            (Some(v), Some(min)) => v >= min,
            (None, _) => false,
            _ => true,
        }
    }

    fn message(&self) -> &str {
        ":attribute must be at least :min."
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["min"]
    }
}

/// Numeric value must be at most the parameter.
pub struct Max;

impl Rule for Max {
    fn validate(&self, input: &Value, params: &[Value], _ctx: &RuleContext<'_>) -> bool {
        match (input.as_f64(), params.first().and_then(Value::as_f64)) {
            (Some(v), Some(max)) => v <= max,
            (None, _) => false,
            _ => true,
        }
    }

    fn message(&self) -> &str {
        ":attribute must be at most :max."
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["max"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EntityRef;

    fn check(rule: &dyn Rule, input: Value, params: Vec<Value>) -> bool {
        let data = BTreeMap::new();
        let parameters = BTreeMap::new();
        let ctx = RuleContext {
            attribute: Some("x"),
            data: &data,
            parameters: &parameters,
        };
        rule.validate(&input, &params, &ctx)
    }

    #[test]
    fn test_required() {
        assert!(!check(&Required, Value::Null, vec![Value::Bool(true)]));
        assert!(!check(&Required, Value::from(""), vec![]));
        assert!(check(&Required, Value::Int(0), vec![]));
        assert!(check(&Required, Value::Null, vec![Value::Bool(false)]));
    }

    #[test]
    fn test_length_rules() {
        assert!(check(&MaxLength, Value::from("héllo"), vec![Value::Int(5)]));
        assert!(!check(&MaxLength, Value::from("hello!"), vec![Value::Int(5)]));
        assert!(!check(&MinLength, Value::from("ab"), vec![Value::Int(3)]));
    }

    #[test]
    fn test_in_rule() {
        let allowed = Value::from(vec!["draft", "published"]);
        assert!(check(&In, Value::from("draft"), vec![allowed.clone()]));
        assert!(!check(&In, Value::from("deleted"), vec![allowed]));
    }

    #[test]
    fn test_instanceof_any_kind() {
        let user = Value::Reference(EntityRef::new("User", 1));
        let params = vec![Value::from("Admin"), Value::from("User")];
        assert!(check(&InstanceOf, user, params.clone()));
        assert!(!check(&InstanceOf, Value::Int(1), params));
        assert!(check(
            &InstanceOf,
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            vec![Value::from("date")]
        ));
    }

    #[test]
    fn test_rule_groups() {
        let spec = RuleSpec::new("Required", vec![]).in_groups(["publish"]);
        assert_eq!(spec.name, "required");
        assert!(!spec.applies(&[]));
        assert!(spec.applies(&["publish".to_string()]));
        assert!(RuleSpec::new("min", vec![]).applies(&[]));
    }

    #[test]
    fn test_register_fn() {
        let mut registry = RuleRegistry::default();
        registry.register_fn("even", ":attribute must be even.", |v, _, _| {
            v.as_i64().map(|i| i % 2 == 0).unwrap_or(false)
        });
        let rule = registry.get("even").unwrap();
        assert!(check(rule.as_ref(), Value::Int(4), vec![]));
        assert_eq!(rule.message(), ":attribute must be even.");
    }
}
