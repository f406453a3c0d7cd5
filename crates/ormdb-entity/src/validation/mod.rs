//! Default validation engine.
//!
//! Entities assemble a [`Validator`] from their definition and run it over a
//! raw attribute snapshot. Any validator factory injected into the registry
//! replaces how validators are created, not how they are assembled.

mod report;
mod rules;
mod validator;

pub use report::{Report, Violation};
pub use rules::{
    FnRule, In, InstanceOf, Integer, Max, MaxLength, Min, MinLength, Required, Rule, RuleContext,
    RuleRegistry, RuleSpec,
};
pub use validator::{
    resolve, AttributeValidator, MessageParams, ParamFormatter, Validator, ValidatorFactory,
};
