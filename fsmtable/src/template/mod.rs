//! Template compiler.
//!
//! A template declares a set of [`Value`]s followed by one or more named
//! states, each an ordered list of [`Rule`]s:
//!
//! ```text
//! Value Required Interface (\S+)
//! Value Status (up|down)
//!
//! Start
//!   ^${Interface}\s+${Status} -> Record
//! ```
//!
//! Compilation produces an immutable [`CompiledTemplate`] that can be shared
//! (behind an `Arc`) by any number of concurrent executions.

mod compile;
mod rule;
mod value;

pub use rule::{LineAction, RecordAction, Rule};
pub use value::{Value, ValueOptions};

use indexmap::IndexMap;

use crate::error::TemplateError;

/// Initial state of every template.
pub const START_STATE: &str = "Start";

/// Terminal state: stop reading input, emit nothing implicitly.
pub const END_STATE: &str = "End";

/// State run once against an empty line after the input is exhausted.
pub const EOF_STATE: &str = "EOF";

/// A named, ordered list of rules.
#[derive(Debug, Clone)]
pub struct State {
    /// State name.
    pub name: String,

    /// Rules, tried top to bottom.
    pub rules: Vec<Rule>,
}

/// An immutable, executable template.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    name: String,
    values: Vec<Value>,
    states: IndexMap<String, State>,
}

impl CompiledTemplate {
    /// Compile template source under a name used in error messages and caching.
    pub fn compile(name: impl AsRef<str>, source: &str) -> Result<Self, TemplateError> {
        compile::compile(name.as_ref(), source)
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared values, in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get a value by name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Value names, in declaration order.
    pub fn header(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name.as_str()).collect()
    }

    /// Names of the values carrying a given option.
    pub fn values_with(&self, option: ValueOptions) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| v.has(option))
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Names of the `Key` values.
    pub fn keys(&self) -> Vec<&str> {
        self.values_with(ValueOptions::KEY)
    }

    /// Get a state by name.
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    /// States in declaration order (`End` excluded).
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }
}
