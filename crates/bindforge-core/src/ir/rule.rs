use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::argument::Parameter;
use crate::emit::Sink;

type CheckFn = dyn Fn(&Parameter, &mut dyn Sink) + Send + Sync;

/// A validation policy attached to a [`Parameter`].
///
/// At emission time each rule appends its own guard to the setter body of
/// the generated wrapper. Rules never see each other's output. The guard
/// runs against `castedValue`, the value already converted to the
/// parameter's wrapper type.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRule {
    /// Reject even values.
    Odd,
    /// Reject odd values.
    Even,
    /// A rule supplied in code. Not representable in package files.
    #[serde(skip)]
    Custom(CustomRule),
}

impl ParameterRule {
    pub fn custom(
        name: impl Into<String>,
        check: impl Fn(&Parameter, &mut dyn Sink) + Send + Sync + 'static,
    ) -> Self {
        ParameterRule::Custom(CustomRule {
            name: name.into(),
            check: Arc::new(check),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            ParameterRule::Odd => "odd",
            ParameterRule::Even => "even",
            ParameterRule::Custom(rule) => &rule.name,
        }
    }

    /// Append this rule's check for `parameter` to `sink`.
    pub fn check(&self, parameter: &Parameter, sink: &mut dyn Sink) {
        match self {
            ParameterRule::Odd => {
                parity_guard(parameter, sink, "== 0", "Only odd values are allowed")
            }
            // C++ `%` keeps the dividend's sign, so odd negatives give -1.
            ParameterRule::Even => {
                parity_guard(parameter, sink, "!= 0", "Only even values are allowed")
            }
            ParameterRule::Custom(rule) => (rule.check)(parameter, sink),
        }
    }
}

impl fmt::Debug for ParameterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterRule::Odd => f.write_str("Odd"),
            ParameterRule::Even => f.write_str("Even"),
            ParameterRule::Custom(rule) => f.debug_tuple("Custom").field(&rule.name).finish(),
        }
    }
}

/// A named closure with the [`ParameterRule::check`] contract.
#[derive(Clone)]
pub struct CustomRule {
    name: String,
    check: Arc<CheckFn>,
}

/// Custom rules compare by name.
impl PartialEq for CustomRule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// `rejects` completes `int(castedValue) % 2 ...` for the values to reject.
fn parity_guard(parameter: &Parameter, sink: &mut dyn Sink, rejects: &str, message: &str) {
    sink.line(&format!("if(int(castedValue) % 2 {rejects})"));
    sink.increase_indent();
    sink.line(&format!(
        "throw runtime::WrongParameterValue(*{}Parameter, *this, \"{message}\");",
        parameter.arg.ident.attribute()
    ));
    sink.decrease_indent();
}
