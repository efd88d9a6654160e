use serde::{Deserialize, Deserializer, Serialize};

use super::ident::Ident;
use super::rule::ParameterRule;
use crate::emit::Sink;
use crate::visit::NodeKind;

/// Native type of every enum parameter.
pub const ENUM_NATIVE_TYPE: &str = "int";
/// Wrapper type of every enum parameter.
pub const ENUM_WRAPPER_TYPE: &str = "Enum";
/// Namespace used for enum descriptions without an explicit native identifier.
pub const NATIVE_NAMESPACE: &str = "cv";

/// Fields shared by every argument kind.
///
/// A bare `Argument` is never visited; it is the template the concrete kinds
/// are built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub ident: Ident,
    #[serde(default)]
    pub name: String,
    /// Type on the native library side (e.g. `int`, `cv::Mat`).
    #[serde(default)]
    pub cv_type: String,
    /// Type exposed by the generated wrapper (e.g. `UInt32`, `Image`).
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub description: String,
    /// Fragments run before the native call.
    #[serde(default)]
    pub init_in: Vec<String>,
    /// Fragments run after the native call.
    #[serde(default)]
    pub init_out: Vec<String>,
}

impl Argument {
    pub fn new(
        ident: impl Into<Ident>,
        name: impl Into<String>,
        cv_type: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            ident: ident.into(),
            name: name.into(),
            cv_type: cv_type.into(),
            data_type: data_type.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_init_in(mut self, fragment: impl Into<String>) -> Self {
        self.init_in.push(fragment.into());
        self
    }

    pub fn with_init_out(mut self, fragment: impl Into<String>) -> Self {
        self.init_out.push(fragment.into());
        self
    }
}

/// A call-time input, copied from an existing argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    #[serde(flatten)]
    pub arg: Argument,
    /// The input buffer may be reused as the output.
    #[serde(default)]
    pub in_place: bool,
}

impl Input {
    /// Copy `base` (if any) and mark the input as in-place or not. Without a
    /// base the shared fields stay at their defaults.
    pub fn new(base: Option<&Argument>, in_place: bool) -> Self {
        Self {
            arg: base.cloned().unwrap_or_default(),
            in_place,
        }
    }
}

/// A value written back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    #[serde(flatten)]
    pub arg: Argument,
}

impl Output {
    pub fn new(base: &Argument) -> Self {
        Self { arg: base.clone() }
    }
}

/// An output that is passed in by mutable reference and read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefInput {
    #[serde(flatten)]
    pub arg: Argument,
    /// Ident of the argument this one aliases. Resolved against the
    /// enclosing option; never owned.
    pub ref_arg: Ident,
}

impl RefInput {
    pub fn new(base: &Argument, ref_arg: impl Into<Ident>) -> Self {
        Self {
            arg: base.clone(),
            ref_arg: ref_arg.into(),
        }
    }
}

/// An output the wrapper allocates itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(flatten)]
    pub arg: Argument,
}

impl Allocation {
    pub fn new(base: &Argument) -> Self {
        Self { arg: base.clone() }
    }
}

/// A compile-time constant passed to the native call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub ident: Ident,
    pub cv_type: String,
    pub value: String,
}

impl Constant {
    pub fn new(
        ident: impl Into<Ident>,
        cv_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            ident: ident.into(),
            cv_type: cv_type.into(),
            value: value.into(),
        }
    }
}

/// A configurable operator parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(flatten)]
    pub arg: Argument,
    #[serde(default)]
    pub in_place: bool,
    /// Must be set before the operator is initialized.
    #[serde(default)]
    pub is_init: bool,
    /// Literal initial value.
    #[serde(default)]
    pub default: Option<String>,
    /// Checks emitted into the setter, in order.
    #[serde(default)]
    pub rules: Vec<ParameterRule>,
}

impl Parameter {
    pub fn new(
        ident: impl Into<Ident>,
        name: impl Into<String>,
        cv_type: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self::from_arg(Argument::new(ident, name, cv_type, data_type))
    }

    pub fn from_arg(arg: Argument) -> Self {
        Self {
            arg,
            in_place: false,
            is_init: false,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_rule(mut self, rule: ParameterRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn init(mut self) -> Self {
        self.is_init = true;
        self
    }

    pub fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }

    /// Let every rule append its check to `sink`, in list order.
    pub fn check_rules(&self, sink: &mut dyn Sink) {
        for rule in &self.rules {
            rule.check(self, sink);
        }
    }
}

/// A parameter with optional numeric bounds. Bounds are kept as literals
/// and rendered verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericParameter {
    #[serde(flatten)]
    pub param: Parameter,
    #[serde(default)]
    pub min_value: Option<String>,
    #[serde(default)]
    pub max_value: Option<String>,
    #[serde(default)]
    pub step: Option<String>,
}

impl NumericParameter {
    pub fn new(param: Parameter) -> Self {
        Self {
            param,
            min_value: None,
            max_value: None,
            step: None,
        }
    }

    pub fn with_bounds(mut self, min: impl Into<String>, max: impl Into<String>) -> Self {
        self.min_value = Some(min.into());
        self.max_value = Some(max.into());
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// One selectable value of an [`EnumParameter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDescription {
    pub ident: Ident,
    pub name: String,
    /// Fully qualified native identifier, e.g. `cv::THRESH_BINARY`.
    pub cv_ident: String,
}

impl EnumDescription {
    /// Without an explicit native identifier, `ident` is placed in the
    /// native namespace.
    pub fn new(ident: impl Into<Ident>, name: impl Into<String>, cv_ident: Option<String>) -> Self {
        let ident = ident.into();
        let cv_ident = cv_ident.unwrap_or_else(|| format!("{NATIVE_NAMESPACE}::{ident}"));
        Self {
            ident,
            name: name.into(),
            cv_ident,
        }
    }
}

impl<'de> Deserialize<'de> for EnumDescription {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            ident: Ident,
            #[serde(default)]
            name: String,
            #[serde(default)]
            cv_ident: Option<String>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(EnumDescription::new(raw.ident, raw.name, raw.cv_ident))
    }
}

/// A parameter choosing one of a fixed set of native constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumParameter {
    #[serde(flatten)]
    pub param: Parameter,
    pub descriptions: Vec<EnumDescription>,
}

impl EnumParameter {
    /// Native and wrapper types are fixed to [`ENUM_NATIVE_TYPE`] and
    /// [`ENUM_WRAPPER_TYPE`].
    pub fn new(ident: impl Into<Ident>, name: impl Into<String>) -> Self {
        Self {
            param: Parameter::new(ident, name, ENUM_NATIVE_TYPE, ENUM_WRAPPER_TYPE),
            descriptions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: EnumDescription) -> Self {
        self.descriptions.push(description);
        self
    }
}

impl<'de> Deserialize<'de> for EnumParameter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            ident: Ident,
            #[serde(default)]
            name: String,
            #[serde(default)]
            description: String,
            #[serde(default)]
            init_in: Vec<String>,
            #[serde(default)]
            init_out: Vec<String>,
            #[serde(default)]
            in_place: bool,
            #[serde(default)]
            is_init: bool,
            #[serde(default)]
            default: Option<String>,
            #[serde(default)]
            rules: Vec<ParameterRule>,
            #[serde(default)]
            descriptions: Vec<EnumDescription>,
        }
        let raw = Raw::deserialize(deserializer)?;
        let mut enum_param = EnumParameter::new(raw.ident, raw.name);
        enum_param.param.arg.description = raw.description;
        enum_param.param.arg.init_in = raw.init_in;
        enum_param.param.arg.init_out = raw.init_out;
        enum_param.param.in_place = raw.in_place;
        enum_param.param.is_init = raw.is_init;
        enum_param.param.default = raw.default;
        enum_param.param.rules = raw.rules;
        enum_param.descriptions = raw.descriptions;
        Ok(enum_param)
    }
}

/// Every argument kind the generator knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgNode {
    Input(Input),
    Output(Output),
    RefInput(RefInput),
    Allocation(Allocation),
    Constant(Constant),
    Parameter(Parameter),
    NumericParameter(NumericParameter),
    EnumParameter(EnumParameter),
}

impl ArgNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            ArgNode::Input(_) => NodeKind::Input,
            ArgNode::Output(_) => NodeKind::Output,
            ArgNode::RefInput(_) => NodeKind::RefInput,
            ArgNode::Allocation(_) => NodeKind::Allocation,
            ArgNode::Constant(_) => NodeKind::Constant,
            ArgNode::Parameter(_) => NodeKind::Parameter,
            ArgNode::NumericParameter(_) => NodeKind::NumericParameter,
            ArgNode::EnumParameter(_) => NodeKind::EnumParameter,
        }
    }

    pub fn ident(&self) -> &Ident {
        match self {
            ArgNode::Input(i) => &i.arg.ident,
            ArgNode::Output(o) => &o.arg.ident,
            ArgNode::RefInput(r) => &r.arg.ident,
            ArgNode::Allocation(a) => &a.arg.ident,
            ArgNode::Constant(c) => &c.ident,
            ArgNode::Parameter(p) => &p.arg.ident,
            ArgNode::NumericParameter(n) => &n.param.arg.ident,
            ArgNode::EnumParameter(e) => &e.param.arg.ident,
        }
    }

    /// Shared argument fields. Constants have none.
    pub fn argument(&self) -> Option<&Argument> {
        match self {
            ArgNode::Input(i) => Some(&i.arg),
            ArgNode::Output(o) => Some(&o.arg),
            ArgNode::RefInput(r) => Some(&r.arg),
            ArgNode::Allocation(a) => Some(&a.arg),
            ArgNode::Constant(_) => None,
            ArgNode::Parameter(p) => Some(&p.arg),
            ArgNode::NumericParameter(n) => Some(&n.param.arg),
            ArgNode::EnumParameter(e) => Some(&e.param.arg),
        }
    }

    /// The parameter part of any parameter kind.
    pub fn parameter(&self) -> Option<&Parameter> {
        match self {
            ArgNode::Parameter(p) => Some(p),
            ArgNode::NumericParameter(n) => Some(&n.param),
            ArgNode::EnumParameter(e) => Some(&e.param),
            _ => None,
        }
    }

    /// Native type of the node.
    pub fn cv_type(&self) -> &str {
        match self {
            ArgNode::Constant(c) => &c.cv_type,
            other => other.argument().map_or("", |a| a.cv_type.as_str()),
        }
    }
}

macro_rules! impl_from_kind {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for ArgNode {
                fn from(node: $ty) -> Self {
                    ArgNode::$ty(node)
                }
            }
        )*
    };
}

impl_from_kind!(
    Input,
    Output,
    RefInput,
    Allocation,
    Constant,
    Parameter,
    NumericParameter,
    EnumParameter,
);
