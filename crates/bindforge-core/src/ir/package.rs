use serde::{Deserialize, Deserializer, Serialize};

use super::argument::{ArgNode, RefInput};
use super::compound::Compound;
use super::ident::Ident;

/// Semantic version of a generated package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Root of an IR tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub ident: Ident,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: Version,
    #[serde(default)]
    pub methods: Vec<Method>,
}

impl Package {
    pub fn new(ident: impl Into<Ident>, major: u32, minor: u32, patch: u32) -> Self {
        Self {
            ident: ident.into(),
            name: String::new(),
            description: String::new(),
            version: Version {
                major,
                minor,
                patch,
            },
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }
}

/// A native function family wrapped as one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub ident: Ident,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub doc: String,
    /// Overload variants. Carried through untouched for the templates.
    #[serde(default)]
    pub functions: Vec<serde_json::Value>,
    #[serde(default)]
    pub options: Vec<OptionDef>,
}

impl Method {
    pub fn new(ident: impl Into<Ident>) -> Self {
        Self {
            ident: ident.into(),
            name: String::new(),
            doc: String::new(),
            functions: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_option(mut self, option: OptionDef) -> Self {
        self.options.push(option);
        self
    }
}

/// One way of calling a method (e.g. in-place vs. allocating).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDef {
    pub ident: Ident,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Vec<OptionArg>,
}

impl OptionDef {
    pub fn new(ident: impl Into<Ident>, name: impl Into<String>, args: Vec<OptionArg>) -> Self {
        Self {
            ident: ident.into(),
            name: name.into(),
            args,
        }
    }

    /// All argument nodes in order, with compound constituents inlined right
    /// after their position.
    pub fn arguments(&self) -> impl Iterator<Item = &ArgNode> {
        self.args.iter().flat_map(|item| match item {
            OptionArg::Arg(arg) => std::slice::from_ref(arg).iter(),
            OptionArg::Compound(compound) => compound.args.iter(),
        })
    }

    pub fn find_arg(&self, ident: &Ident) -> Option<&ArgNode> {
        self.arguments().find(|arg| arg.ident() == ident)
    }

    /// The node a [`RefInput`] aliases, looked up by ident among the other
    /// arguments of this option.
    pub fn resolve_ref(&self, ref_input: &RefInput) -> Option<&ArgNode> {
        self.arguments().find(|arg| {
            arg.ident() == &ref_input.ref_arg && !matches!(arg, ArgNode::RefInput(r) if r == ref_input)
        })
    }
}

/// An element of [`OptionDef::args`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionArg {
    Arg(ArgNode),
    Compound(Compound),
}

impl OptionArg {
    pub fn as_arg(&self) -> Option<&ArgNode> {
        match self {
            OptionArg::Arg(arg) => Some(arg),
            OptionArg::Compound(_) => None,
        }
    }
}

impl From<ArgNode> for OptionArg {
    fn from(node: ArgNode) -> Self {
        OptionArg::Arg(node)
    }
}

macro_rules! impl_option_arg_from {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<super::argument::$ty> for OptionArg {
                fn from(node: super::argument::$ty) -> Self {
                    OptionArg::Arg(node.into())
                }
            }
        )*
    };
}

impl_option_arg_from!(
    Input,
    Output,
    RefInput,
    Allocation,
    Constant,
    Parameter,
    NumericParameter,
    EnumParameter,
);

impl From<Compound> for OptionArg {
    fn from(compound: Compound) -> Self {
        OptionArg::Compound(compound)
    }
}

/// Items carrying a `"compound"` key are compounds; everything else must be
/// a `"kind"`-tagged argument node.
impl<'de> Deserialize<'de> for OptionArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("compound").is_some() {
            Compound::deserialize(value)
                .map(OptionArg::Compound)
                .map_err(D::Error::custom)
        } else {
            ArgNode::deserialize(value)
                .map(OptionArg::Arg)
                .map_err(D::Error::custom)
        }
    }
}
