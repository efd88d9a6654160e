use serde::{Deserialize, Serialize};

use super::argument::ArgNode;
use crate::pipeline::EmitConfig;

/// How a [`Compound`] combines its constituents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "compound", rename_all = "snake_case")]
pub enum CompoundKind {
    /// A native 2-D size built from an x and a y argument.
    Size,
    /// Any other native constructor taking the constituents in order.
    Call { constructor: String },
}

/// A native value built from the data expressions of several arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    #[serde(flatten)]
    pub kind: CompoundKind,
    pub args: Vec<ArgNode>,
}

impl Compound {
    pub fn size(x: impl Into<ArgNode>, y: impl Into<ArgNode>) -> Self {
        Self {
            kind: CompoundKind::Size,
            args: vec![x.into(), y.into()],
        }
    }

    pub fn call(constructor: impl Into<String>, args: Vec<ArgNode>) -> Self {
        Self {
            kind: CompoundKind::Call {
                constructor: constructor.into(),
            },
            args,
        }
    }

    /// Expression under the default preset, e.g. `cv::Size(wCvData, hCvData)`.
    pub fn create(&self) -> String {
        self.create_with(&EmitConfig::default())
    }

    pub fn create_with(&self, config: &EmitConfig) -> String {
        let constructor = match &self.kind {
            CompoundKind::Size => config.size_type.as_str(),
            CompoundKind::Call { constructor } => constructor.as_str(),
        };
        let parts: Vec<String> = self
            .args
            .iter()
            .map(|arg| config.data_expr(arg.ident()))
            .collect();
        format!("{constructor}({})", parts.join(", "))
    }

    /// Display label used in diagnostics, e.g. `size(w, h)`.
    pub fn label(&self) -> String {
        let head = match &self.kind {
            CompoundKind::Size => "size",
            CompoundKind::Call { constructor } => constructor.as_str(),
        };
        let idents: Vec<&str> = self.args.iter().map(|a| a.ident().as_str()).collect();
        format!("{head}({})", idents.join(", "))
    }
}
