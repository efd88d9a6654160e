//! Double-dispatch emission protocol.
//!
//! [`Accept::accept`] routes a node to the single [`Visitor`] handler for its
//! concrete kind. [`walk_package`] drives a visitor over a whole tree in
//! insertion order.

use std::fmt;

use tracing::debug;

use crate::error::CoreError;
use crate::ir::{
    Allocation, ArgNode, Compound, Constant, EnumParameter, Input, Method,
    NumericParameter, OptionArg, OptionDef, Output, Package, Parameter, RefInput,
};

/// Concrete kind of an IR node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Package,
    Method,
    Option,
    Input,
    Output,
    RefInput,
    Allocation,
    Constant,
    Parameter,
    NumericParameter,
    EnumParameter,
    Compound,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Package => "package",
            NodeKind::Method => "method",
            NodeKind::Option => "option",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::RefInput => "ref-input",
            NodeKind::Allocation => "allocation",
            NodeKind::Constant => "constant",
            NodeKind::Parameter => "parameter",
            NodeKind::NumericParameter => "numeric-parameter",
            NodeKind::EnumParameter => "enum-parameter",
            NodeKind::Compound => "compound",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unhandled(kind: NodeKind, ident: impl fmt::Display) -> CoreError {
    CoreError::UnhandledNode {
        kind,
        ident: ident.to_string(),
    }
}

/// One handler per node kind.
///
/// Container handlers (`visit_package`, `visit_method`, `visit_option`)
/// default to doing nothing. Every argument-kind handler and
/// `visit_compound` default to [`CoreError::UnhandledNode`]: a visitor that
/// is handed a kind it never implemented aborts the run instead of silently
/// dropping output.
pub trait Visitor {
    fn visit_package(&mut self, _package: &Package) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_method(&mut self, _method: &Method) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_option(&mut self, _option: &OptionDef) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_input(&mut self, input: &Input) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::Input, &input.arg.ident))
    }

    fn visit_output(&mut self, output: &Output) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::Output, &output.arg.ident))
    }

    fn visit_ref_input(&mut self, ref_input: &RefInput) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::RefInput, &ref_input.arg.ident))
    }

    fn visit_allocation(&mut self, allocation: &Allocation) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::Allocation, &allocation.arg.ident))
    }

    fn visit_constant(&mut self, constant: &Constant) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::Constant, &constant.ident))
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::Parameter, &parameter.arg.ident))
    }

    fn visit_numeric_parameter(&mut self, parameter: &NumericParameter) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::NumericParameter, &parameter.param.arg.ident))
    }

    fn visit_enum_parameter(&mut self, parameter: &EnumParameter) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::EnumParameter, &parameter.param.arg.ident))
    }

    fn visit_compound(&mut self, compound: &Compound) -> Result<(), CoreError> {
        Err(unhandled(NodeKind::Compound, compound.label()))
    }
}

/// A node that knows which [`Visitor`] handler it belongs to.
pub trait Accept {
    fn accept(&self, visitor: &mut dyn Visitor) -> Result<(), CoreError>;
}

macro_rules! impl_accept {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Accept for $ty {
                fn accept(&self, visitor: &mut dyn Visitor) -> Result<(), CoreError> {
                    visitor.$method(self)
                }
            }
        )*
    };
}

impl_accept!(
    Input => visit_input,
    Output => visit_output,
    RefInput => visit_ref_input,
    Allocation => visit_allocation,
    Constant => visit_constant,
    Parameter => visit_parameter,
    NumericParameter => visit_numeric_parameter,
    EnumParameter => visit_enum_parameter,
    Compound => visit_compound,
);

impl Accept for ArgNode {
    fn accept(&self, visitor: &mut dyn Visitor) -> Result<(), CoreError> {
        match self {
            ArgNode::Input(n) => n.accept(visitor),
            ArgNode::Output(n) => n.accept(visitor),
            ArgNode::RefInput(n) => n.accept(visitor),
            ArgNode::Allocation(n) => n.accept(visitor),
            ArgNode::Constant(n) => n.accept(visitor),
            ArgNode::Parameter(n) => n.accept(visitor),
            ArgNode::NumericParameter(n) => n.accept(visitor),
            ArgNode::EnumParameter(n) => n.accept(visitor),
        }
    }
}

/// Dispatches the item itself only; compound constituents are not visited.
impl Accept for OptionArg {
    fn accept(&self, visitor: &mut dyn Visitor) -> Result<(), CoreError> {
        match self {
            OptionArg::Arg(arg) => arg.accept(visitor),
            OptionArg::Compound(compound) => compound.accept(visitor),
        }
    }
}

/// Visit `package`, then every method in order.
///
/// Stops at the first error; nothing after the failing node is visited.
pub fn walk_package(package: &Package, visitor: &mut dyn Visitor) -> Result<(), CoreError> {
    debug!(package = %package.ident, methods = package.methods.len(), "walking package");
    visitor.visit_package(package)?;
    for method in &package.methods {
        walk_method(method, visitor)?;
    }
    Ok(())
}

/// Visit `method`, then every option in order.
pub fn walk_method(method: &Method, visitor: &mut dyn Visitor) -> Result<(), CoreError> {
    debug!(method = %method.ident, options = method.options.len(), "walking method");
    visitor.visit_method(method)?;
    for option in &method.options {
        walk_option(option, visitor)?;
    }
    Ok(())
}

/// Visit `option`, then each item in order. A compound is visited first and
/// its constituents right after it.
pub fn walk_option(option: &OptionDef, visitor: &mut dyn Visitor) -> Result<(), CoreError> {
    visitor.visit_option(option)?;
    for item in &option.args {
        item.accept(visitor)?;
        if let OptionArg::Compound(compound) = item {
            for arg in &compound.args {
                arg.accept(visitor)?;
            }
        }
    }
    Ok(())
}
