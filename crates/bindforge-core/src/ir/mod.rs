pub mod argument;
pub mod compound;
pub mod ident;
pub mod package;
pub mod rule;
pub mod validate;

pub use argument::{
    Allocation, ArgNode, Argument, Constant, EnumDescription, EnumParameter, Input,
    NumericParameter, Output, Parameter, RefInput,
};
pub use compound::{Compound, CompoundKind};
pub use ident::Ident;
pub use package::{Method, OptionArg, OptionDef, Package, Version};
pub use rule::{CustomRule, ParameterRule};
pub use validate::validate_package;
