//! Collects the data ids and parameters of a method.

use bindforge_core::error::CoreError;
use bindforge_core::ir::{
    Allocation, ArgNode, Compound, Constant, EnumDescription, EnumParameter, Ident, Input, Method,
    NumericParameter, Output, Parameter, RefInput,
};
use bindforge_core::visit::{walk_method, Visitor};

/// Ident of the implicit parameter selecting the option of a multi-option
/// method.
pub(crate) const DATA_FLOW: &str = "dataFlow";

/// Every distinct data id of a method, in first-seen order, plus the
/// parameter nodes among them.
#[derive(Debug, Default)]
pub(crate) struct DataIds {
    pub ids: Vec<Ident>,
    pub parameters: Vec<ArgNode>,
}

impl DataIds {
    pub fn collect(method: &Method) -> Result<Self, CoreError> {
        let mut ids = DataIds::default();
        walk_method(method, &mut ids)?;

        if method.options.len() > 1 {
            let ident = Ident::new(DATA_FLOW);
            if ids.ids.contains(&ident) {
                return Err(CoreError::Emit {
                    message: format!(
                        "method `{}` declares `{DATA_FLOW}`, which is reserved for option selection",
                        method.ident
                    ),
                });
            }
            let mut data_flow = EnumParameter::new(DATA_FLOW, "Data flow");
            data_flow.param.is_init = true;
            for option in &method.options {
                data_flow.descriptions.push(EnumDescription::new(
                    option.ident.clone(),
                    option.name.clone(),
                    Some(option.ident.constant()),
                ));
            }
            ids.add_parameter(data_flow.into());
        }
        Ok(ids)
    }

    pub fn has_data_flow(&self) -> bool {
        self.ids.iter().any(|id| id.as_str() == DATA_FLOW)
    }

    /// Returns `true` if `ident` was not seen before.
    fn add(&mut self, ident: &Ident) -> bool {
        if self.ids.contains(ident) {
            return false;
        }
        self.ids.push(ident.clone());
        true
    }

    fn add_parameter(&mut self, node: ArgNode) {
        if self.add(node.ident()) {
            self.parameters.push(node);
        }
    }
}

impl Visitor for DataIds {
    fn visit_input(&mut self, input: &Input) -> Result<(), CoreError> {
        self.add(&input.arg.ident);
        Ok(())
    }

    fn visit_output(&mut self, output: &Output) -> Result<(), CoreError> {
        self.add(&output.arg.ident);
        Ok(())
    }

    fn visit_ref_input(&mut self, ref_input: &RefInput) -> Result<(), CoreError> {
        self.add(&ref_input.arg.ident);
        Ok(())
    }

    fn visit_allocation(&mut self, allocation: &Allocation) -> Result<(), CoreError> {
        self.add(&allocation.arg.ident);
        Ok(())
    }

    /// Constants are inlined; they get no id.
    fn visit_constant(&mut self, _constant: &Constant) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Result<(), CoreError> {
        self.add_parameter(parameter.clone().into());
        Ok(())
    }

    fn visit_numeric_parameter(&mut self, parameter: &NumericParameter) -> Result<(), CoreError> {
        self.add_parameter(parameter.clone().into());
        Ok(())
    }

    fn visit_enum_parameter(&mut self, parameter: &EnumParameter) -> Result<(), CoreError> {
        self.add_parameter(parameter.clone().into());
        Ok(())
    }

    /// Constituents are visited on their own right after the compound.
    fn visit_compound(&mut self, _compound: &Compound) -> Result<(), CoreError> {
        Ok(())
    }
}
