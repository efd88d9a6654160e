//! `getParameter` / `setParameter` bodies.

use bindforge_core::emit::{Document, Sink};
use bindforge_core::error::CoreError;
use bindforge_core::ir::{EnumParameter, NumericParameter, Parameter};
use bindforge_core::pipeline::EmitConfig;
use bindforge_core::visit::Visitor;

/// Emits one `case` of the `setParameter` switch per visited parameter.
///
/// Only parameter kinds are ever routed here.
pub(crate) struct SetParameterCases<'a> {
    pub doc: &'a mut Document,
    pub config: &'a EmitConfig,
}

impl SetParameterCases<'_> {
    /// `check` is the kind-specific range/enum check, if any; the rule chain
    /// always follows it.
    fn case(&mut self, parameter: &Parameter, check: Option<&str>) {
        let ident = &parameter.arg.ident;
        let data_type = self.config.runtime(&parameter.arg.data_type);
        let config = self.config;

        self.doc.line(&format!("case {}:", ident.constant()));
        self.doc.increase_indent();
        self.doc.scope(|doc| {
            doc.line(&format!(
                "const {data_type} & castedValue = {}<{data_type}>(value);",
                config.runtime("data_cast")
            ));
            if let Some(check) = check {
                doc.line(&format!(
                    "{check}(castedValue, {}Parameter, *this);",
                    ident.attribute()
                ));
            }
            parameter.check_rules(doc);
            doc.line(&format!("{} = castedValue;", ident.attribute()));
        });
        self.doc.line("break;");
        self.doc.decrease_indent();
    }
}

impl Visitor for SetParameterCases<'_> {
    fn visit_parameter(&mut self, parameter: &Parameter) -> Result<(), CoreError> {
        let check = (parameter.arg.data_type == "Matrix").then_some("checkMatrixValue");
        self.case(parameter, check);
        Ok(())
    }

    fn visit_numeric_parameter(&mut self, parameter: &NumericParameter) -> Result<(), CoreError> {
        self.case(&parameter.param, Some("checkNumericValue"));
        Ok(())
    }

    fn visit_enum_parameter(&mut self, parameter: &EnumParameter) -> Result<(), CoreError> {
        self.case(&parameter.param, Some("checkEnumValue"));
        Ok(())
    }
}
