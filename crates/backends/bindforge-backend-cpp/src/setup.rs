//! Constructor, `setup*` functions and `initialize`: how the kernel
//! describes its parameters, inputs and outputs to the runtime.

use bindforge_core::emit::{Document, Sink};
use bindforge_core::error::CoreError;
use bindforge_core::ir::{
    Allocation, ArgNode, Argument, Compound, Constant, EnumParameter, Input, Method,
    NumericParameter, OptionDef, Output, Parameter, RefInput,
};
use bindforge_core::pipeline::EmitConfig;
use bindforge_core::visit::{walk_option, Accept, Visitor};

use crate::ids::{DataIds, DATA_FLOW};

/// Runtime data variant for a wrapper type: `UInt32` → `UINT_32`.
fn variant(data_type: &str) -> String {
    let mut out = String::with_capacity(data_type.len() + 4);
    let mut prev: Option<char> = None;
    for c in data_type.chars() {
        if let Some(p) = prev {
            let boundary = (c.is_ascii_digit() && p.is_ascii_alphabetic())
                || (c.is_ascii_uppercase() && p.is_ascii_lowercase());
            if boundary {
                out.push('_');
            }
        }
        out.push(c.to_ascii_uppercase());
        prev = Some(c);
    }
    out
}

/// Quoted title: the display name, or the ident when there is none.
fn title(arg: &Argument) -> String {
    let text = if arg.name.is_empty() {
        arg.ident.as_str()
    } else {
        arg.name.as_str()
    };
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Initial member value. Enum defaults name a description and become its
/// index.
fn initial_value(node: &ArgNode) -> String {
    let Some(param) = node.parameter() else {
        return String::new();
    };
    let Some(default) = param.default.as_deref() else {
        return String::new();
    };
    if let ArgNode::EnumParameter(e) = node {
        if let Some(index) = e.descriptions.iter().position(|d| d.ident.as_str() == default) {
            return index.to_string();
        }
    }
    default.to_string()
}

pub(crate) fn emit_constructor(class: &str, ids: &DataIds, config: &EmitConfig, doc: &mut Document) {
    doc.line(&format!("{class}::{class}()"));
    let kernel = format!(
        "  : {}(TYPE, PACKAGE, VERSION, setupInitParameters())",
        config.runtime("OperatorKernel")
    );
    if ids.parameters.is_empty() {
        doc.line(&kernel);
    } else {
        doc.line(&format!("{kernel},"));
        let last = ids.parameters.len() - 1;
        for (i, node) in ids.parameters.iter().enumerate() {
            let separator = if i < last { "," } else { "" };
            doc.line(&format!(
                "    {}({}){separator}",
                node.ident().attribute(),
                initial_value(node)
            ));
        }
    }
    doc.scope(|_| {});
}

/// Runs `body` for the single option inline, or for each option inside a
/// `switch` on the data flow when there are several.
pub(crate) fn for_each_option(
    method: &Method,
    ids: &DataIds,
    doc: &mut Document,
    mut body: impl FnMut(&OptionDef, &mut Document) -> Result<(), CoreError>,
) -> Result<(), CoreError> {
    if !ids.has_data_flow() {
        return match method.options.first() {
            Some(option) => body(option, doc),
            None => Ok(()),
        };
    }

    doc.line(&format!("switch(int(m_{DATA_FLOW}))"));
    doc.line("{");
    for option in &method.options {
        doc.line(&format!("case({}):", option.ident.constant()));
        doc.increase_indent();
        doc.scope(|doc| body(option, doc))?;
        doc.line("break;");
        doc.decrease_indent();
    }
    doc.line("}");
    Ok(())
}

/// Writes the runtime description of each parameter whose `is_init` flag
/// matches `init`. Other kinds are skipped.
struct ParameterSetup<'a> {
    doc: &'a mut Document,
    config: &'a EmitConfig,
    init: bool,
}

impl ParameterSetup<'_> {
    /// `new` expression, access mode and title.
    fn open(&mut self, parameter: &Parameter, new: &str) -> String {
        let var = format!("{}Parameter", parameter.arg.ident.attribute());
        let access = if parameter.is_init {
            "NONE_WRITE"
        } else {
            "ACTIVATED_WRITE"
        };
        self.doc.line(&format!("{var} = new {new};"));
        self.doc.line(&format!(
            "{var}->setAccessMode({}::{access});",
            self.config.runtime("Parameter")
        ));
        self.doc.line(&format!("{var}->setTitle({});", title(&parameter.arg)));
        var
    }

    fn close(&mut self, var: &str) {
        self.doc.line(&format!("parameters.push_back({var});"));
        self.doc.blank();
    }

    fn constant(parameter: &Parameter) -> String {
        parameter.arg.ident.constant()
    }
}

impl Visitor for ParameterSetup<'_> {
    fn visit_input(&mut self, _input: &Input) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_output(&mut self, _output: &Output) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_ref_input(&mut self, _ref_input: &RefInput) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_allocation(&mut self, _allocation: &Allocation) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_constant(&mut self, _constant: &Constant) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_compound(&mut self, _compound: &Compound) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Result<(), CoreError> {
        if parameter.is_init != self.init {
            return Ok(());
        }
        let class = if parameter.arg.data_type == "Matrix" {
            "MatrixParameter"
        } else {
            "Parameter"
        };
        let new = format!(
            "{}({}, {}::{})",
            self.config.runtime(class),
            Self::constant(parameter),
            self.config.runtime("DataVariant"),
            variant(&parameter.arg.data_type)
        );
        let var = self.open(parameter, &new);
        self.close(&var);
        Ok(())
    }

    fn visit_numeric_parameter(&mut self, numeric: &NumericParameter) -> Result<(), CoreError> {
        let parameter = &numeric.param;
        if parameter.is_init != self.init {
            return Ok(());
        }
        let data_type = self.config.runtime(&parameter.arg.data_type);
        let new = format!(
            "{}<{data_type}>({})",
            self.config.runtime("NumericParameter"),
            Self::constant(parameter)
        );
        let var = self.open(parameter, &new);
        let limits = [
            ("setMin", &numeric.min_value),
            ("setMax", &numeric.max_value),
            ("setStep", &numeric.step),
        ];
        for (setter, value) in limits {
            if let Some(value) = value {
                self.doc.line(&format!("{var}->{setter}({data_type}({value}));"));
            }
        }
        self.close(&var);
        Ok(())
    }

    fn visit_enum_parameter(&mut self, enum_param: &EnumParameter) -> Result<(), CoreError> {
        let parameter = &enum_param.param;
        if parameter.is_init != self.init {
            return Ok(());
        }
        let new = format!(
            "{}({})",
            self.config.runtime("EnumParameter"),
            Self::constant(parameter)
        );
        let var = self.open(parameter, &new);
        // The data flow enumerates option ids; other enums are indexed in
        // description order, matching their converter.
        let data_flow = parameter.arg.ident.as_str() == DATA_FLOW;
        for (index, description) in enum_param.descriptions.iter().enumerate() {
            let value = if data_flow {
                description.ident.constant()
            } else {
                index.to_string()
            };
            let name = if description.name.is_empty() {
                description.ident.as_str()
            } else {
                description.name.as_str()
            };
            self.doc.line(&format!(
                "{var}->add({}({}({value}), \"{}\"));",
                self.config.runtime("EnumDescription"),
                self.config.runtime("Enum"),
                name.replace('"', "\\\"")
            ));
        }
        self.close(&var);
        Ok(())
    }
}

fn emit_vector_function(
    class: &str,
    function: &str,
    element: &str,
    list: &str,
    config: &EmitConfig,
    doc: &mut Document,
    body: impl FnOnce(&mut Document) -> Result<(), CoreError>,
) -> Result<(), CoreError> {
    let vector = format!("std::vector<const {}*>", config.runtime(element));
    doc.line(&format!("const {vector} {class}::{function}()"));
    doc.scope(|doc| -> Result<(), CoreError> {
        doc.line(&format!("{vector} {list};"));
        doc.blank();
        body(doc)?;
        doc.line(&format!("return {list};"));
        Ok(())
    })
}

/// Parameters that must be set before initialization, including the data
/// flow of a multi-option method.
pub(crate) fn emit_setup_init_parameters(
    class: &str,
    ids: &DataIds,
    config: &EmitConfig,
    doc: &mut Document,
) -> Result<(), CoreError> {
    emit_vector_function(class, "setupInitParameters", "Parameter", "parameters", config, doc, |doc| {
        let mut setup = ParameterSetup {
            doc,
            config,
            init: true,
        };
        for node in &ids.parameters {
            node.accept(&mut setup)?;
        }
        Ok(())
    })
}

/// Parameters available once the operator is initialized, per option.
pub(crate) fn emit_setup_parameters(
    method: &Method,
    ids: &DataIds,
    class: &str,
    config: &EmitConfig,
    doc: &mut Document,
) -> Result<(), CoreError> {
    emit_vector_function(class, "setupParameters", "Parameter", "parameters", config, doc, |doc| {
        for_each_option(method, ids, doc, |option, doc| {
            walk_option(
                option,
                &mut ParameterSetup {
                    doc,
                    config,
                    init: false,
                },
            )
        })?;
        if ids.has_data_flow() {
            doc.blank();
        }
        Ok(())
    })
}

/// Which side of the operator a [`DescriptionSetup`] lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Connector {
    Inputs,
    Outputs,
}

/// Writes one runtime description per connector on the chosen side. A
/// [`RefInput`] is both an input and an output.
struct DescriptionSetup<'a> {
    doc: &'a mut Document,
    config: &'a EmitConfig,
    side: Connector,
}

impl DescriptionSetup<'_> {
    fn describe(&mut self, arg: &Argument, side: Connector) {
        if side != self.side {
            return;
        }
        let ident = &arg.ident;
        let description = self.config.runtime("Description");
        self.doc.line(&format!(
            "{description}* {ident} = new {description}({}, {}::{});",
            ident.constant(),
            self.config.runtime("DataVariant"),
            variant(&arg.data_type)
        ));
        self.doc.line(&format!("{ident}->setTitle({});", title(arg)));
        let list = match self.side {
            Connector::Inputs => "inputs",
            Connector::Outputs => "outputs",
        };
        self.doc.line(&format!("{list}.push_back({ident});"));
        self.doc.blank();
    }
}

impl Visitor for DescriptionSetup<'_> {
    fn visit_input(&mut self, input: &Input) -> Result<(), CoreError> {
        self.describe(&input.arg, Connector::Inputs);
        Ok(())
    }

    fn visit_output(&mut self, output: &Output) -> Result<(), CoreError> {
        self.describe(&output.arg, Connector::Outputs);
        Ok(())
    }

    fn visit_ref_input(&mut self, ref_input: &RefInput) -> Result<(), CoreError> {
        self.describe(&ref_input.arg, Connector::Inputs);
        self.describe(&ref_input.arg, Connector::Outputs);
        Ok(())
    }

    fn visit_allocation(&mut self, allocation: &Allocation) -> Result<(), CoreError> {
        self.describe(&allocation.arg, Connector::Outputs);
        Ok(())
    }

    fn visit_constant(&mut self, _constant: &Constant) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_parameter(&mut self, _parameter: &Parameter) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_numeric_parameter(&mut self, _parameter: &NumericParameter) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_enum_parameter(&mut self, _parameter: &EnumParameter) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_compound(&mut self, _compound: &Compound) -> Result<(), CoreError> {
        Ok(())
    }
}

pub(crate) fn emit_setup_connectors(
    method: &Method,
    ids: &DataIds,
    class: &str,
    side: Connector,
    config: &EmitConfig,
    doc: &mut Document,
) -> Result<(), CoreError> {
    let (function, list) = match side {
        Connector::Inputs => ("setupInputs", "inputs"),
        Connector::Outputs => ("setupOutputs", "outputs"),
    };
    emit_vector_function(class, function, "Description", list, config, doc, |doc| {
        for_each_option(method, ids, doc, |option, doc| {
            walk_option(option, &mut DescriptionSetup { doc, config, side })
        })?;
        if ids.has_data_flow() {
            doc.blank();
        }
        Ok(())
    })
}

pub(crate) fn emit_initialize(class: &str, config: &EmitConfig, doc: &mut Document) {
    doc.line(&format!("void {class}::initialize()"));
    doc.scope(|doc| {
        doc.line(&format!(
            "{}::initialize(setupInputs(), setupOutputs(), setupParameters());",
            config.runtime("OperatorKernel")
        ));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindforge_core::ir::{EnumDescription, ParameterRule};

    fn image(ident: &str, name: &str) -> Argument {
        Argument::new(ident, name, "cv::Mat", "Image")
    }

    fn single(args: Vec<bindforge_core::ir::OptionArg>) -> Method {
        Method::new("blur").with_option(OptionDef::new("allocate", "Allocate", args))
    }

    fn two_options() -> Method {
        let manual = OptionDef::new(
            "manual",
            "Manual",
            vec![
                Input::new(Some(&image("src", "Source")), false).into(),
                RefInput::new(&image("dst", "Destination"), "src").into(),
            ],
        );
        let allocate = OptionDef::new(
            "allocate",
            "Allocate",
            vec![
                Input::new(Some(&image("src", "Source")), false).into(),
                Allocation::new(&image("dst", "Destination")).into(),
            ],
        );
        Method::new("blur").with_option(manual).with_option(allocate)
    }

    fn render(f: impl FnOnce(&mut Document) -> Result<(), CoreError>) -> String {
        let mut doc = Document::new(4);
        f(&mut doc).unwrap();
        doc.into_string()
    }

    #[test]
    fn variant_names() {
        assert_eq!(variant("Image"), "IMAGE");
        assert_eq!(variant("UInt32"), "UINT_32");
        assert_eq!(variant("Float64"), "FLOAT_64");
        assert_eq!(variant("Matrix"), "MATRIX");
    }

    #[test]
    fn constructor_initialises_members_with_defaults() {
        let mut border = EnumParameter::new("borderMode", "Border mode")
            .with_description(EnumDescription::new("BORDER_CONSTANT", "Constant", None))
            .with_description(EnumDescription::new("BORDER_REPLICATE", "Replicate", None));
        border.param.default = Some("BORDER_REPLICATE".to_string());
        let method = single(vec![
            NumericParameter::new(Parameter::new("ksize", "K", "int", "UInt32").with_default("3"))
                .into(),
            Parameter::new("flag", "Flag", "bool", "Bool").into(),
            border.into(),
        ]);
        let ids = DataIds::collect(&method).unwrap();
        let out = render(|doc| {
            emit_constructor("Blur", &ids, &EmitConfig::default(), doc);
            Ok(())
        });
        let expected = "\
Blur::Blur()
  : runtime::OperatorKernel(TYPE, PACKAGE, VERSION, setupInitParameters()),
    m_ksize(3),
    m_flag(),
    m_borderMode(1)
{
}
";
        assert_eq!(out, expected);
    }

    #[test]
    fn constructor_without_parameters() {
        let method = single(vec![Input::new(Some(&image("src", "Source")), false).into()]);
        let ids = DataIds::collect(&method).unwrap();
        let out = render(|doc| {
            emit_constructor("Blur", &ids, &EmitConfig::default(), doc);
            Ok(())
        });
        assert!(out.contains("  : runtime::OperatorKernel(TYPE, PACKAGE, VERSION, setupInitParameters())\n{\n}\n"));
    }

    #[test]
    fn init_parameters_list_data_flow() {
        let method = two_options();
        let ids = DataIds::collect(&method).unwrap();
        let out = render(|doc| emit_setup_init_parameters("Blur", &ids, &EmitConfig::default(), doc));
        let expected = "\
const std::vector<const runtime::Parameter*> Blur::setupInitParameters()
{
    std::vector<const runtime::Parameter*> parameters;

    m_dataFlowParameter = new runtime::EnumParameter(DATA_FLOW);
    m_dataFlowParameter->setAccessMode(runtime::Parameter::NONE_WRITE);
    m_dataFlowParameter->setTitle(\"Data flow\");
    m_dataFlowParameter->add(runtime::EnumDescription(runtime::Enum(MANUAL), \"Manual\"));
    m_dataFlowParameter->add(runtime::EnumDescription(runtime::Enum(ALLOCATE), \"Allocate\"));
    parameters.push_back(m_dataFlowParameter);

    return parameters;
}
";
        assert_eq!(out, expected);
    }

    #[test]
    fn declared_init_parameter_is_not_repeated_per_option() {
        let method = single(vec![Parameter::new("depth", "Depth", "int", "Int32").init().into()]);
        let ids = DataIds::collect(&method).unwrap();
        let config = EmitConfig::default();
        let init = render(|doc| emit_setup_init_parameters("Blur", &ids, &config, doc));
        assert!(init.contains("m_depthParameter = new runtime::Parameter(DEPTH, runtime::DataVariant::INT_32);"));
        assert!(init.contains("setAccessMode(runtime::Parameter::NONE_WRITE)"));
        let later = render(|doc| emit_setup_parameters(&method, &ids, "Blur", &config, doc));
        assert!(!later.contains("m_depthParameter"));
    }

    #[test]
    fn numeric_parameter_limits_and_title() {
        let ksize = NumericParameter::new(
            Parameter::new("ksize", "Kernel size", "int", "UInt32").with_rule(ParameterRule::Odd),
        )
        .with_bounds("1", "31")
        .with_step("2");
        let method = single(vec![ksize.into()]);
        let ids = DataIds::collect(&method).unwrap();
        let out = render(|doc| emit_setup_parameters(&method, &ids, "Blur", &EmitConfig::default(), doc));
        let expected = "\
const std::vector<const runtime::Parameter*> Blur::setupParameters()
{
    std::vector<const runtime::Parameter*> parameters;

    m_ksizeParameter = new runtime::NumericParameter<runtime::UInt32>(KSIZE);
    m_ksizeParameter->setAccessMode(runtime::Parameter::ACTIVATED_WRITE);
    m_ksizeParameter->setTitle(\"Kernel size\");
    m_ksizeParameter->setMin(runtime::UInt32(1));
    m_ksizeParameter->setMax(runtime::UInt32(31));
    m_ksizeParameter->setStep(runtime::UInt32(2));
    parameters.push_back(m_ksizeParameter);

    return parameters;
}
";
        assert_eq!(out, expected);
    }

    #[test]
    fn matrix_and_enum_parameters() {
        let method = single(vec![
            Parameter::new("affineM", "2x3 \"affine\"", "cv::Mat", "Matrix").into(),
            EnumParameter::new("borderMode", "Border mode")
                .with_description(EnumDescription::new("BORDER_CONSTANT", "Constant", None))
                .with_description(EnumDescription::new("BORDER_REPLICATE", "", None))
                .into(),
        ]);
        let ids = DataIds::collect(&method).unwrap();
        let out = render(|doc| emit_setup_parameters(&method, &ids, "Blur", &EmitConfig::default(), doc));
        assert!(out.contains(
            "m_affineMParameter = new runtime::MatrixParameter(AFFINE_M, runtime::DataVariant::MATRIX);"
        ));
        assert!(out.contains("m_affineMParameter->setTitle(\"2x3 \\\"affine\\\"\");"));
        assert!(out.contains(
            "m_borderModeParameter->add(runtime::EnumDescription(runtime::Enum(0), \"Constant\"));"
        ));
        assert!(out.contains(
            "m_borderModeParameter->add(runtime::EnumDescription(runtime::Enum(1), \"BORDER_REPLICATE\"));"
        ));
    }

    #[test]
    fn parameters_of_each_option_under_data_flow_switch() {
        let mut method = two_options();
        method.options[1]
            .args
            .push(Parameter::new("scale", "Scale", "double", "Float64").into());
        let ids = DataIds::collect(&method).unwrap();
        let out = render(|doc| emit_setup_parameters(&method, &ids, "Blur", &EmitConfig::default(), doc));
        let manual = out.find("case(MANUAL):").unwrap();
        let allocate = out.find("case(ALLOCATE):").unwrap();
        let scale = out.find("m_scaleParameter = new").unwrap();
        assert!(manual < allocate && allocate < scale);
        assert!(out.contains("    switch(int(m_dataFlow))\n"));
        assert!(out.ends_with("    }\n\n    return parameters;\n}\n"));
    }

    #[test]
    fn inputs_and_outputs_with_titles() {
        let method = two_options();
        let ids = DataIds::collect(&method).unwrap();
        let config = EmitConfig::default();
        let inputs = render(|doc| {
            emit_setup_connectors(&method, &ids, "Blur", Connector::Inputs, &config, doc)
        });
        let outputs = render(|doc| {
            emit_setup_connectors(&method, &ids, "Blur", Connector::Outputs, &config, doc)
        });

        let expected_inputs = "\
const std::vector<const runtime::Description*> Blur::setupInputs()
{
    std::vector<const runtime::Description*> inputs;

    switch(int(m_dataFlow))
    {
    case(MANUAL):
        {
            runtime::Description* src = new runtime::Description(SRC, runtime::DataVariant::IMAGE);
            src->setTitle(\"Source\");
            inputs.push_back(src);

            runtime::Description* dst = new runtime::Description(DST, runtime::DataVariant::IMAGE);
            dst->setTitle(\"Destination\");
            inputs.push_back(dst);

        }
        break;
    case(ALLOCATE):
        {
            runtime::Description* src = new runtime::Description(SRC, runtime::DataVariant::IMAGE);
            src->setTitle(\"Source\");
            inputs.push_back(src);

        }
        break;
    }

    return inputs;
}
";
        assert_eq!(inputs, expected_inputs);
        // The in-place destination and the allocated one are both outputs.
        assert_eq!(outputs.matches("outputs.push_back(dst);").count(), 2);
        assert!(!outputs.contains("src"));
    }

    #[test]
    fn output_title_falls_back_to_ident() {
        let method = single(vec![Output::new(&Argument::new("mean", "", "double", "Float64")).into()]);
        let ids = DataIds::collect(&method).unwrap();
        let out = render(|doc| {
            emit_setup_connectors(&method, &ids, "Mean", Connector::Outputs, &EmitConfig::default(), doc)
        });
        assert!(out.contains("runtime::Description* mean = new runtime::Description(MEAN, runtime::DataVariant::FLOAT_64);"));
        assert!(out.contains("mean->setTitle(\"mean\");"));
    }

    #[test]
    fn initialize_passes_every_setup() {
        let out = render(|doc| {
            emit_initialize("Blur", &EmitConfig::default(), doc);
            Ok(())
        });
        assert_eq!(
            out,
            "void Blur::initialize()\n{\n    runtime::OperatorKernel::initialize(setupInputs(), setupOutputs(), setupParameters());\n}\n"
        );
    }
}
