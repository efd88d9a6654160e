//! Body of `execute` for one option: data declarations, the native call,
//! and output hand-back.

use bindforge_core::emit::{Document, Sink};
use bindforge_core::error::CoreError;
use bindforge_core::ir::{
    Allocation, ArgNode, Compound, Constant, EnumParameter, Ident, Input, NumericParameter,
    OptionDef, Output, Parameter, RefInput,
};
use bindforge_core::pipeline::EmitConfig;
use bindforge_core::visit::{walk_option, Accept, Visitor};

/// Convert a wrapper-side expression to the native type.
fn native_from(cv_type: &str, expr: &str) -> String {
    if cv_type == "cv::Mat" {
        format!("cvsupport::getOpenCvMat({expr})")
    } else {
        format!("{cv_type}({expr})")
    }
}

/// Name of the generated converter for an enum parameter.
pub(crate) fn enum_converter(ident: &Ident) -> String {
    format!("convert{}", ident.class_name())
}

/// Writes declarations straight into `doc` and buffers the statements that
/// belong after the native call.
struct Declarations<'a> {
    option: &'a OptionDef,
    config: &'a EmitConfig,
    doc: &'a mut Document,
    init_in: Vec<String>,
    init_out: Vec<String>,
    post: Vec<String>,
    result: Option<(String, Ident)>,
}

impl Declarations<'_> {
    fn receive(&mut self, ident: &Ident) {
        self.doc.line(&format!(
            "{} {ident}Container = provider.receiveInputData({});",
            self.config.runtime("DataContainer"),
            ident.constant()
        ));
    }

    fn send(&mut self, ident: &Ident, container: String) {
        self.post.push(format!(
            "provider.sendOutputData({}, {container});",
            ident.constant()
        ));
    }

    fn parameter(&mut self, parameter: &Parameter) {
        let ident = &parameter.arg.ident;
        let cv_type = &parameter.arg.cv_type;
        self.doc.line(&format!(
            "{cv_type} {} = {};",
            self.config.data_expr(ident),
            native_from(cv_type, &ident.attribute())
        ));
    }

    fn inits(&mut self, init_in: &[String], init_out: &[String]) {
        self.init_in.extend_from_slice(init_in);
        self.init_out.extend_from_slice(init_out);
    }
}

impl Visitor for Declarations<'_> {
    fn visit_input(&mut self, input: &Input) -> Result<(), CoreError> {
        let ident = &input.arg.ident;
        self.receive(ident);
        self.doc.line(&format!(
            "{} {ident}ReadAccess({ident}Container);",
            self.config.runtime("ReadAccess")
        ));
        self.doc.line(&format!(
            "{} {} = {};",
            input.arg.cv_type,
            self.config.data_expr(ident),
            native_from(&input.arg.cv_type, &format!("{ident}ReadAccess()"))
        ));
        self.inits(&input.arg.init_in, &input.arg.init_out);
        Ok(())
    }

    /// The single return value of the native call.
    fn visit_output(&mut self, output: &Output) -> Result<(), CoreError> {
        let ident = &output.arg.ident;
        if let Some((_, first)) = &self.result {
            return Err(CoreError::Emit {
                message: format!(
                    "option `{}`: `{ident}` is a second output after `{first}`",
                    self.option.ident
                ),
            });
        }
        self.result = Some((output.arg.cv_type.clone(), ident.clone()));
        let container = format!(
            "{}(cvsupport::wrap({}))",
            self.config.runtime("DataContainer"),
            self.config.data_expr(ident)
        );
        self.send(ident, container);
        self.inits(&output.arg.init_in, &output.arg.init_out);
        Ok(())
    }

    fn visit_ref_input(&mut self, ref_input: &RefInput) -> Result<(), CoreError> {
        let ident = &ref_input.arg.ident;
        let target = self.option.resolve_ref(ref_input).ok_or_else(|| CoreError::Emit {
            message: format!(
                "option `{}`: `{ident}` references unknown argument `{}`",
                self.option.ident, ref_input.ref_arg
            ),
        })?;

        self.receive(ident);
        if let ArgNode::Input(source) = target {
            if !source.in_place {
                let source_ident = &source.arg.ident;
                self.doc.line(&format!("if({ident}Container == {source_ident}Container)"));
                self.doc.increase_indent();
                self.doc.line(&format!(
                    "throw {}({}, *this, \"Can not operate in place.\");",
                    self.config.runtime("InputError"),
                    source_ident.constant()
                ));
                self.doc.decrease_indent();
            }
        }
        self.doc.line(&format!(
            "{} {ident}WriteAccess({ident}Container);",
            self.config.runtime("WriteAccess")
        ));
        self.doc.line(&format!(
            "{} {} = {};",
            ref_input.arg.cv_type,
            self.config.data_expr(ident),
            native_from(&ref_input.arg.cv_type, &format!("{ident}WriteAccess()"))
        ));
        self.send(ident, format!("{ident}Container"));
        self.inits(&ref_input.arg.init_in, &ref_input.arg.init_out);
        Ok(())
    }

    fn visit_allocation(&mut self, allocation: &Allocation) -> Result<(), CoreError> {
        let ident = &allocation.arg.ident;
        self.doc
            .line(&format!("{} {};", allocation.arg.cv_type, self.config.data_expr(ident)));
        let container = format!(
            "{}(cvsupport::wrap({}))",
            self.config.runtime("DataContainer"),
            self.config.data_expr(ident)
        );
        self.send(ident, container);
        self.inits(&allocation.arg.init_in, &allocation.arg.init_out);
        Ok(())
    }

    fn visit_constant(&mut self, constant: &Constant) -> Result<(), CoreError> {
        self.doc.line(&format!(
            "{} {} = {};",
            constant.cv_type,
            self.config.data_expr(&constant.ident),
            constant.value
        ));
        Ok(())
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Result<(), CoreError> {
        self.parameter(parameter);
        self.inits(&parameter.arg.init_in, &parameter.arg.init_out);
        Ok(())
    }

    fn visit_numeric_parameter(&mut self, parameter: &NumericParameter) -> Result<(), CoreError> {
        self.parameter(&parameter.param);
        self.inits(&parameter.param.arg.init_in, &parameter.param.arg.init_out);
        Ok(())
    }

    fn visit_enum_parameter(&mut self, parameter: &EnumParameter) -> Result<(), CoreError> {
        let ident = &parameter.param.arg.ident;
        self.doc.line(&format!(
            "{} {} = {}({});",
            parameter.param.arg.cv_type,
            self.config.data_expr(ident),
            enum_converter(ident),
            ident.attribute()
        ));
        self.inits(&parameter.param.arg.init_in, &parameter.param.arg.init_out);
        Ok(())
    }

    /// Declarations come from the constituents, visited next.
    fn visit_compound(&mut self, _compound: &Compound) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Collects the argument list of the native call, one entry per option item.
struct CallArgs<'a> {
    config: &'a EmitConfig,
    args: Vec<String>,
}

impl CallArgs<'_> {
    fn push(&mut self, ident: &Ident) -> Result<(), CoreError> {
        self.args.push(self.config.data_expr(ident));
        Ok(())
    }
}

impl Visitor for CallArgs<'_> {
    fn visit_input(&mut self, input: &Input) -> Result<(), CoreError> {
        self.push(&input.arg.ident)
    }

    /// The return value, not an argument.
    fn visit_output(&mut self, _output: &Output) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_ref_input(&mut self, ref_input: &RefInput) -> Result<(), CoreError> {
        self.push(&ref_input.arg.ident)
    }

    fn visit_allocation(&mut self, allocation: &Allocation) -> Result<(), CoreError> {
        self.push(&allocation.arg.ident)
    }

    fn visit_constant(&mut self, constant: &Constant) -> Result<(), CoreError> {
        self.push(&constant.ident)
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Result<(), CoreError> {
        self.push(&parameter.arg.ident)
    }

    fn visit_numeric_parameter(&mut self, parameter: &NumericParameter) -> Result<(), CoreError> {
        self.push(&parameter.param.arg.ident)
    }

    fn visit_enum_parameter(&mut self, parameter: &EnumParameter) -> Result<(), CoreError> {
        self.push(&parameter.param.arg.ident)
    }

    fn visit_compound(&mut self, compound: &Compound) -> Result<(), CoreError> {
        self.args.push(compound.create_with(self.config));
        Ok(())
    }
}

/// Emit the statements executing `option` by calling `function`.
pub(crate) fn emit_option_body(
    option: &OptionDef,
    function: &str,
    config: &EmitConfig,
    doc: &mut Document,
) -> Result<(), CoreError> {
    let mut decls = Declarations {
        option,
        config,
        doc,
        init_in: Vec::new(),
        init_out: Vec::new(),
        post: Vec::new(),
        result: None,
    };
    walk_option(option, &mut decls)?;
    let Declarations {
        doc,
        init_in,
        init_out,
        post,
        result,
        ..
    } = decls;

    let mut call = CallArgs {
        config,
        args: Vec::new(),
    };
    for item in &option.args {
        item.accept(&mut call)?;
    }
    let call = format!("{function}({});", call.args.join(", "));

    for line in &init_in {
        doc.line(line);
    }
    doc.blank();
    match result {
        Some((cv_type, ident)) => {
            doc.line(&format!("{cv_type} {} = {call}", config.data_expr(&ident)))
        }
        None => doc.line(&call),
    }
    doc.blank();
    for line in init_out.iter().chain(&post) {
        doc.line(line);
    }
    Ok(())
}
