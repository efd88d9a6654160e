use std::fs;
use std::path::{Path, PathBuf};

use bindforge_core::emit::{Document, Sink};
use bindforge_core::error::CoreError;
use bindforge_core::ir::{ArgNode, EnumParameter, Method, Package};
use bindforge_core::pipeline::EmitConfig;
use bindforge_core::visit::Accept;
use tracing::{debug, info};

use crate::execute::{emit_option_body, enum_converter};
use crate::ids::{DataIds, DATA_FLOW};
use crate::setter::SetParameterCases;
use crate::setup::{
    emit_constructor, emit_initialize, emit_setup_connectors, emit_setup_init_parameters,
    emit_setup_parameters, for_each_option, Connector,
};

/// A generated source file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Render every method of every package, then write the results into
/// `output_dir`.
///
/// Rendering happens entirely in memory first, so a failure leaves the
/// output directory untouched.
pub fn emit_packages(
    packages: &[Package],
    output_dir: &Path,
    config: &EmitConfig,
) -> Result<(), CoreError> {
    let mut files = Vec::new();
    for package in packages {
        files.extend(render_package(package, config)?);
    }

    for file in &files {
        let path = output_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)?;
        debug!(path = %path.display(), bytes = file.contents.len(), "wrote source");
    }
    info!(
        files = files.len(),
        output_dir = %output_dir.display(),
        "generated operator sources"
    );
    Ok(())
}

/// Render one `<package>/<Class>.cpp` per method.
pub fn render_package(package: &Package, config: &EmitConfig) -> Result<Vec<RenderedFile>, CoreError> {
    package
        .methods
        .iter()
        .map(|method| -> Result<RenderedFile, CoreError> {
            Ok(RenderedFile {
                path: Path::new(package.ident.as_str())
                    .join(format!("{}.cpp", method.ident.class_name())),
                contents: emit_method_to_string(package, method, config)?,
            })
        })
        .collect()
}

/// Emit a single method to a string (for testing).
pub fn emit_method_to_string(
    package: &Package,
    method: &Method,
    config: &EmitConfig,
) -> Result<String, CoreError> {
    let ids = DataIds::collect(method)?;
    let class = method.ident.class_name();
    let function = native_function(method);
    let mut doc = Document::new(config.indent_width);

    if !method.name.is_empty() {
        doc.line(&format!("// {}", method.name));
    }
    for line in method.doc.lines() {
        doc.line(&format!("// {line}"));
    }
    doc.line(&format!("#include \"{}/{class}.h\"", package.ident));
    doc.blank();
    doc.line(&format!("namespace {}", package.ident));
    doc.scope(|doc| -> Result<(), CoreError> {
        emit_constants(package, &class, config, doc);
        doc.blank();
        emit_ids(&ids, method, doc);
        doc.blank();
        emit_constructor(&class, &ids, config, doc);
        doc.blank();
        emit_get_parameter(&ids, &class, config, doc);
        doc.blank();
        emit_set_parameter(&ids, &class, config, doc)?;
        doc.blank();
        emit_setup_init_parameters(&class, &ids, config, doc)?;
        doc.blank();
        emit_setup_parameters(method, &ids, &class, config, doc)?;
        doc.blank();
        emit_setup_connectors(method, &ids, &class, Connector::Inputs, config, doc)?;
        doc.blank();
        emit_setup_connectors(method, &ids, &class, Connector::Outputs, config, doc)?;
        doc.blank();
        emit_initialize(&class, config, doc);
        for node in &ids.parameters {
            if let ArgNode::EnumParameter(param) = node {
                if param.param.arg.ident.as_str() != DATA_FLOW {
                    doc.blank();
                    emit_enum_converter(param, &class, config, doc);
                }
            }
        }
        doc.blank();
        emit_execute(method, &ids, &class, &function, config, doc)
    })?;

    Ok(doc.into_string())
}

/// Native function called by `execute`: the `name` of the first overload,
/// or the method ident in the `cv` namespace.
fn native_function(method: &Method) -> String {
    method
        .functions
        .first()
        .and_then(|f| f.get("name"))
        .and_then(|name| name.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("cv::{}", method.ident))
}

fn emit_constants(package: &Package, class: &str, config: &EmitConfig, doc: &mut Document) {
    let version = package.version;
    doc.line(&format!("const std::string {class}::PACKAGE(\"{}\");", package.ident));
    doc.line(&format!(
        "const {} {class}::VERSION({}, {}, {});",
        config.runtime("Version"),
        version.major,
        version.minor,
        version.patch
    ));
    doc.line(&format!("const std::string {class}::TYPE(\"{class}\");"));
}

fn emit_enum_body(name: &str, entries: &[String], doc: &mut Document) {
    doc.line(&format!("enum {name}"));
    doc.line("{");
    doc.increase_indent();
    for (i, entry) in entries.iter().enumerate() {
        if i + 1 < entries.len() {
            doc.line(&format!("{entry},"));
        } else {
            doc.line(entry);
        }
    }
    doc.decrease_indent();
    doc.line("};");
}

fn emit_ids(ids: &DataIds, method: &Method, doc: &mut Document) {
    let data_ids: Vec<String> = ids.ids.iter().map(|id| id.constant()).collect();
    emit_enum_body("DataId", &data_ids, doc);
    if ids.has_data_flow() {
        let flows: Vec<String> = method.options.iter().map(|o| o.ident.constant()).collect();
        doc.blank();
        emit_enum_body("DataFlowId", &flows, doc);
    }
}

fn emit_get_parameter(ids: &DataIds, class: &str, config: &EmitConfig, doc: &mut Document) {
    doc.line(&format!(
        "const {} {class}::getParameter(unsigned int id) const",
        config.runtime("DataRef")
    ));
    doc.scope(|doc| {
        doc.line("switch(id)");
        doc.line("{");
        for node in &ids.parameters {
            let ident = node.ident();
            doc.line(&format!("case {}:", ident.constant()));
            doc.increase_indent();
            doc.line(&format!("return {};", ident.attribute()));
            doc.decrease_indent();
        }
        emit_wrong_id(config, doc);
        doc.line("}");
    });
}

fn emit_wrong_id(config: &EmitConfig, doc: &mut Document) {
    doc.line("default:");
    doc.increase_indent();
    doc.line(&format!("throw {}(id, *this);", config.runtime("WrongParameterId")));
    doc.decrease_indent();
}

fn emit_set_parameter(
    ids: &DataIds,
    class: &str,
    config: &EmitConfig,
    doc: &mut Document,
) -> Result<(), CoreError> {
    doc.line(&format!(
        "void {class}::setParameter(unsigned int id, const {}& value)",
        config.runtime("Data")
    ));
    doc.scope(|doc| -> Result<(), CoreError> {
        doc.line("try");
        doc.scope(|doc| -> Result<(), CoreError> {
            doc.line("switch(id)");
            doc.line("{");
            for node in &ids.parameters {
                node.accept(&mut SetParameterCases { doc, config })?;
            }
            emit_wrong_id(config, doc);
            doc.line("}");
            Ok(())
        })?;
        doc.line(&format!("catch({}&)", config.runtime("BadCast")));
        doc.scope(|doc| {
            doc.line(&format!(
                "throw {}(parameter(id), *this);",
                config.runtime("WrongParameterType")
            ));
        });
        Ok(())
    })
}

/// Maps the wrapper's enum index to the native constant.
fn emit_enum_converter(
    param: &EnumParameter,
    class: &str,
    config: &EmitConfig,
    doc: &mut Document,
) {
    let ident = &param.param.arg.ident;
    doc.line(&format!(
        "{} {class}::{}(const {} & value)",
        param.param.arg.cv_type,
        enum_converter(ident),
        config.runtime("Enum")
    ));
    doc.scope(|doc| {
        doc.line("switch(int(value))");
        doc.line("{");
        for (index, description) in param.descriptions.iter().enumerate() {
            doc.line(&format!("case {index}:"));
            doc.increase_indent();
            doc.line(&format!("return {};", description.cv_ident));
            doc.decrease_indent();
        }
        doc.line("default:");
        doc.increase_indent();
        doc.line(&format!(
            "throw {}(parameter({}), *this);",
            config.runtime("WrongParameterValue"),
            ident.constant()
        ));
        doc.decrease_indent();
        doc.line("}");
    });
}

fn emit_execute(
    method: &Method,
    ids: &DataIds,
    class: &str,
    function: &str,
    config: &EmitConfig,
    doc: &mut Document,
) -> Result<(), CoreError> {
    doc.line(&format!(
        "void {class}::execute({} & provider)",
        config.runtime("DataProvider")
    ));
    doc.scope(|doc| {
        for_each_option(method, ids, doc, |option, doc| {
            emit_option_body(option, function, config, doc)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindforge_core::ir::{
        Allocation, Argument, EnumDescription, Input, NumericParameter, OptionDef,
        Parameter, ParameterRule, RefInput,
    };

    fn image(ident: &str, name: &str) -> Argument {
        Argument::new(ident, name, "cv::Mat", "Image")
    }

    fn ksize() -> NumericParameter {
        NumericParameter::new(
            Parameter::new("ksize", "Kernel size", "int", "UInt32").with_rule(ParameterRule::Odd),
        )
        .with_step("2")
    }

    fn median_blur() -> Method {
        Method::new("medianBlur")
            .with_name("Median blur")
            .with_option(OptionDef::new(
                "allocate",
                "Allocate",
                vec![
                    Input::new(Some(&image("src", "Source")), false).into(),
                    Allocation::new(&image("dst", "Destination")).into(),
                    ksize().into(),
                ],
            ))
    }

    fn package(methods: Vec<Method>) -> Package {
        let mut package = Package::new("cvimgproc", 0, 1, 0);
        package.methods = methods;
        package
    }

    #[test]
    fn single_option_method() {
        let pkg = package(vec![median_blur()]);
        let out = emit_method_to_string(&pkg, &pkg.methods[0], &EmitConfig::default()).unwrap();
        let expected = r#"// Median blur
#include "cvimgproc/MedianBlur.h"

namespace cvimgproc
{
    const std::string MedianBlur::PACKAGE("cvimgproc");
    const runtime::Version MedianBlur::VERSION(0, 1, 0);
    const std::string MedianBlur::TYPE("MedianBlur");

    enum DataId
    {
        SRC,
        DST,
        KSIZE
    };

    MedianBlur::MedianBlur()
      : runtime::OperatorKernel(TYPE, PACKAGE, VERSION, setupInitParameters()),
        m_ksize()
    {
    }

    const runtime::DataRef MedianBlur::getParameter(unsigned int id) const
    {
        switch(id)
        {
        case KSIZE:
            return m_ksize;
        default:
            throw runtime::WrongParameterId(id, *this);
        }
    }

    void MedianBlur::setParameter(unsigned int id, const runtime::Data& value)
    {
        try
        {
            switch(id)
            {
            case KSIZE:
                {
                    const runtime::UInt32 & castedValue = runtime::data_cast<runtime::UInt32>(value);
                    checkNumericValue(castedValue, m_ksizeParameter, *this);
                    if(int(castedValue) % 2 == 0)
                        throw runtime::WrongParameterValue(*m_ksizeParameter, *this, "Only odd values are allowed");
                    m_ksize = castedValue;
                }
                break;
            default:
                throw runtime::WrongParameterId(id, *this);
            }
        }
        catch(runtime::BadCast&)
        {
            throw runtime::WrongParameterType(parameter(id), *this);
        }
    }

    const std::vector<const runtime::Parameter*> MedianBlur::setupInitParameters()
    {
        std::vector<const runtime::Parameter*> parameters;

        return parameters;
    }

    const std::vector<const runtime::Parameter*> MedianBlur::setupParameters()
    {
        std::vector<const runtime::Parameter*> parameters;

        m_ksizeParameter = new runtime::NumericParameter<runtime::UInt32>(KSIZE);
        m_ksizeParameter->setAccessMode(runtime::Parameter::ACTIVATED_WRITE);
        m_ksizeParameter->setTitle("Kernel size");
        m_ksizeParameter->setStep(runtime::UInt32(2));
        parameters.push_back(m_ksizeParameter);

        return parameters;
    }

    const std::vector<const runtime::Description*> MedianBlur::setupInputs()
    {
        std::vector<const runtime::Description*> inputs;

        runtime::Description* src = new runtime::Description(SRC, runtime::DataVariant::IMAGE);
        src->setTitle("Source");
        inputs.push_back(src);

        return inputs;
    }

    const std::vector<const runtime::Description*> MedianBlur::setupOutputs()
    {
        std::vector<const runtime::Description*> outputs;

        runtime::Description* dst = new runtime::Description(DST, runtime::DataVariant::IMAGE);
        dst->setTitle("Destination");
        outputs.push_back(dst);

        return outputs;
    }

    void MedianBlur::initialize()
    {
        runtime::OperatorKernel::initialize(setupInputs(), setupOutputs(), setupParameters());
    }

    void MedianBlur::execute(runtime::DataProvider & provider)
    {
        runtime::DataContainer srcContainer = provider.receiveInputData(SRC);
        runtime::ReadAccess srcReadAccess(srcContainer);
        cv::Mat srcCvData = cvsupport::getOpenCvMat(srcReadAccess());
        cv::Mat dstCvData;
        int ksizeCvData = int(m_ksize);

        cv::medianBlur(srcCvData, dstCvData, ksizeCvData);

        provider.sendOutputData(DST, runtime::DataContainer(cvsupport::wrap(dstCvData)));
    }
}
"#;
        assert_eq!(out, expected);
    }

    fn multi_option() -> Method {
        let manual = OptionDef::new(
            "manual",
            "Manual",
            vec![
                Input::new(Some(&image("src", "Source")), false).into(),
                RefInput::new(&image("dst", "Destination"), "src").into(),
                ksize().into(),
            ],
        );
        let allocate = OptionDef::new(
            "allocate",
            "Allocate",
            vec![
                Input::new(Some(&image("src", "Source")), false).into(),
                Allocation::new(&image("dst", "Destination")).into(),
                ksize().into(),
                EnumParameter::new("borderType", "Border type")
                    .with_description(EnumDescription::new("BORDER_DEFAULT", "Default", None))
                    .with_description(EnumDescription::new("BORDER_REFLECT", "Reflect", None))
                    .into(),
            ],
        );
        Method::new("medianBlur").with_option(manual).with_option(allocate)
    }

    #[test]
    fn multi_option_switches_on_data_flow() {
        let pkg = package(vec![multi_option()]);
        let out = emit_method_to_string(&pkg, &pkg.methods[0], &EmitConfig::default()).unwrap();

        assert!(out.contains("    enum DataFlowId\n    {\n        MANUAL,\n        ALLOCATE\n    };\n"));
        assert!(out.contains("        DATA_FLOW\n    };"));
        assert!(out.contains("        case DATA_FLOW:\n            return m_dataFlow;\n"));
        assert!(out.contains("checkEnumValue(castedValue, m_dataFlowParameter, *this);"));
        assert!(out.contains("        switch(int(m_dataFlow))\n"));
        assert!(out.contains("        case(MANUAL):\n            {\n"));
        assert!(out.contains("        case(ALLOCATE):\n"));
        assert!(out.contains("Can not operate in place."));
        // The enum converter is generated for the declared enum, not for the
        // implicit data flow parameter.
        assert!(out.contains("int MedianBlur::convertBorderType(const runtime::Enum & value)"));
        assert!(out.contains("            return cv::BORDER_REFLECT;\n"));
        assert!(!out.contains("convertDataFlow"));
    }

    #[test]
    fn multi_option_setup_sections() {
        let pkg = package(vec![multi_option()]);
        let out = emit_method_to_string(&pkg, &pkg.methods[0], &EmitConfig::default()).unwrap();

        assert!(out.contains("        m_borderType(),\n        m_dataFlow()\n    {\n    }\n"));
        let init = &out[out.find("::setupInitParameters()").unwrap()..out.find("::setupParameters()").unwrap()];
        assert!(init.contains(
            "m_dataFlowParameter->add(runtime::EnumDescription(runtime::Enum(MANUAL), \"Manual\"));"
        ));
        assert!(!init.contains("m_ksizeParameter"));

        let params = &out[out.find("::setupParameters()").unwrap()..out.find("::setupInputs()").unwrap()];
        let allocate = params.find("case(ALLOCATE):").unwrap();
        let border = params.find("m_borderTypeParameter = new runtime::EnumParameter(BORDER_TYPE);").unwrap();
        assert!(allocate < border);
        assert_eq!(params.matches("m_ksizeParameter = new").count(), 2);

        let inputs = &out[out.find("::setupInputs()").unwrap()..out.find("::setupOutputs()").unwrap()];
        assert_eq!(inputs.matches("inputs.push_back(dst);").count(), 1);
        assert!(out.contains("    void MedianBlur::initialize()\n"));
    }

    #[test]
    fn setter_cases_follow_first_seen_order() {
        let pkg = package(vec![multi_option()]);
        let out = emit_method_to_string(&pkg, &pkg.methods[0], &EmitConfig::default()).unwrap();
        let setter = &out[out.find("::setParameter").unwrap()..];
        let ksize = setter.find("case KSIZE:").unwrap();
        let border = setter.find("case BORDER_TYPE:").unwrap();
        let flow = setter.find("case DATA_FLOW:").unwrap();
        assert!(ksize < border && border < flow);
    }

    #[test]
    fn indent_width_is_configurable() {
        let pkg = package(vec![median_blur()]);
        let config = EmitConfig {
            indent_width: 2,
            ..EmitConfig::default()
        };
        let out = emit_method_to_string(&pkg, &pkg.methods[0], &config).unwrap();
        assert!(out.contains("\n  const std::string MedianBlur::TYPE(\"MedianBlur\");\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let pkg = package(vec![median_blur(), multi_option()]);
        let config = EmitConfig::default();
        assert_eq!(
            render_package(&pkg, &config).unwrap(),
            render_package(&pkg, &config).unwrap()
        );
    }

    #[test]
    fn writes_one_file_per_method() {
        let dir = tempfile::tempdir().unwrap();
        let mut blur = median_blur();
        blur.ident = "blur".into();
        let pkg = package(vec![median_blur(), blur]);
        emit_packages(&[pkg], dir.path(), &EmitConfig::default()).unwrap();

        let median = fs::read_to_string(dir.path().join("cvimgproc/MedianBlur.cpp")).unwrap();
        assert!(median.contains("cv::medianBlur(srcCvData, dstCvData, ksizeCvData);"));
        assert!(dir.path().join("cvimgproc/Blur.cpp").exists());
    }

    #[test]
    fn failed_render_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let broken = Method::new("broken").with_option(OptionDef::new(
            "manual",
            "Manual",
            vec![RefInput::new(&image("dst", "Destination"), "missing").into()],
        ));
        let pkg = package(vec![median_blur(), broken]);
        let err = emit_packages(&[pkg], dir.path(), &EmitConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::Emit { .. }));
        assert!(!dir.path().join("cvimgproc").exists());
    }
}
