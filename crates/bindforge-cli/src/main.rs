use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bindforge_core::error::CoreError;
use bindforge_core::ir::{
    validate_package, Allocation, Compound, Constant, EnumParameter, Input, Method,
    NumericParameter, OptionDef, Output, Package, Parameter, RefInput,
};
use bindforge_core::pipeline::{Backend, BackendInput, Preset, VALID_PRESETS};
use bindforge_core::project::load_package;
use bindforge_core::visit::{walk_package, Visitor};

#[derive(Parser, Debug)]
#[command(name = "bindforge")]
#[command(about = "Generate typed operator wrappers from a package description")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate wrapper sources for one or more packages
    Generate {
        /// Package description files (JSON)
        #[arg(required = true)]
        packages: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Naming preset
        #[arg(long, default_value = "opencv")]
        preset: String,

        /// Spaces per indentation level
        #[arg(long)]
        indent: Option<usize>,
    },
    /// Load and validate a package without generating anything
    Check {
        package: PathBuf,
    },
    /// Print the visit order of a package
    Show {
        package: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "bindforge=debug,bindforge_core=debug,bindforge_backend_cpp=debug"
    } else {
        "bindforge=info,bindforge_core=info,bindforge_backend_cpp=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli.command) {
        error!("{e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Generate {
            packages,
            output,
            preset,
            indent,
        } => generate(&packages, output, &preset, indent),
        Command::Check { package } => {
            let package = load_checked(&package)?;
            println!(
                "{}: ok ({} methods)",
                package.ident,
                package.methods.len()
            );
            Ok(())
        }
        Command::Show { package } => {
            let package = load_checked(&package)?;
            let mut printer = TreePrinter::default();
            walk_package(&package, &mut printer)?;
            print!("{}", printer.out);
            Ok(())
        }
    }
}

fn load_checked(path: &Path) -> Result<Package> {
    let package =
        load_package(path).with_context(|| format!("failed to load {}", path.display()))?;
    validate_package(&package).with_context(|| format!("{} is invalid", path.display()))?;
    Ok(package)
}

fn generate(paths: &[PathBuf], output: PathBuf, preset: &str, indent: Option<usize>) -> Result<()> {
    let Some(mut config) = Preset::resolve(preset) else {
        bail!(
            "unknown preset `{preset}` (expected one of: {})",
            VALID_PRESETS.join(", ")
        );
    };
    if let Some(width) = indent {
        config.indent_width = width;
    }

    let packages = paths
        .iter()
        .map(|path| load_checked(path))
        .collect::<Result<Vec<_>>>()?;

    let backend = backend()?;
    info!(backend = backend.name(), preset, packages = packages.len(), "generating");
    backend
        .emit(BackendInput {
            packages,
            output_dir: output.clone(),
            config,
        })
        .with_context(|| format!("failed to generate into {}", output.display()))?;
    Ok(())
}

#[cfg(feature = "backend-cpp")]
fn backend() -> Result<Box<dyn Backend>> {
    Ok(Box::new(bindforge_backend_cpp::CppBackend))
}

#[cfg(not(feature = "backend-cpp"))]
fn backend() -> Result<Box<dyn Backend>> {
    bail!("built without a code generation backend (enable the `backend-cpp` feature)")
}

/// Renders the tree as indented `kind ident` lines, one per visited node.
#[derive(Default)]
struct TreePrinter {
    out: String,
    depth: usize,
}

impl TreePrinter {
    fn node(&mut self, kind: &str, ident: impl std::fmt::Display) -> Result<(), CoreError> {
        self.out.push_str(&"  ".repeat(self.depth));
        self.out.push_str(&format!("{kind} {ident}\n"));
        Ok(())
    }
}

impl Visitor for TreePrinter {
    fn visit_package(&mut self, package: &Package) -> Result<(), CoreError> {
        self.depth = 0;
        let version = package.version;
        self.node(
            "package",
            format!(
                "{} {}.{}.{}",
                package.ident, version.major, version.minor, version.patch
            ),
        )
    }

    fn visit_method(&mut self, method: &Method) -> Result<(), CoreError> {
        self.depth = 1;
        self.node("method", &method.ident)
    }

    fn visit_option(&mut self, option: &OptionDef) -> Result<(), CoreError> {
        self.depth = 2;
        self.node("option", &option.ident)?;
        self.depth = 3;
        Ok(())
    }

    fn visit_input(&mut self, input: &Input) -> Result<(), CoreError> {
        self.node("input", &input.arg.ident)
    }

    fn visit_output(&mut self, output: &Output) -> Result<(), CoreError> {
        self.node("output", &output.arg.ident)
    }

    fn visit_ref_input(&mut self, ref_input: &RefInput) -> Result<(), CoreError> {
        self.node(
            "ref-input",
            format!("{} -> {}", ref_input.arg.ident, ref_input.ref_arg),
        )
    }

    fn visit_allocation(&mut self, allocation: &Allocation) -> Result<(), CoreError> {
        self.node("allocation", &allocation.arg.ident)
    }

    fn visit_constant(&mut self, constant: &Constant) -> Result<(), CoreError> {
        self.node("constant", format!("{} = {}", constant.ident, constant.value))
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Result<(), CoreError> {
        self.node("parameter", &parameter.arg.ident)
    }

    fn visit_numeric_parameter(&mut self, parameter: &NumericParameter) -> Result<(), CoreError> {
        self.node("numeric-parameter", &parameter.param.arg.ident)
    }

    fn visit_enum_parameter(&mut self, parameter: &EnumParameter) -> Result<(), CoreError> {
        self.node(
            "enum-parameter",
            format!(
                "{} ({} values)",
                parameter.param.arg.ident,
                parameter.descriptions.len()
            ),
        )
    }

    fn visit_compound(&mut self, compound: &Compound) -> Result<(), CoreError> {
        self.node("compound", compound.label())
    }
}
