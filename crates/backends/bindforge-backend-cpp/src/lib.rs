pub mod emit;
mod execute;
mod ids;
mod setter;
mod setup;

use bindforge_core::error::CoreError;
use bindforge_core::pipeline::{Backend, BackendInput};

/// C++ backend: one operator-kernel source file per method.
pub struct CppBackend;

impl Backend for CppBackend {
    fn name(&self) -> &str {
        "cpp"
    }

    fn emit(&self, input: BackendInput) -> Result<(), CoreError> {
        emit::emit_packages(&input.packages, &input.output_dir, &input.config)
    }
}
