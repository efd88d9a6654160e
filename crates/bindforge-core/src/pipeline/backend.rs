use std::path::PathBuf;

use super::EmitConfig;
use crate::error::CoreError;
use crate::ir::Package;

/// Input to a backend.
pub struct BackendInput {
    /// Validated packages to generate wrappers for.
    pub packages: Vec<Package>,
    /// Output directory for generated code.
    pub output_dir: PathBuf,
    /// Naming and layout conventions for the emitted code.
    pub config: EmitConfig,
}

/// Emits wrapper code from IR.
pub trait Backend {
    /// Name of this backend (e.g., "cpp").
    fn name(&self) -> &str;

    /// Generate code for every package.
    ///
    /// Nothing is written unless every package rendered successfully.
    fn emit(&self, input: BackendInput) -> Result<(), CoreError>;
}
