use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::CoreError;
use crate::ir::Package;

/// Read a JSON package definition from `path`.
pub fn load_package(path: &Path) -> Result<Package, CoreError> {
    let text = fs::read_to_string(path)?;
    parse_package(&text, path)
}

/// Parse a JSON package definition. `path` is only used in error messages.
pub fn parse_package(text: &str, path: &Path) -> Result<Package, CoreError> {
    let package: Package = serde_json::from_str(text).map_err(|e| CoreError::Parse {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(
        package = %package.ident,
        methods = package.methods.len(),
        "loaded package definition"
    );
    Ok(package)
}
