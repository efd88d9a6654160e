use crate::ir::Ident;

/// Naming and layout conventions shared by the core and the backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitConfig {
    /// Spaces per indentation level.
    pub indent_width: usize,
    /// Native constructor used by size compounds.
    pub size_type: String,
    /// Suffix turning an argument ident into its native-data variable.
    pub data_suffix: String,
    /// Namespace of the wrapper runtime (`runtime::Data`, ...).
    pub runtime_namespace: String,
}

impl Default for EmitConfig {
    /// Default is the `opencv` preset.
    fn default() -> Self {
        Self::opencv()
    }
}

impl EmitConfig {
    fn opencv() -> Self {
        Self {
            indent_width: 4,
            size_type: "cv::Size".to_string(),
            data_suffix: "CvData".to_string(),
            runtime_namespace: "runtime".to_string(),
        }
    }

    fn generic() -> Self {
        Self {
            size_type: "NativeSize".to_string(),
            ..Self::opencv()
        }
    }

    /// Native-data variable for `ident`, e.g. `srcCvData`.
    pub fn data_expr(&self, ident: &Ident) -> String {
        format!("{ident}{}", self.data_suffix)
    }

    /// Qualify `name` with the runtime namespace.
    pub fn runtime(&self, name: &str) -> String {
        format!("{}::{name}", self.runtime_namespace)
    }
}

/// Preset names accepted by [`Preset::resolve`].
pub const VALID_PRESETS: &[&str] = &["opencv", "generic"];

/// A named [`EmitConfig`].
///
/// - **`opencv`** (default): `cv::Size`, `CvData` suffix, `runtime` namespace.
/// - **`generic`**: same, but sizes are built with `NativeSize`.
pub struct Preset;

impl Preset {
    pub fn resolve(name: &str) -> Option<EmitConfig> {
        match name {
            "opencv" => Some(EmitConfig::opencv()),
            "generic" => Some(EmitConfig::generic()),
            _ => None,
        }
    }
}
