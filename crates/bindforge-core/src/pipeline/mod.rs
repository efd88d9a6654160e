pub mod backend;
pub mod config;

pub use backend::{Backend, BackendInput};
pub use config::{EmitConfig, Preset, VALID_PRESETS};
