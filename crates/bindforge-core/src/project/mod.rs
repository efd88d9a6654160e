pub mod manifest;

pub use manifest::{load_package, parse_package};
