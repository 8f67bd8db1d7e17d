// Export modules for library usage
pub mod cli;
pub mod codegen;
pub mod commands;
pub mod errors;
pub mod resolver;
pub mod tree;
pub mod walker;

// Re-export commonly used types
pub use crate::codegen::render_module;
pub use crate::errors::GenerateError;
pub use crate::resolver::{load_package, Aggregate, FieldDesc, Package, TypeDesc};
pub use crate::tree::{Comparisons, Entry};
pub use crate::walker::{Features, WalkOptions, WalkResult, Walker};
