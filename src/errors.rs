//! Failure classes for the generator.
//!
//! Everything here is fatal: the tool is a one-shot batch generator with no
//! partial-output recovery, so any of these aborts the whole run. The only
//! non-fatal condition, an unknown field kind under `--skip`, never
//! surfaces as an error; it is logged and excluded during the walk.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// No `.rs` files found in the target directory.
    #[error("no Rust source files found in {}", .0.display())]
    EmptyPackage(PathBuf),

    /// The requested type does not exist in the package.
    #[error("expected to find type {0}, found none")]
    TypeNotFound(String),

    /// The requested type is defined in more than one file.
    #[error("type {name} defined in {count} files, expected exactly one")]
    AmbiguousType { name: String, count: usize },

    /// The requested type exists but is not a named-field struct.
    #[error("expected {name} to be a struct with named fields, found {found}")]
    NotAStruct { name: String, found: String },

    /// A field kind the walker has no rule for, with `--skip` unset.
    #[error("{path}: unknown type {kind} to handle")]
    UnsupportedKind { path: String, kind: String },

    /// Map keys must be primitive; this aborts even under `--skip`.
    #[error("{path}: only primitive map key types are supported, got {kind}")]
    UnsupportedMapKey { path: String, kind: String },

    /// A type that (possibly through aliases and boxes) contains itself.
    /// Walking such a type would never terminate.
    #[error("recursive type {0} cannot be diffed")]
    RecursiveType(String),
}
