//! Type-tree walker.
//!
//! Flattens a resolved [`Aggregate`] into the list of leaf comparison
//! paths. A path is an ordered token sequence mixing field names with the
//! structural markers `[pointer]`, `[slice]`, `[map]`, and `[method]`.
//! Every path terminates either in a plain field name (a comparable leaf)
//! or in the two-token suffix `[method]`, name.
//!
//! The walk is a pure depth-first descent in declaration order, which fixes
//! the emission order of the generated code. Each recursive branch owns its
//! own prefix vector; siblings never share backing storage.

use crate::errors::GenerateError;
use crate::resolver::{Aggregate, TypeDesc};
use anyhow::Result;

pub const POINTER: &str = "[pointer]";
pub const SLICE: &str = "[slice]";
pub const MAP: &str = "[map]";
pub const METHOD: &str = "[method]";

pub fn is_marker(token: &str) -> bool {
    token.starts_with('[')
}

/// Capabilities the walked type actually uses, reported alongside the path
/// list so the driver can derive what the generated file needs without any
/// shared mutable state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub uses_map: bool,
    pub uses_slice: bool,
    /// A map or slice whose element is itself decomposed, requiring the
    /// runtime-carried path prefix inside the generated loop.
    pub nested_loops: bool,
    pub has_methods: bool,
}

#[derive(Debug)]
pub struct WalkResult {
    pub paths: Vec<Vec<String>>,
    pub features: Features,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Log and drop unknown field kinds instead of failing.
    pub skip_unknown: bool,
    /// Emit `[method]` paths for exported methods behind pointers.
    pub include_methods: bool,
}

pub struct Walker {
    options: WalkOptions,
    features: Features,
}

impl Walker {
    pub fn new(options: WalkOptions) -> Self {
        Self {
            options,
            features: Features::default(),
        }
    }

    /// Walks the root aggregate, returning every leaf path in declaration
    /// order together with the feature descriptor.
    pub fn walk(mut self, root: &Aggregate) -> Result<WalkResult> {
        let paths = self.walk_aggregate(&[], root)?;
        Ok(WalkResult {
            paths,
            features: self.features,
        })
    }

    fn walk_aggregate(&mut self, prefix: &[String], aggregate: &Aggregate) -> Result<Vec<Vec<String>>> {
        let mut paths = Vec::new();
        for field in &aggregate.fields {
            let mut field_prefix = prefix.to_vec();
            field_prefix.push(field.name.clone());
            paths.extend(self.walk_type(field_prefix, &field.desc)?);
        }
        Ok(paths)
    }

    fn walk_type(&mut self, prefix: Vec<String>, desc: &TypeDesc) -> Result<Vec<Vec<String>>> {
        match desc {
            TypeDesc::Scalar | TypeDesc::Opaque => Ok(vec![prefix]),
            TypeDesc::Pointer(pointee) => self.walk_pointer(prefix, pointee),
            TypeDesc::Aggregate(aggregate) => self.walk_aggregate(&prefix, aggregate),
            TypeDesc::Sequence(element) => {
                self.features.uses_slice = true;
                let mut elem_prefix = prefix;
                elem_prefix.push(SLICE.to_string());
                let depth = elem_prefix.len();
                let paths = self.walk_type(elem_prefix, element)?;
                self.note_loop_nesting(&paths, depth);
                Ok(paths)
            }
            TypeDesc::Mapping { key, value } => {
                // Non-primitive keys abort even under skip mode.
                if !matches!(key.as_ref(), TypeDesc::Scalar) {
                    return Err(GenerateError::UnsupportedMapKey {
                        path: prefix.join("."),
                        kind: format!("{key:?}"),
                    }
                    .into());
                }
                self.features.uses_map = true;
                let mut value_prefix = prefix;
                value_prefix.push(MAP.to_string());
                let depth = value_prefix.len();
                let paths = self.walk_type(value_prefix, value)?;
                self.note_loop_nesting(&paths, depth);
                Ok(paths)
            }
            TypeDesc::Ignored => Ok(Vec::new()),
            TypeDesc::Unknown(kind) => {
                if self.options.skip_unknown {
                    log::warn!("{} (skipping: {kind})", prefix.join("."));
                    return Ok(Vec::new());
                }
                Err(GenerateError::UnsupportedKind {
                    path: prefix.join("."),
                    kind: kind.clone(),
                }
                .into())
            }
        }
    }

    fn walk_pointer(&mut self, prefix: Vec<String>, pointee: &TypeDesc) -> Result<Vec<Vec<String>>> {
        let mut pointee_prefix = prefix.clone();
        pointee_prefix.push(POINTER.to_string());
        let mut paths = self.walk_type(pointee_prefix, pointee)?;

        if self.options.include_methods {
            if let TypeDesc::Aggregate(aggregate) = pointee {
                for method in &aggregate.methods {
                    self.features.has_methods = true;
                    let mut method_path = prefix.clone();
                    method_path.push(METHOD.to_string());
                    method_path.push(method.clone());
                    paths.push(method_path);
                }
            }
        }

        Ok(paths)
    }

    /// A loop element that contributed paths extending past the marker
    /// itself means the generated loop body recurses and needs the runtime
    /// prefix accumulator.
    fn note_loop_nesting(&mut self, paths: &[Vec<String>], marker_depth: usize) {
        if paths.iter().any(|path| path.len() > marker_depth) {
            self.features.nested_loops = true;
        }
    }
}
