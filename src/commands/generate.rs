//! Driver: load -> resolve -> walk -> fold -> render -> write.
//!
//! One-shot batch execution. The generated module is rendered fully in
//! memory before the output file is created, so a fatal condition never
//! leaves partial output behind.

use crate::codegen;
use crate::resolver;
use crate::tree::Comparisons;
use crate::walker::{WalkOptions, Walker};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Directory holding the package to analyze.
    pub path: PathBuf,
    /// Struct to generate the comparison function for.
    pub type_name: String,
    /// Skip unknown field kinds instead of failing.
    pub skip: bool,
    /// Include exported methods as always-added records.
    pub methods: bool,
    /// Output file; `None` derives `<lowercase-type>_diffgen.rs`. Any given
    /// value, a literal `-` included, is created as a real file.
    pub output: Option<PathBuf>,
    /// Command-line arguments echoed into the generated header.
    pub invocation: String,
}

pub fn generate(config: GenerateConfig) -> Result<()> {
    let package = resolver::load_package(&config.path)?;
    let target = package.resolve_struct(&config.type_name)?;

    let walked = Walker::new(WalkOptions {
        skip_unknown: config.skip,
        include_methods: config.methods,
    })
    .walk(&target)?;
    log::debug!(
        "{}: {} comparison paths, features {:?}",
        config.type_name,
        walked.paths.len(),
        walked.features
    );

    let mut comparisons = Comparisons::new();
    for path in &walked.paths {
        comparisons.add(path);
    }

    let module = codegen::render_module(
        &config.invocation,
        &config.type_name,
        &comparisons,
        walked.features,
        config.methods,
    )?;

    let output = config
        .output
        .unwrap_or_else(|| default_output_name(&config.type_name));
    fs::write(&output, module)
        .with_context(|| format!("could not create file {}", output.display()))?;

    Ok(())
}

fn default_output_name(type_name: &str) -> PathBuf {
    PathBuf::from(format!("{}_diffgen.rs", type_name.to_lowercase()))
}
