//! CLI Commands

pub mod adm;
pub mod stats;
pub mod validate;

pub use adm::AdmCommand;
pub use stats::StatsCommand;
pub use validate::ValidateCommand;

use anyhow::Context;
use console::style;
use loaders::{Loaded, Loader};
use objmodel::SecurityModel;
use shared::{LoaderConfig, ModelError};
use std::path::Path;
use tracing::debug;

/// Read and build a security model file
///
/// Decision-model pointers in the file are taken relative to the directory
/// holding it.
pub fn load_model(path: &Path, config: LoaderConfig) -> anyhow::Result<Loaded<SecurityModel>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let adm_dir = path
        .parent()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(path = %path.display(), adm_dir = %adm_dir, "Loading model");

    let mut loader = Loader::with_config(config);
    loader
        .load_security_model(&text, &adm_dir)
        .with_context(|| format!("Failed to load {}", path.display()))
}

/// Print accumulated errors to stderr
pub fn print_errors(errors: &[ModelError]) {
    for err in errors {
        eprintln!("{} {}", style("ERROR:").red().bold(), err);
    }
}
