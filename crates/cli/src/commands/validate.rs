//! adsm validate command

use super::{load_model, print_errors};
use clap::Args;
use console::style;
use shared::LoaderConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Security model file
    pub model: PathBuf,
}

impl ValidateCommand {
    pub fn run(&self, config: LoaderConfig) -> anyhow::Result<()> {
        let loaded = load_model(&self.model, config)?;

        if loaded.is_clean() {
            println!(
                "{} '{}' resolved without errors",
                style("✓").green(),
                loaded.object.title()
            );
            return Ok(());
        }

        print_errors(&loaded.errors);
        anyhow::bail!(
            "{} error(s) in {}",
            loaded.errors.len(),
            self.model.display()
        )
    }
}
