//! adsm adm command

use super::{load_model, print_errors};
use clap::Args;
use objmodel::{Aggregate, SecurityModel};
use shared::LoaderConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct AdmCommand {
    /// Security model file
    pub model: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AdmCommand {
    pub fn run(&self, config: LoaderConfig) -> anyhow::Result<()> {
        let loaded = load_model(&self.model, config)?;
        print_errors(&loaded.errors);
        println!("{}", self.render(&loaded.object)?);
        Ok(())
    }

    /// Flattened qualified-path -> pointer mapping of the whole model
    pub fn render(&self, model: &SecurityModel) -> anyhow::Result<String> {
        let pointers = model.decision_model_pointers();
        if self.json {
            return Ok(serde_json::to_string_pretty(&pointers)?);
        }
        Ok(render_text(&pointers))
    }
}

fn render_text(pointers: &Aggregate) -> String {
    let mut out = String::new();
    for (key, paths) in pointers {
        out.push_str(key);
        out.push('\n');
        for path in paths {
            out.push_str(&format!("  - {path}\n"));
        }
    }
    out
}
