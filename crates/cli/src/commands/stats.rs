//! adsm stats command

use super::{load_model, print_errors};
use clap::Args;
use console::style;
use objmodel::{Aggregate, ModelObject, SecurityModel};
use shared::LoaderConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Security model file
    pub model: PathBuf,
}

impl StatsCommand {
    pub fn run(&self, config: LoaderConfig) -> anyhow::Result<()> {
        let loaded = load_model(&self.model, config)?;
        print_errors(&loaded.errors);

        println!("{}", style(loaded.object.title()).bold());
        print!("{}", render(&loaded.object));
        Ok(())
    }
}

/// Members of the model, one block each, with their pointer paths
///
/// Paths are listed as stored; the files are never opened.
pub fn render(model: &SecurityModel) -> String {
    let mut out = String::new();

    for ext in model.externals().values() {
        block(&mut out, "External Entity", ext.name(), ext.description(), None);
    }

    for entity in model.entities().values().filter(|e| !e.is_role()) {
        let pointers = entity.decision_model_pointers();
        block(&mut out, "Entity", entity.name(), entity.description(), Some(&pointers));
    }

    for role in model.roles() {
        let pointers = role.decision_model_pointers();
        block(&mut out, "Role", role.name(), role.description(), Some(&pointers));
    }

    for flow in model.flows().values() {
        let pointers = flow.decision_model_pointers();
        block(&mut out, "Flow", flow.name(), flow.description(), Some(&pointers));
    }

    out
}

fn block(out: &mut String, label: &str, name: &str, description: &str, pointers: Option<&Aggregate>) {
    let indent = " ".repeat(label.len() + 2);
    out.push_str(&format!("\t{label}: {name}\n"));
    out.push_str(&format!("\t{indent}{description}\n"));

    for path in pointers.into_iter().flat_map(|p| p.values().flatten()) {
        out.push_str(&format!("\t{indent}ADM: {path}\n"));
    }
}
