use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use iframe_resizer::Config;
use resizer_core_types::SelectionRecord;
use resizer_selection_store::{FileStorage, SelectionStore};
use tracing::info;

use super::context::CliContext;
use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct SlotArgs {
    /// Session slot file (defaults to `storage.path` from the configuration)
    #[arg(long, value_name = "FILE")]
    pub storage: Option<PathBuf>,
}

impl SlotArgs {
    pub fn open(&self, config: &Config) -> (PathBuf, SelectionStore) {
        let path = self
            .storage
            .clone()
            .unwrap_or_else(|| config.storage.resolved_path());
        let store = SelectionStore::new(Arc::new(FileStorage::new(path.clone())));
        (path, store)
    }
}

pub fn cmd_show(args: SlotArgs, ctx: &CliContext) -> Result<()> {
    let (path, store) = args.open(ctx.config());
    let record = store.load();
    match ctx.output() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&record)?),
        OutputFormat::Human => match &record {
            Some(record) => println!("{}", describe_record(record)),
            None => println!("No selection stored in {}", path.display()),
        },
    }
    Ok(())
}

pub fn cmd_discard(args: SlotArgs, ctx: &CliContext) -> Result<()> {
    let (path, store) = args.open(ctx.config());
    let existed = store.load().is_some();
    store.clear()?;
    info!(path = %path.display(), existed, "selection slot cleared");
    if existed {
        println!("Discarded selection stored in {}", path.display());
    } else {
        println!("No selection stored in {}", path.display());
    }
    Ok(())
}

/// One-line summary used by the human output format.
pub fn describe_record(record: &SelectionRecord) -> String {
    let mode = if record.full_view_on {
        "full view".to_string()
    } else {
        format!("{}vw x {}vh", record.width, record.height)
    };
    format!(
        "{} at {} ({}, z-index {})",
        record.name, record.locator, mode, record.z_index
    )
}
