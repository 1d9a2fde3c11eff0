use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use iframe_resizer::scenario::{Scenario, ScenarioRunner, StepReport};
use iframe_resizer::AgentConfig;
use resizer_selection_store::{FileStorage, SelectionStore};
use tokio::fs;
use tracing::info;

use super::context::CliContext;
use super::output::OutputFormat;
use super::session::describe_record;

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML)
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Persist the session slot in this file instead of memory
    #[arg(long, value_name = "FILE")]
    pub storage: Option<PathBuf>,

    /// Clear the session slot before replaying
    #[arg(long)]
    pub fresh: bool,
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext) -> Result<()> {
    let raw = fs::read_to_string(&args.scenario)
        .await
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario = Scenario::from_yaml(&raw)
        .with_context(|| format!("parsing {}", args.scenario.display()))?;

    let store = match &args.storage {
        Some(path) => SelectionStore::new(Arc::new(FileStorage::new(path.clone()))),
        None => SelectionStore::in_memory(),
    };
    if args.fresh {
        store.clear().context("clearing session slot")?;
    }

    info!(
        scenario = %args.scenario.display(),
        steps = scenario.steps.len(),
        "replaying scenario"
    );
    let mut runner = ScenarioRunner::new(scenario.page, AgentConfig::from(ctx.config()), store)?;
    let mut reports = vec![runner.report(0, "load")];
    reports.extend(runner.run(&scenario.steps)?);

    match ctx.output() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&reports)?),
        OutputFormat::Human => reports.iter().for_each(print_report),
    }
    Ok(())
}

fn print_report(report: &StepReport) {
    println!(
        "[{}] {} @ {:.3}s",
        report.step,
        report.action,
        report.elapsed_ms as f64 / 1000.0
    );

    let popup = &report.popup;
    if popup.has_selection() {
        println!(
            "  popup: {} ({} x {}, full view {})",
            popup.legend,
            popup.width.unwrap_or_default(),
            popup.height.unwrap_or_default(),
            if popup.full_view_on { "on" } else { "off" }
        );
    } else if popup.end_selection_visible {
        println!("  popup: awaiting selection");
    } else {
        println!("  popup: {} (nothing selected)", popup.legend);
    }

    match &report.record {
        Some(record) => println!("  record: {}", describe_record(record)),
        None => println!("  record: none"),
    }
    for alert in &report.alerts {
        println!("  alert: {alert}");
    }
    for frame in &report.frames {
        println!(
            "  frame {} ({}): {}",
            frame.index,
            frame.name,
            frame.style.as_deref().unwrap_or("<no inline style>")
        );
    }
}
