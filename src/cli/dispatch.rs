use super::config::cmd_config;
use super::env::CliArgs;
use super::session::{cmd_discard, cmd_show};
use super::simulate::cmd_simulate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Simulate(args) => cmd_simulate(args, ctx).await,
        Commands::Show(args) => cmd_show(args, ctx),
        Commands::Discard(args) => cmd_discard(args, ctx),
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
