use clap::Subcommand;

use super::config::ConfigArgs;
use super::session::SlotArgs;
use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Replay a scripted session against an in-memory page
    Simulate(SimulateArgs),

    /// Print the persisted selection record
    Show(SlotArgs),

    /// Delete the persisted selection record
    Discard(SlotArgs),

    /// Inspect or edit the configuration
    Config(ConfigArgs),
}
