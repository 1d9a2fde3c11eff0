use std::path::Path;

use crate::cli::context::CliContext;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use iframe_resizer::Config;
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::info;

use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Get one value, e.g. `reacquire.interval`
    Get {
        /// Dotted configuration key
        key: String,
    },

    /// Set one value in the configuration file
    Set {
        /// Dotted configuration key
        key: String,

        /// New value (JSON literal or plain string)
        value: String,
    },

    /// Check that the configuration file parses
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => match ctx.output() {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ctx.config())?),
            _ => {
                println!("# effective configuration ({})", path.display());
                print!("{}", serde_yaml::to_string(ctx.config())?);
            }
        },
        ConfigAction::Get { key } => {
            let doc = serde_json::to_value(ctx.config())?;
            match doc.pointer(&json_pointer(&key)?) {
                Some(value) => print!("{}", serde_yaml::to_string(value)?),
                None => bail!("{} not found in configuration", key),
            }
        }
        ConfigAction::Set { key, value } => {
            let config = read_config_file(path).await?;
            let updated = with_value(&config, &key, parse_cli_value(&value))?;
            write_config_file(path, &updated).await?;
            info!(%key, "configuration updated");
            println!("Saved configuration to {}", path.display());
        }
        ConfigAction::Validate => {
            if fs::try_exists(path).await? {
                read_config_file(path).await?;
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
    }

    Ok(())
}

async fn read_config_file(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await? {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn write_config_file(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, serde_yaml::to_string(config)?)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

/// Replaces one leaf of `config`; the result must still be a valid configuration.
fn with_value(config: &Config, key: &str, value: JsonValue) -> Result<Config> {
    let mut doc = serde_json::to_value(config)?;
    let pointer = json_pointer(key)?;
    let (parent, leaf) = pointer.rsplit_once('/').unwrap_or(("", pointer.as_str()));
    let Some(JsonValue::Object(section)) = doc.pointer_mut(parent) else {
        bail!("{} does not name a configuration section", key);
    };
    section.insert(leaf.to_string(), value);
    serde_json::from_value(doc).with_context(|| format!("invalid value for {}", key))
}

fn json_pointer(key: &str) -> Result<String> {
    let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments.iter().map(|s| format!("/{s}")).collect())
}

fn parse_cli_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}
