//! Config command implementations

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;

use crate::cli::ConfigCommand;
use crate::config::{self as app_config, AppConfig, RuntimeContext};
use crate::output::print_output;

/// Configuration after CLI and environment overrides
#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    config_path: PathBuf,
    settings_path: PathBuf,
    peer_url: &'a str,
    #[serde(flatten)]
    config: &'a AppConfig,
}

pub fn run(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => {
            println!("{}", ctx.config_path().display());
            Ok(())
        }
        ConfigCommand::Get { key: Some(key) } => {
            println!("{}", get_config_value(&ctx.config, &key)?);
            Ok(())
        }
        ConfigCommand::Get { key: None } => show(ctx),
        ConfigCommand::Reset => {
            app_config::write_default_config(ctx.config_path())?;
            println!(
                "Configuration reset to defaults at: {}",
                ctx.config_path().display()
            );
            Ok(())
        }
    }
}

fn show(ctx: &RuntimeContext) -> Result<()> {
    let effective = EffectiveConfig {
        config_path: ctx.config_path().to_path_buf(),
        settings_path: ctx.settings_path()?,
        peer_url: ctx.peer_url(),
        config: &ctx.config,
    };
    print_output(ctx, &effective)
}

/// Look up a dot-separated key, e.g. `deadbolt.interval`
fn get_config_value(config: &AppConfig, key: &str) -> Result<String> {
    let json = serde_json::to_value(config)?;

    let value = key
        .split('.')
        .try_fold(&json, |current, part| current.get(part))
        .ok_or_else(|| anyhow!("Configuration key not found: {key}"))?;

    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other)?,
    })
}
