//! CLI configuration -- thin wrapper around `hvnet_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--config, --machine, --output, --color).

use std::path::PathBuf;

use clap::ValueEnum;

use hvnet_config::ConfigError;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use hvnet_config::{Config, MachineSettings};

/// Config file in effect: `--config`, else the platform location.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(hvnet_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(hvnet_config::load_config_from(&active_config_path(global))?)
}

/// Resolve the selected machine and translate it for the core.
pub fn active_machine(global: &GlobalOpts, cfg: &Config) -> Result<MachineSettings, CliError> {
    let (name, machine) = match hvnet_config::resolve_machine(cfg, global.machine.as_deref()) {
        Ok(found) => found,
        Err(ConfigError::NoMachines | ConfigError::AmbiguousMachine { .. }) => {
            return Err(CliError::NoMachine {
                path: active_config_path(global).display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    Ok(hvnet_config::machine_to_settings(name, machine, &cfg.defaults)?)
}

/// `--output` if given, else `defaults.output`, else table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> ColorMode {
    global
        .color
        .or_else(|| ColorMode::from_str(&cfg.defaults.color, true).ok())
        .unwrap_or(ColorMode::Auto)
}
