//! Machine profiles for hvnet.
//!
//! TOML on disk, merged with `HVNET_` environment variables, translated to
//! `hvnet_core::OrchestratorConfig` plus the machine's network declarations.
//! Nested keys in the environment use a double underscore, e.g.
//! `HVNET_DEFAULTS__GUEST_TIMEOUT=300`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hvnet_core::{NetworkDeclaration, OrchestratorConfig, VmSettings};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no machines configured")]
    NoMachines,

    #[error("machine '{name}' not found in config")]
    UnknownMachine { name: String, available: Vec<String> },

    #[error("several machines configured and no default_machine set")]
    AmbiguousMachine { available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Machine used when `--machine` is not given.
    pub default_machine: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub machines: BTreeMap<String, Machine>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Seconds to wait for guest network configuration.
    #[serde(default = "default_guest_timeout")]
    pub guest_timeout: u64,

    #[serde(default = "default_true")]
    pub install_managed_switches: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            guest_timeout: default_guest_timeout(),
            install_managed_switches: true,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_guest_timeout() -> u64 {
    hvnet_core::DEFAULT_GUEST_TIMEOUT.as_secs()
}
fn default_true() -> bool {
    true
}

/// One virtual machine and the networks attached to it.
#[derive(Debug, Default, Deserialize, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Machine {
    /// Hypervisor VM id.
    pub vm_id: String,

    /// Startup memory in MB.
    pub memory: Option<u64>,

    /// Dynamic memory ceiling in MB.
    pub maxmemory: Option<u64>,

    pub cpus: Option<u32>,

    /// Hyper-V automatic start action (`Nothing`, `StartIfRunning`, `Start`).
    pub auto_start_action: Option<String>,

    /// Hyper-V automatic stop action (`ShutDown`, `TurnOff`, `Save`).
    pub auto_stop_action: Option<String>,

    pub enable_checkpoints: Option<bool>,

    pub enable_automatic_checkpoints: Option<bool>,

    #[serde(default)]
    pub enable_virtualization_extensions: bool,

    #[serde(default)]
    pub enable_enhanced_session_mode: bool,

    /// Move guest networks to a non-public profile after configuring.
    #[serde(default)]
    pub set_work_network: bool,

    /// Override `defaults.guest_timeout`.
    pub guest_timeout: Option<u64>,

    /// Integration service name → enabled.
    #[serde(default)]
    pub vm_integration_services: BTreeMap<String, bool>,

    #[serde(default)]
    pub networks: Vec<NetworkDeclaration>,
}

/// A machine ready to hand to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSettings {
    pub name: String,
    pub config: OrchestratorConfig,
    pub networks: Vec<NetworkDeclaration>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "hvnet", "hvnet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hvnet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file yields
/// the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HVNET_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Machine resolution ──────────────────────────────────────────────

/// Pick a machine: explicit name, then `default_machine`, then the only
/// configured machine.
pub fn resolve_machine<'c>(
    cfg: &'c Config,
    name: Option<&str>,
) -> Result<(&'c str, &'c Machine), ConfigError> {
    let available = || cfg.machines.keys().cloned().collect::<Vec<_>>();

    let wanted = name.or(cfg.default_machine.as_deref());
    if let Some(wanted) = wanted {
        return cfg
            .machines
            .get_key_value(wanted)
            .map(|(k, m)| (k.as_str(), m))
            .ok_or_else(|| ConfigError::UnknownMachine {
                name: wanted.into(),
                available: available(),
            });
    }

    let mut machines = cfg.machines.iter();
    match (machines.next(), machines.next()) {
        (None, _) => Err(ConfigError::NoMachines),
        (Some((k, m)), None) => Ok((k.as_str(), m)),
        (Some(_), Some(_)) => Err(ConfigError::AmbiguousMachine {
            available: available(),
        }),
    }
}

/// Translate a machine profile into runtime configuration.
pub fn machine_to_settings(
    name: &str,
    machine: &Machine,
    defaults: &Defaults,
) -> Result<MachineSettings, ConfigError> {
    if machine.vm_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: format!("machines.{name}.vm_id"),
            reason: "must not be empty".into(),
        });
    }
    if machine.cpus == Some(0) {
        return Err(ConfigError::Validation {
            field: format!("machines.{name}.cpus"),
            reason: "must be at least 1".into(),
        });
    }
    if let (Some(memory), Some(max)) = (machine.memory, machine.maxmemory) {
        if max < memory {
            return Err(ConfigError::Validation {
                field: format!("machines.{name}.maxmemory"),
                reason: format!("{max} MB is below startup memory {memory} MB"),
            });
        }
    }

    let timeout = machine.guest_timeout.unwrap_or(defaults.guest_timeout);

    Ok(MachineSettings {
        name: name.into(),
        config: OrchestratorConfig {
            vm: VmSettings {
                vm_id: machine.vm_id.clone(),
                memory: machine.memory,
                max_memory: machine.maxmemory,
                cpus: machine.cpus,
                auto_start_action: machine.auto_start_action.clone(),
                auto_stop_action: machine.auto_stop_action.clone(),
                enable_checkpoints: machine.enable_checkpoints,
                enable_automatic_checkpoints: machine.enable_automatic_checkpoints,
                enable_virtualization_extensions: machine.enable_virtualization_extensions,
                enable_enhanced_session_mode: machine.enable_enhanced_session_mode,
                vm_integration_services: machine.vm_integration_services.clone(),
            },
            guest_timeout: Duration::from_secs(timeout),
            install_managed_switches: defaults.install_managed_switches,
            set_work_network: machine.set_work_network,
        },
        networks: machine.networks.clone(),
    })
}
