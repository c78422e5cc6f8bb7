//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use hvnet_config::ConfigError;
use hvnet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Switches ─────────────────────────────────────────────────────
    #[error("No virtual switches are available on the host")]
    #[diagnostic(
        code(hvnet::no_switches),
        help("Create a switch with New-VMSwitch, or check that the Hyper-V role is enabled.")
    )]
    NoSwitches,

    #[error("A public network was requested but no external switch exists")]
    #[diagnostic(
        code(hvnet::no_external_switches),
        help("Create an external switch bound to a physical adapter, or drop the public network.")
    )]
    NoExternalSwitches,

    #[error("Several external switches match: {candidates}")]
    #[diagnostic(
        code(hvnet::selection_required),
        help("Set `bridge` on the network, or pass --yes to take the first switch.")
    )]
    SelectionRequired { candidates: String },

    #[error("{0}")]
    #[diagnostic(code(hvnet::switch_not_found))]
    SwitchNotFound(String),

    // ── Addressing ───────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(
        code(hvnet::address),
        help("Pick a subnet that no host interface or Hyper-V network already uses.")
    )]
    Address(String),

    // ── Provider capabilities ────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(hvnet::unsupported))]
    Unsupported(String),

    // ── Collaborators ────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(hvnet::driver))]
    Driver(String),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Machine '{name}' not found in configuration")]
    #[diagnostic(code(hvnet::machine_not_found), help("Available machines: {available}"))]
    MachineNotFound { name: String, available: String },

    #[error("No machine selected")]
    #[diagnostic(
        code(hvnet::no_machine),
        help(
            "Pass --machine, set default_machine, or add a [machines.<name>] table.\n\
             Config: {path}"
        )
    )]
    NoMachine { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hvnet::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(hvnet::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("Could not read {path}: {source}")]
    #[diagnostic(code(hvnet::io))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write {path}: {source}")]
    #[diagnostic(code(hvnet::io))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    #[diagnostic(code(hvnet::json), help("Check the file contents and try again."))]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Internal error: {0}")]
    #[diagnostic(code(hvnet::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoSwitches
            | Self::NoExternalSwitches
            | Self::SwitchNotFound(_)
            | Self::MachineNotFound { .. }
            | Self::NoMachine { .. } => exit_code::NOT_FOUND,
            Self::SelectionRequired { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::Address(_) => exit_code::CONFLICT,
            Self::Unsupported(_) => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoSwitches => Self::NoSwitches,
            CoreError::NoExternalSwitches => Self::NoExternalSwitches,
            CoreError::SwitchSelectionRequired { candidates } => Self::SelectionRequired {
                candidates: candidates.join(", "),
            },
            e @ CoreError::SwitchNotFound { .. } => Self::SwitchNotFound(e.to_string()),
            e @ (CoreError::AddressInvalid { .. }
            | CoreError::NetworkCollision { .. }
            | CoreError::ReservedSubnet { .. }) => Self::Address(e.to_string()),
            e @ (CoreError::DhcpNotSupported { .. }
            | CoreError::CantReadMacAddresses { .. }
            | CoreError::UnsupportedNetworkType { .. }) => Self::Unsupported(e.to_string()),
            e @ (CoreError::Driver { .. } | CoreError::Guest { .. }) => Self::Driver(e.to_string()),
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownMachine { name, available } => Self::MachineNotFound {
                name,
                available: available.join(", "),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}
