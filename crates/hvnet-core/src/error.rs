// ── Core error types ──
//
// Errors raised by the resolution and correlation pipeline. Driver and
// guest channel implementations report their own failures through the
// `Driver` / `Guest` variants; everything else is a domain condition.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Switch inventory ─────────────────────────────────────────────
    #[error("No virtual switches are available on the host")]
    NoSwitches,

    #[error("A public network was requested but no external switch exists")]
    NoExternalSwitches,

    #[error("No switch of type '{switch_type}' found for {network}")]
    SwitchNotFound {
        switch_type: String,
        network: String,
    },

    #[error("Several external switches match; an interactive selection is required")]
    SwitchSelectionRequired { candidates: Vec<String> },

    // ── Address planning ─────────────────────────────────────────────
    #[error("Invalid address {ip}/{netmask}: {message}")]
    AddressInvalid {
        ip: String,
        netmask: String,
        message: String,
    },

    #[error("Network {network} collides with interface '{interface}' ({interface_network})")]
    NetworkCollision {
        network: String,
        interface: String,
        interface_network: String,
    },

    #[error("Address {ip} falls inside reserved subnet(s): {}", ranges.join(", "))]
    ReservedSubnet { ip: String, ranges: Vec<String> },

    #[error("DHCP server provisioning is not supported by the {provider} provider")]
    DhcpNotSupported { provider: String },

    // ── Guest correlation ────────────────────────────────────────────
    #[error("The {provider} provider cannot report network adapter MAC addresses")]
    CantReadMacAddresses { provider: String },

    #[error("{network_type} network type is not supported, try static or dhcp")]
    UnsupportedNetworkType { network_type: String },

    // ── Collaborators ────────────────────────────────────────────────
    #[error("Hypervisor operation '{operation}' failed: {message}")]
    Driver { operation: String, message: String },

    #[error("Guest command failed: {message}")]
    Guest { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this error only invalidates the network it was raised for.
    ///
    /// Network-scoped failures are collected into the plan and the pass
    /// carries on; anything else aborts the whole configuration pass.
    pub fn is_network_scoped(&self) -> bool {
        matches!(
            self,
            Self::AddressInvalid { .. }
                | Self::NetworkCollision { .. }
                | Self::ReservedSubnet { .. }
                | Self::SwitchNotFound { .. }
        )
    }

    pub fn driver(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::Driver {
            operation: operation.to_owned(),
            message: err.to_string(),
        }
    }
}
