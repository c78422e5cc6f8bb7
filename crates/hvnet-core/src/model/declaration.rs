// ── Network declarations ──
//
// What the machine definition asks for. Read once per configuration pass
// and never mutated by the pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The declared network family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeclarationKind {
    /// Bridged to a physical network through an external switch.
    #[serde(alias = "public_network")]
    #[strum(to_string = "public", serialize = "public_network")]
    Public,
    /// Host-only network.
    #[serde(alias = "private_network")]
    #[strum(to_string = "private", serialize = "private_network")]
    Private,
    /// Shared between guests, invisible to the host.
    #[serde(alias = "internal_network")]
    #[strum(to_string = "internal", serialize = "internal_network")]
    Internal,
}

/// One logical network attached to a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct NetworkDeclaration {
    pub kind: DeclarationKind,

    /// Switch name or id for public networks.
    #[serde(default)]
    pub bridge: Option<String>,

    /// Turns a private network into a guest-only internal network.
    #[serde(default)]
    pub intnet: bool,

    #[serde(default)]
    pub dhcp: bool,

    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default)]
    pub netmask: Option<String>,

    #[serde(default)]
    pub mac: Option<String>,

    #[serde(default)]
    pub nic_type: Option<String>,

    /// Host-only interface name, used to find an address for DHCP networks.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub adapter_ip: Option<String>,

    #[serde(default)]
    pub dhcp_ip: Option<String>,

    #[serde(default)]
    pub dhcp_lower: Option<String>,

    #[serde(default)]
    pub dhcp_upper: Option<String>,

    #[serde(default = "default_auto_config")]
    pub auto_config: bool,

    /// Ask the host to run a DHCP server for this network.
    #[serde(default)]
    pub dhcp_server: bool,
}

fn default_auto_config() -> bool {
    true
}

impl NetworkDeclaration {
    /// A bare declaration of the given kind; everything else defaulted.
    pub fn new(kind: DeclarationKind) -> Self {
        Self {
            kind,
            bridge: None,
            intnet: false,
            dhcp: false,
            ip: None,
            netmask: None,
            mac: None,
            nic_type: None,
            name: None,
            adapter_ip: None,
            dhcp_ip: None,
            dhcp_lower: None,
            dhcp_upper: None,
            auto_config: true,
            dhcp_server: false,
        }
    }

    /// Static host-only network.
    pub fn private_static(ip: impl Into<String>, netmask: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            netmask: Some(netmask.into()),
            ..Self::new(DeclarationKind::Private)
        }
    }

    /// DHCP host-only network.
    pub fn private_dhcp() -> Self {
        Self {
            dhcp: true,
            ..Self::new(DeclarationKind::Private)
        }
    }

    /// Bridged network, optionally pinned to a switch name or id.
    pub fn public(bridge: Option<&str>) -> Self {
        Self {
            bridge: bridge.map(str::to_owned),
            dhcp: true,
            ..Self::new(DeclarationKind::Public)
        }
    }

    /// A DHCP network also counts as one when no address was given at all.
    pub fn wants_dhcp(&self) -> bool {
        self.dhcp || self.ip.is_none()
    }

    /// Short label used in logs and error messages.
    pub fn label(&self) -> String {
        match (&self.name, &self.ip) {
            (Some(name), _) => format!("{} network '{name}'", self.kind),
            (None, Some(ip)) => format!("{} network {ip}", self.kind),
            (None, None) => format!("{} network", self.kind),
        }
    }
}
