// ── Post-boot adapter and interface types ──
//
// Two address spaces meet here: hypervisor adapter numbers and guest OS
// interface indices. The MAC address is the only shared key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::mac::MacAddress;
use super::network::{ConfigType, NetworkConfig, NetworkKind};

/// Adapter reference → MAC, as reported by the hypervisor driver.
pub type HostMacTable = BTreeMap<String, MacAddress>;

/// Adapter reference → guest interface, built by MAC correlation.
pub type InterfaceMap = BTreeMap<String, GuestInterface>;

/// Adapter type reported for an empty slot.
pub const ADAPTER_TYPE_NONE: &str = "none";

/// One row of `get_vm_network_adapters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveAdapter {
    #[serde(alias = "Number")]
    pub number: u32,
    #[serde(rename = "type", alias = "Type")]
    pub adapter_type: String,
    #[serde(default, alias = "SwitchId")]
    pub switch_id: Option<String>,
}

impl LiveAdapter {
    pub fn is_active(&self) -> bool {
        !self.adapter_type.eq_ignore_ascii_case(ADAPTER_TYPE_NONE)
    }
}

/// A declared adapter slot bound to a compact guest interface number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceBinding {
    pub adapter_slot: u32,
    pub interface_number: u32,
    pub network_kind: NetworkKind,
    pub network_config: Option<NetworkConfig>,
}

impl InterfaceBinding {
    /// The request handed to the guest capability for this interface.
    pub fn to_request(&self) -> NetworkRequest {
        let interface = self.interface_number.to_string();
        match &self.network_config {
            Some(cfg) => NetworkRequest {
                interface,
                request_type: cfg.config_type,
                ip: Some(cfg.ip.to_string()),
                netmask: Some(cfg.netmask.to_string()),
            },
            None => NetworkRequest::dhcp(interface),
        }
    }
}

/// Guest capability input: configure one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub interface: String,
    #[serde(rename = "type")]
    pub request_type: ConfigType,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub netmask: Option<String>,
}

impl NetworkRequest {
    pub fn dhcp(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            request_type: ConfigType::Dhcp,
            ip: None,
            netmask: None,
        }
    }

    pub fn static_ip(
        interface: impl Into<String>,
        ip: impl Into<String>,
        netmask: impl Into<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            request_type: ConfigType::Static,
            ip: Some(ip.into()),
            netmask: Some(netmask.into()),
        }
    }
}

/// A network adapter enumerated inside the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestNic {
    pub mac_address: String,
    /// Connection name (e.g. `Ethernet 2`). Absent for virtual-only adapters.
    #[serde(default)]
    pub net_connection_id: Option<String>,
    pub interface_index: u32,
    pub index: u32,
}

/// A guest adapter that correlated with a hypervisor adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestInterface {
    pub net_connection_id: String,
    pub mac_address: MacAddress,
    pub interface_index: u32,
    pub index: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::network::Netmask;

    #[test]
    fn none_typed_adapters_are_inactive() {
        let adapter: LiveAdapter =
            serde_json::from_str(r#"{"Number": 3, "Type": "None"}"#).unwrap();
        assert!(!adapter.is_active());
        assert!(adapter.switch_id.is_none());
    }

    #[test]
    fn binding_without_config_requests_dhcp() {
        let binding = InterfaceBinding {
            adapter_slot: 2,
            interface_number: 1,
            network_kind: NetworkKind::Bridged,
            network_config: None,
        };
        assert_eq!(binding.to_request(), NetworkRequest::dhcp("1"));
    }

    #[test]
    fn binding_with_config_carries_address() {
        let binding = InterfaceBinding {
            adapter_slot: 3,
            interface_number: 2,
            network_kind: NetworkKind::Hostonly,
            network_config: Some(NetworkConfig {
                config_type: ConfigType::Static,
                adapter_ip: "10.1.0.1".parse().unwrap(),
                ip: "10.1.0.7".parse().unwrap(),
                netmask: Netmask::V4("255.255.0.0".parse().unwrap()),
                dhcp: None,
                auto_config: true,
            }),
        };
        assert_eq!(
            binding.to_request(),
            NetworkRequest::static_ip("2", "10.1.0.7", "255.255.0.0")
        );
    }
}
