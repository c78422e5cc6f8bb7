// ── Resolved network domain types ──
//
// Output of the pre-boot phase: which switch each declaration attaches to,
// at which adapter slot, and the address plan the guest should apply.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::mac::MacAddress;
use crate::error::CoreError;

/// Slot of the NAT/management adapter. Declared networks start after it.
pub const MANAGEMENT_SLOT: u32 = 1;

/// How an adapter reaches the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NetworkKind {
    /// Host-only, backed by an `internal` switch.
    Hostonly,
    /// Bridged, backed by an `external` switch.
    Bridged,
    /// Guest-only, backed by a `private` switch.
    Internal,
}

/// Address configuration type. IPv6 variants carry the `6` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ConfigType {
    Static,
    Dhcp,
    Static6,
    Dhcp6,
}

impl ConfigType {
    pub fn for_family(dhcp: bool, ipv6: bool) -> Self {
        match (dhcp, ipv6) {
            (false, false) => Self::Static,
            (true, false) => Self::Dhcp,
            (false, true) => Self::Static6,
            (true, true) => Self::Dhcp6,
        }
    }

    pub fn is_dhcp(self) -> bool {
        matches!(self, Self::Dhcp | Self::Dhcp6)
    }
}

/// IPv4 dotted mask or IPv6 prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Netmask {
    V4(Ipv4Addr),
    Prefix(u8),
}

impl Netmask {
    /// Prefix length, counting leading one bits for a dotted mask.
    pub fn prefix_len(self) -> u8 {
        match self {
            // at most 32 leading ones, always fits
            #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
            Self::V4(mask) => u32::from(mask).leading_ones() as u8,
            Self::Prefix(len) => len,
        }
    }
}

impl fmt::Display for Netmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(mask) => write!(f, "{mask}"),
            Self::Prefix(len) => write!(f, "{len}"),
        }
    }
}

impl From<Netmask> for String {
    fn from(value: Netmask) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Netmask {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Ok(mask) = value.parse::<Ipv4Addr>() {
            return Ok(Self::V4(mask));
        }
        value
            .trim_start_matches('/')
            .parse::<u8>()
            .map(Self::Prefix)
            .map_err(|e| format!("invalid netmask '{value}': {e}"))
    }
}

/// DHCP server address and lease bounds for a host-only network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpRange {
    pub server: IpAddr,
    pub lower: IpAddr,
    pub upper: IpAddr,
}

/// Fully computed address plan. Carries no switch identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    /// Host side address of the network (first usable address by default).
    pub adapter_ip: IpAddr,
    /// Guest address.
    pub ip: IpAddr,
    pub netmask: Netmask,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp: Option<DhcpRange>,
    pub auto_config: bool,
}

/// One adapter to attach to the VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAdapterConfig {
    pub adapter_slot: u32,
    pub switch_id: String,
    pub switch_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nic_type: Option<String>,
    pub network_kind: NetworkKind,
}

/// A declaration that resolved to a switch, with its address plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNetwork {
    /// Position of the source declaration.
    pub declaration_index: usize,
    pub adapter: ResolvedAdapterConfig,
    /// `None` for bridged DHCP networks, whose addressing is external.
    pub config: Option<NetworkConfig>,
}

/// A declaration that could not be resolved. Only that network is dropped.
#[derive(Debug)]
pub struct NetworkFailure {
    pub declaration_index: usize,
    pub label: String,
    pub error: CoreError,
}

/// Result of a resolution pass.
#[derive(Debug, Default)]
pub struct SwitchPlan {
    /// Managed NAT switch for the management adapter, if one exists.
    pub default_switch: Option<String>,
    pub networks: Vec<ResolvedNetwork>,
    pub failures: Vec<NetworkFailure>,
}

impl SwitchPlan {
    /// Switch ids for the declared adapters, in slot order.
    pub fn additional_switches(&self) -> Vec<String> {
        let mut networks: Vec<&ResolvedNetwork> = self.networks.iter().collect();
        networks.sort_by_key(|n| n.adapter.adapter_slot);
        networks
            .into_iter()
            .map(|n| n.adapter.switch_id.clone())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn netmask_prefix_len() {
        let mask = Netmask::try_from("255.255.248.0".to_owned()).unwrap();
        assert_eq!(mask.prefix_len(), 21);
        assert_eq!(Netmask::try_from("/64".to_owned()).unwrap(), Netmask::Prefix(64));
        assert!(Netmask::try_from("garbage".to_owned()).is_err());
    }

    #[test]
    fn config_type_suffixes_ipv6() {
        assert_eq!(ConfigType::for_family(true, true).to_string(), "dhcp6");
        assert_eq!(ConfigType::for_family(false, false).to_string(), "static");
        assert!(ConfigType::Dhcp6.is_dhcp());
    }

    #[test]
    fn network_config_serializes_type_tag() {
        let cfg = NetworkConfig {
            config_type: ConfigType::Static,
            adapter_ip: "192.168.33.1".parse().unwrap(),
            ip: "192.168.33.10".parse().unwrap(),
            netmask: Netmask::V4(Ipv4Addr::new(255, 255, 255, 0)),
            dhcp: None,
            auto_config: true,
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["type"], "static");
        assert_eq!(json["netmask"], "255.255.255.0");
        assert!(json.get("dhcp").is_none());
    }
}
