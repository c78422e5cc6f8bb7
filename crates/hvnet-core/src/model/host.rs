// ── Host-side interface snapshots ──
//
// Everything the address planner needs to know about the host: existing
// host-only interfaces, physical/bridged interfaces, and the subnets the
// hypervisor already claims.

use serde::{Deserialize, Serialize};

use super::switch::SwitchInventory;

/// An existing host-only interface (`read_host_only_interface`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOnlyInterface {
    pub name: String,
    pub ip: String,
    pub netmask: String,
}

/// Administrative state of a bridged interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceStatus {
    #[default]
    Up,
    Down,
}

/// A physical or bridged host interface (`read_bridged_interfaces`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgedInterface {
    pub name: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub netmask: Option<String>,
    #[serde(default)]
    pub status: InterfaceStatus,
}

impl BridgedInterface {
    pub fn is_down(&self) -> bool {
        self.status == InterfaceStatus::Down
    }
}

/// Host snapshot consumed by the address planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInventory {
    #[serde(default)]
    pub host_only: Vec<HostOnlyInterface>,
    #[serde(default)]
    pub bridged: Vec<BridgedInterface>,
    /// CIDR ranges reported by `get_hyperv_host_network_conf`.
    #[serde(default)]
    pub reserved: Vec<String>,
}

/// Offline bundle of every snapshot a resolution pass reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(flatten)]
    pub switches: SwitchInventory,
    #[serde(default)]
    pub host: HostInventory,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_flat_switch_lists() {
        let json = r#"{
            "switches": [{"Id": "S1", "Name": "Lab", "SwitchType": "Internal"}],
            "host": {
                "bridged": [{"name": "Ethernet", "ip": "10.0.0.4", "netmask": "255.255.255.0", "status": "Down"}],
                "reserved": ["172.16.0.0/12"]
            }
        }"#;
        let snap: InventorySnapshot = serde_json::from_str(json).unwrap();
        assert!(snap.switches.managed.is_empty());
        assert_eq!(snap.switches.switches.len(), 1);
        assert!(snap.host.bridged[0].is_down());
        assert_eq!(snap.host.reserved, vec!["172.16.0.0/12".to_owned()]);
    }
}
