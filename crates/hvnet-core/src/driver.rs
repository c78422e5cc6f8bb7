// ── Collaborator seams ──
//
// The hypervisor driver and the guest communication channel are external
// processes (PowerShell on the host, WinRM inside the guest). The core
// only sees the structured records they return.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{
    BridgedInterface, GuestNic, HostMacTable, HostOnlyInterface, LiveAdapter, MacAddress,
    ResolvedAdapterConfig, SwitchRecord,
};

/// Enhanced session transport for the VM console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransport {
    HvSocket,
    VmBus,
}

impl SessionTransport {
    pub fn for_enhanced_session(enabled: bool) -> Self {
        if enabled { Self::HvSocket } else { Self::VmBus }
    }
}

impl fmt::Display for SessionTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HvSocket => f.write_str("HvSocket"),
            Self::VmBus => f.write_str("VMBus"),
        }
    }
}

/// Parameters for `configure_vm`. Unset values are left out of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmConfiguration {
    #[serde(rename = "VMID")]
    pub vm_id: String,
    #[serde(rename = "SwitchID", skip_serializing_if = "Option::is_none")]
    pub switch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_stop_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_checkpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_automatic_checkpoints: Option<bool>,
    pub virtualization_extensions: bool,
    /// Declared adapters' switch ids, in slot order.
    pub additional_switches: Vec<String>,
    /// Attach options for the same adapters, in the same order.
    pub adapters: Vec<AdapterAttachment>,
}

/// How one declared adapter is attached to the VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdapterAttachment {
    pub slot: u32,
    #[serde(rename = "SwitchID")]
    pub switch_id: String,
    /// Static MAC for the adapter. Unset lets Hyper-V assign one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<MacAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_type: Option<String>,
}

impl From<&ResolvedAdapterConfig> for AdapterAttachment {
    fn from(adapter: &ResolvedAdapterConfig) -> Self {
        Self {
            slot: adapter.adapter_slot,
            switch_id: adapter.switch_id.clone(),
            mac_address: adapter.mac.clone(),
            nic_type: adapter.nic_type.clone(),
        }
    }
}

/// Host-side operations executed by the hypervisor driver.
///
/// Every call is one round trip to the driver process; the core reads each
/// snapshot once per pass.
#[allow(async_fn_in_trait)]
pub trait HypervisorDriver {
    /// Provider name used in diagnostics.
    fn provider_name(&self) -> &str {
        "hyperv"
    }

    /// Whether the host can serve DHCP on host-only networks.
    fn supports_dhcp_server(&self) -> bool {
        false
    }

    async fn get_switches(&self) -> Result<Vec<SwitchRecord>, CoreError>;

    async fn get_managed_switches(&self) -> Result<Vec<SwitchRecord>, CoreError>;

    async fn install_managed_switches(&self) -> Result<(), CoreError>;

    async fn configure_vm(&self, options: &VmConfiguration) -> Result<(), CoreError>;

    async fn get_vm_network_adapters(&self) -> Result<Vec<LiveAdapter>, CoreError>;

    /// Subnets the hypervisor already uses, as CIDR strings.
    async fn get_hyperv_host_network_conf(&self) -> Result<Vec<String>, CoreError>;

    /// MAC address of every active adapter, keyed by guest interface
    /// number as a decimal string: `"0"` for the NAT adapter in slot 1,
    /// then `"1"`, `"2"`, ... for the remaining active adapters in slot
    /// order. These are the keys `InterfaceBinding::to_request` produces.
    async fn read_mac_addresses(&self) -> Result<HostMacTable, CoreError>;

    async fn read_host_only_interface(&self) -> Result<Option<HostOnlyInterface>, CoreError>;

    async fn read_bridged_interfaces(&self) -> Result<Vec<BridgedInterface>, CoreError>;

    async fn set_vm_integration_services(
        &self,
        services: &BTreeMap<String, bool>,
    ) -> Result<(), CoreError>;

    async fn set_enhanced_session_transport_type(
        &self,
        transport: SessionTransport,
    ) -> Result<(), CoreError>;

    async fn start_vm(&self) -> Result<(), CoreError>;

    /// The `nic_mac_addresses` capability. `None` means the provider cannot
    /// report adapter MACs at all. Keys follow `read_mac_addresses`.
    async fn nic_mac_addresses(&self) -> Result<Option<HostMacTable>, CoreError> {
        self.read_mac_addresses().await.map(Some)
    }
}

/// Guest-side operations executed over the communication channel.
#[allow(async_fn_in_trait)]
pub trait GuestChannel {
    /// Enumerate the guest's network adapters.
    async fn network_adapters(&self) -> Result<Vec<GuestNic>, CoreError>;

    async fn configure_static_interface(
        &self,
        index: u32,
        net_connection_id: &str,
        ip: &str,
        netmask: &str,
    ) -> Result<(), CoreError>;

    async fn configure_dhcp_interface(
        &self,
        index: u32,
        net_connection_id: &str,
    ) -> Result<(), CoreError>;

    /// Move every network to a non-public profile.
    async fn set_all_networks_to_work(&self) -> Result<(), CoreError>;
}
