// ── Domain model ──
//
// Declarations flow in, switch and host snapshots are read once per pass,
// and the resolved plan flows out to the driver and the guest.

pub mod adapter;
pub mod declaration;
pub mod host;
pub mod mac;
pub mod network;
pub mod switch;

pub use adapter::{
    ADAPTER_TYPE_NONE, GuestInterface, GuestNic, HostMacTable, InterfaceBinding, InterfaceMap,
    LiveAdapter, NetworkRequest,
};
pub use declaration::{DeclarationKind, NetworkDeclaration};
pub use host::{BridgedInterface, HostInventory, HostOnlyInterface, InterfaceStatus, InventorySnapshot};
pub use mac::MacAddress;
pub use network::{
    ConfigType, DhcpRange, MANAGEMENT_SLOT, Netmask, NetworkConfig, NetworkFailure, NetworkKind,
    ResolvedAdapterConfig, ResolvedNetwork, SwitchPlan,
};
pub use switch::{SwitchInventory, SwitchRecord, SwitchType};
