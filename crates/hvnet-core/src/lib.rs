//! Network resolution and MAC correlation for Hyper-V style virtual machines.
//!
//! Declared networks go through two phases:
//!
//! - **Pre-boot**: [`SwitchResolver`] maps each [`NetworkDeclaration`] onto a
//!   virtual switch from a [`SwitchInventory`] snapshot and hands host-only
//!   networks to the [`AddressPlanner`], which derives adapter, static and DHCP
//!   addresses and rejects subnets already in use on the host. The result is a
//!   [`SwitchPlan`] with adapter slots 2.. in declaration order.
//!
//! - **Post-boot**: [`AdapterCorrelator`] ranks the live adapters to find each
//!   declared slot's guest interface number, and [`GuestApplier`] joins the
//!   hypervisor's adapter MACs with the guest's NICs to configure them.
//!
//! [`Orchestrator`] sequences both phases over the [`HypervisorDriver`] and
//! [`GuestChannel`] traits. Neither trait is implemented here; callers plug in
//! their own transports (PowerShell, WinRM) or in-memory fakes.

pub mod config;
pub mod correlator;
pub mod driver;
pub mod error;
pub mod guest;
pub mod model;
pub mod orchestrator;
pub mod planner;
pub mod resolver;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_GUEST_TIMEOUT, OrchestratorConfig, VmSettings};
pub use correlator::{AdapterCorrelator, assign_interface_numbers, correlate};
pub use driver::{
    AdapterAttachment, GuestChannel, HypervisorDriver, SessionTransport, VmConfiguration,
};
pub use error::CoreError;
pub use guest::{ApplyOptions, ApplyOutcome, ApplyReport, GuestApplier};
pub use orchestrator::{GuestOutcome, Orchestrator, PreparedMachine};
pub use planner::{AddressPlanner, PlanRequest};
pub use resolver::{FailFast, PickFirst, SwitchChooser, SwitchResolver};

pub use model::{
    BridgedInterface, ConfigType, DeclarationKind, DhcpRange, GuestInterface, GuestNic,
    HostInventory, HostMacTable, HostOnlyInterface, InterfaceBinding, InterfaceMap,
    InterfaceStatus, InventorySnapshot, LiveAdapter, MANAGEMENT_SLOT, MacAddress, Netmask,
    NetworkConfig, NetworkDeclaration, NetworkFailure, NetworkKind, NetworkRequest,
    ResolvedAdapterConfig, ResolvedNetwork, SwitchInventory, SwitchPlan, SwitchRecord, SwitchType,
};
