// ── Runtime configuration ──
//
// Describes *what* to configure on one machine. Never touches disk: the
// CLI builds an `OrchestratorConfig` from its profile and hands it in.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default bound on guest-side network application.
pub const DEFAULT_GUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Hypervisor settings passed through `configure_vm`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct VmSettings {
    pub vm_id: String,
    /// Startup memory in MB.
    pub memory: Option<u64>,
    /// Dynamic memory ceiling in MB.
    pub max_memory: Option<u64>,
    pub cpus: Option<u32>,
    pub auto_start_action: Option<String>,
    pub auto_stop_action: Option<String>,
    pub enable_checkpoints: Option<bool>,
    pub enable_automatic_checkpoints: Option<bool>,
    pub enable_virtualization_extensions: bool,
    pub enable_enhanced_session_mode: bool,
    /// Integration service name → enabled.
    pub vm_integration_services: BTreeMap<String, bool>,
}

/// Configuration for one orchestrated pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub vm: VmSettings,
    /// How long to wait for the guest to apply its networks.
    pub guest_timeout: Duration,
    /// Install the provider's managed switches when no NAT switch exists.
    pub install_managed_switches: bool,
    /// Move guest networks to a non-public profile afterwards.
    pub set_work_network: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            vm: VmSettings::default(),
            guest_timeout: DEFAULT_GUEST_TIMEOUT,
            install_managed_switches: true,
            set_work_network: false,
        }
    }
}
