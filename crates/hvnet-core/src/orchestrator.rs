// ── Configuration orchestrator ──
//
// Two phases per machine. Pre-boot: read every snapshot, resolve the
// declared networks, push the VM configuration and start the machine.
// Post-boot: correlate live adapters with guest interfaces and apply the
// address plans, bounded by the guest timeout.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::correlator::AdapterCorrelator;
use crate::driver::{
    AdapterAttachment, GuestChannel, HypervisorDriver, SessionTransport, VmConfiguration,
};
use crate::error::CoreError;
use crate::guest::{ApplyOptions, ApplyReport, GuestApplier};
use crate::model::{
    HostInventory, InterfaceBinding, InventorySnapshot, NetworkDeclaration, NetworkRequest,
    SwitchInventory, SwitchPlan, SwitchType,
};
use crate::resolver::{SwitchChooser, SwitchResolver};

/// Everything the pre-boot phase produced for one machine.
#[derive(Debug)]
pub struct PreparedMachine {
    pub inventory: InventorySnapshot,
    pub plan: SwitchPlan,
    /// The payload sent to `configure_vm`.
    pub vm: VmConfiguration,
}

/// Result of the post-boot phase.
#[derive(Debug)]
pub enum GuestOutcome {
    Applied {
        bindings: Vec<InterfaceBinding>,
        report: ApplyReport,
    },
    /// The guest did not finish within the configured bound.
    TimedOut { after: Duration },
}

/// Drives one machine through both phases.
pub struct Orchestrator<D, G> {
    driver: D,
    guest: G,
    config: OrchestratorConfig,
}

impl<D: HypervisorDriver, G: GuestChannel> Orchestrator<D, G> {
    pub fn new(driver: D, guest: G, config: OrchestratorConfig) -> Self {
        Self {
            driver,
            guest,
            config,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn guest(&self) -> &G {
        &self.guest
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Prepare and boot, then configure the guest.
    pub async fn run(
        &self,
        declarations: &[NetworkDeclaration],
        chooser: &mut dyn SwitchChooser,
    ) -> Result<(PreparedMachine, GuestOutcome), CoreError> {
        let prepared = self.prepare(declarations, chooser).await?;
        let outcome = self.configure_guest(&prepared).await?;
        Ok((prepared, outcome))
    }

    // ── Pre-boot ────────────────────────────────────────────────────

    /// Resolve the declared networks, configure the VM and start it.
    pub async fn prepare(
        &self,
        declarations: &[NetworkDeclaration],
        chooser: &mut dyn SwitchChooser,
    ) -> Result<PreparedMachine, CoreError> {
        let inventory = self.read_inventory().await?;

        let plan = SwitchResolver::new(&inventory.switches, &inventory.host)
            .with_provider(self.driver.provider_name())
            .with_dhcp_server(self.driver.supports_dhcp_server())
            .resolve(declarations, chooser)?;
        info!(
            networks = plan.networks.len(),
            failures = plan.failures.len(),
            "network resolution finished"
        );

        let vm = self.vm_configuration(&plan);
        debug!(?vm, "configuring vm");
        self.driver.configure_vm(&vm).await?;

        let services = &self.config.vm.vm_integration_services;
        if !services.is_empty() {
            info!(count = services.len(), "setting integration services");
            self.driver.set_vm_integration_services(services).await?;
        }

        let transport =
            SessionTransport::for_enhanced_session(self.config.vm.enable_enhanced_session_mode);
        info!(%transport, "setting enhanced session transport");
        self.driver
            .set_enhanced_session_transport_type(transport)
            .await?;

        info!(vm = %self.config.vm.vm_id, "starting vm");
        self.driver.start_vm().await?;

        Ok(PreparedMachine {
            inventory,
            plan,
            vm,
        })
    }

    /// Read the switch and host snapshots used by one resolution pass.
    pub async fn read_inventory(&self) -> Result<InventorySnapshot, CoreError> {
        let switches = self.driver.get_switches().await?;
        if switches.is_empty() {
            return Err(CoreError::NoSwitches);
        }

        let mut managed = self.driver.get_managed_switches().await?;
        let has_nat = managed.iter().any(|s| s.switch_type == SwitchType::Nat);
        if !has_nat && self.config.install_managed_switches {
            info!("no managed NAT switch; installing provider switches");
            self.driver.install_managed_switches().await?;
            managed = self.driver.get_managed_switches().await?;
        }

        let host_only = self.driver.read_host_only_interface().await?;
        let bridged = self.driver.read_bridged_interfaces().await?;
        let reserved = self.driver.get_hyperv_host_network_conf().await?;
        debug!(?host_only, bridged = bridged.len(), ?reserved, "host inventory");

        Ok(InventorySnapshot {
            switches: SwitchInventory { managed, switches },
            host: HostInventory {
                host_only: host_only.into_iter().collect(),
                bridged,
                reserved,
            },
        })
    }

    fn vm_configuration(&self, plan: &SwitchPlan) -> VmConfiguration {
        let vm = &self.config.vm;
        let mut adapters: Vec<AdapterAttachment> = plan
            .networks
            .iter()
            .map(|n| AdapterAttachment::from(&n.adapter))
            .collect();
        adapters.sort_by_key(|a| a.slot);

        VmConfiguration {
            vm_id: vm.vm_id.clone(),
            switch_id: plan.default_switch.clone(),
            memory: vm.memory,
            max_memory: vm.max_memory,
            processors: vm.cpus,
            auto_start_action: vm.auto_start_action.clone(),
            auto_stop_action: vm.auto_stop_action.clone(),
            enable_checkpoints: vm.enable_checkpoints,
            enable_automatic_checkpoints: vm.enable_automatic_checkpoints,
            virtualization_extensions: vm.enable_virtualization_extensions,
            additional_switches: plan.additional_switches(),
            adapters,
        }
    }

    // ── Post-boot ───────────────────────────────────────────────────

    /// Correlate live adapters and apply the address plans in the guest.
    pub async fn configure_guest(
        &self,
        prepared: &PreparedMachine,
    ) -> Result<GuestOutcome, CoreError> {
        let live = self.driver.get_vm_network_adapters().await?;
        let bindings = AdapterCorrelator::correlate(&prepared.plan.networks, &live);
        let requests: Vec<NetworkRequest> =
            bindings.iter().map(InterfaceBinding::to_request).collect();
        debug!(?requests, "guest network requests");

        let macs = self.driver.nic_mac_addresses().await?;
        let provider = self.driver.provider_name();
        if macs.is_none() && !provider.starts_with("vmware") {
            return Err(CoreError::CantReadMacAddresses {
                provider: provider.to_owned(),
            });
        }

        let applier = GuestApplier::new(
            &self.guest,
            ApplyOptions {
                set_work_network: self.config.set_work_network,
            },
        )
        .with_provider(provider);

        let timeout = self.config.guest_timeout;
        match tokio::time::timeout(timeout, applier.configure_networks(macs.as_ref(), &requests))
            .await
        {
            Ok(report) => {
                let report = report?;
                info!(
                    configured = report.configured(),
                    skipped = report.skipped(),
                    failed = report.failed(),
                    "guest networks applied"
                );
                if let Some(error) = &report.post_step {
                    warn!(error = %error, "guest channel failed after networks were applied");
                }
                Ok(GuestOutcome::Applied { bindings, report })
            }
            Err(_) => {
                warn!(?timeout, "timed out waiting for guest network configuration");
                Ok(GuestOutcome::TimedOut { after: timeout })
            }
        }
    }
}
