// ── Switch resolution ──
//
// Maps each declaration onto a concrete switch from the inventory and
// hands host-only/internal networks to the address planner. Nothing here
// mutates hypervisor state; the only side effect is the chooser, which may
// block on interactive input.

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{
    DeclarationKind, HostInventory, MANAGEMENT_SLOT, MacAddress, NetworkConfig, NetworkDeclaration,
    NetworkFailure, NetworkKind, ResolvedAdapterConfig, ResolvedNetwork, SwitchInventory,
    SwitchPlan, SwitchRecord, SwitchType,
};
use crate::planner::{AddressPlanner, PlanRequest};

// ── Switch selection capability ─────────────────────────────────────

/// Picks one switch when a public network matches several external switches.
pub trait SwitchChooser {
    /// Return the 0-based index of the selected entry in `options`.
    fn choose(&mut self, options: &[SwitchRecord]) -> Result<usize, CoreError>;
}

/// Always takes the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickFirst;

impl SwitchChooser for PickFirst {
    fn choose(&mut self, _options: &[SwitchRecord]) -> Result<usize, CoreError> {
        Ok(0)
    }
}

/// Refuses to choose. For unattended runs that must not guess.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFast;

impl SwitchChooser for FailFast {
    fn choose(&mut self, options: &[SwitchRecord]) -> Result<usize, CoreError> {
        Err(CoreError::SwitchSelectionRequired {
            candidates: options.iter().map(|s| s.name.clone()).collect(),
        })
    }
}

// ── Resolver ────────────────────────────────────────────────────────

/// Resolves declarations against one switch and host snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SwitchResolver<'a> {
    switches: &'a SwitchInventory,
    host: &'a HostInventory,
    provider: &'a str,
    dhcp_server_supported: bool,
}

impl<'a> SwitchResolver<'a> {
    pub fn new(switches: &'a SwitchInventory, host: &'a HostInventory) -> Self {
        Self {
            switches,
            host,
            provider: "hyperv",
            dhcp_server_supported: false,
        }
    }

    /// Name used when reporting provider limitations.
    pub fn with_provider(mut self, provider: &'a str) -> Self {
        self.provider = provider;
        self
    }

    /// Whether the host can run a DHCP server for host-only networks.
    pub fn with_dhcp_server(mut self, supported: bool) -> Self {
        self.dhcp_server_supported = supported;
        self
    }

    /// Resolve every declaration into an adapter attachment.
    ///
    /// Declared networks take slots 2.. in declaration order; a network that
    /// fails to resolve is recorded in [`SwitchPlan::failures`] and takes no
    /// slot. Inventory-level problems abort the whole pass.
    pub fn resolve(
        &self,
        declarations: &[NetworkDeclaration],
        chooser: &mut dyn SwitchChooser,
    ) -> Result<SwitchPlan, CoreError> {
        if self.switches.switches.is_empty() {
            return Err(CoreError::NoSwitches);
        }

        let default_switch = self.switches.default_switch().map(|s| s.id.clone());
        if default_switch.is_none() {
            warn!("no managed NAT switch found; management adapter stays unattached");
        }

        let mut plan = SwitchPlan {
            default_switch,
            ..SwitchPlan::default()
        };
        let mut next_slot = MANAGEMENT_SLOT + 1;

        for (index, decl) in declarations.iter().enumerate() {
            match self.resolve_one(index, next_slot, decl, chooser) {
                Ok(network) => {
                    info!(
                        slot = network.adapter.adapter_slot,
                        switch = %network.adapter.switch_name,
                        kind = %network.adapter.network_kind,
                        "resolved {}",
                        decl.label()
                    );
                    next_slot += 1;
                    plan.networks.push(network);
                }
                Err(error) if error.is_network_scoped() => {
                    warn!(index, error = %error, "skipping {}", decl.label());
                    plan.failures.push(NetworkFailure {
                        declaration_index: index,
                        label: decl.label(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(plan)
    }

    fn resolve_one(
        &self,
        index: usize,
        slot: u32,
        decl: &NetworkDeclaration,
        chooser: &mut dyn SwitchChooser,
    ) -> Result<ResolvedNetwork, CoreError> {
        // Hyper-V names are inverted: host-only rides an internal switch,
        // guest-only rides a private switch.
        let (kind, switch) = match (decl.kind, decl.intnet) {
            (DeclarationKind::Private, false) => {
                (NetworkKind::Hostonly, self.require(SwitchType::Internal, decl)?)
            }
            (DeclarationKind::Private, true) | (DeclarationKind::Internal, _) => {
                (NetworkKind::Internal, self.require(SwitchType::Private, decl)?)
            }
            (DeclarationKind::Public, _) => (NetworkKind::Bridged, self.bridged_switch(decl, chooser)?),
        };

        let config = self.plan_address(kind, decl)?;

        Ok(ResolvedNetwork {
            declaration_index: index,
            adapter: ResolvedAdapterConfig {
                adapter_slot: slot,
                switch_id: switch.id.clone(),
                switch_name: switch.name.clone(),
                mac: decl.mac.as_deref().map(MacAddress::new),
                nic_type: decl.nic_type.clone(),
                network_kind: kind,
            },
            config,
        })
    }

    fn require(
        &self,
        switch_type: SwitchType,
        decl: &NetworkDeclaration,
    ) -> Result<&'a SwitchRecord, CoreError> {
        for (i, s) in self.switches.switches.iter().enumerate() {
            debug!("{}) {} / {} / {}", i + 1, s.name, s.switch_type, s.id);
        }
        self.switches
            .first_of(switch_type)
            .ok_or_else(|| CoreError::SwitchNotFound {
                switch_type: switch_type.to_string(),
                network: decl.label(),
            })
    }

    fn bridged_switch(
        &self,
        decl: &NetworkDeclaration,
        chooser: &mut dyn SwitchChooser,
    ) -> Result<&'a SwitchRecord, CoreError> {
        if let Some(bridge) = decl.bridge.as_deref() {
            debug!(bridge, "looking for switch with name or id");
            if let Some(found) = self.switches.find(bridge) {
                debug!(name = %found.name, id = %found.id, "found switch");
                return Ok(found);
            }
            warn!(bridge, "requested bridge switch not found");
        }

        let external = self.switches.of_type(SwitchType::External);
        match external.as_slice() {
            [] => Err(CoreError::NoExternalSwitches),
            [only] => {
                debug!(name = %only.name, "single external switch, selecting it");
                Ok(*only)
            }
            candidates => {
                let options: Vec<SwitchRecord> = candidates.iter().map(|s| (*s).clone()).collect();
                let choice = chooser.choose(&options)?;
                candidates.get(choice).copied().ok_or_else(|| {
                    CoreError::Internal(format!(
                        "switch selection {} out of range (1-{})",
                        choice.saturating_add(1),
                        candidates.len()
                    ))
                })
            }
        }
    }

    fn plan_address(
        &self,
        kind: NetworkKind,
        decl: &NetworkDeclaration,
    ) -> Result<Option<NetworkConfig>, CoreError> {
        let req = PlanRequest::from(decl);
        match kind {
            NetworkKind::Hostonly | NetworkKind::Internal => {
                if decl.dhcp_server && req.dhcp && !self.dhcp_server_supported {
                    return Err(CoreError::DhcpNotSupported {
                        provider: self.provider.to_owned(),
                    });
                }
                AddressPlanner::new(self.host).plan(&req).map(Some)
            }
            NetworkKind::Bridged if req.dhcp => Ok(None),
            NetworkKind::Bridged => AddressPlanner::passthrough(&req).map(Some),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ConfigType;
    use pretty_assertions::assert_eq;

    fn inventory(switches: Vec<SwitchRecord>) -> SwitchInventory {
        SwitchInventory {
            managed: vec![SwitchRecord::new("nat-0", "Default Switch", SwitchType::Nat)],
            switches,
        }
    }

    fn lab() -> SwitchInventory {
        inventory(vec![
            SwitchRecord::new("S1", "Host Only", SwitchType::Internal),
            SwitchRecord::new("S2", "Default Switch", SwitchType::Nat),
            SwitchRecord::new("S3", "Guests", SwitchType::Private),
            SwitchRecord::new("S4", "LAN", SwitchType::External),
            SwitchRecord::new("S5", "WiFi", SwitchType::External),
        ])
    }

    /// Records what it was offered and answers with a fixed index.
    struct Scripted {
        answer: usize,
        offered: Vec<Vec<String>>,
    }

    impl SwitchChooser for Scripted {
        fn choose(&mut self, options: &[SwitchRecord]) -> Result<usize, CoreError> {
            self.offered
                .push(options.iter().map(|s| s.name.clone()).collect());
            Ok(self.answer)
        }
    }

    #[test]
    fn empty_inventory_fails_before_planning() {
        let switches = SwitchInventory::default();
        let host = HostInventory::default();
        // An invalid declaration would otherwise fail in the planner.
        let decls = [NetworkDeclaration::private_static("nope", "255.255.255.0")];
        let err = SwitchResolver::new(&switches, &host)
            .resolve(&decls, &mut PickFirst)
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSwitches));
    }

    #[test]
    fn private_static_end_to_end() {
        let switches = inventory(vec![
            SwitchRecord::new("S1", "Lab", SwitchType::Internal),
            SwitchRecord::new("S2", "Default Switch", SwitchType::Nat),
        ]);
        let host = HostInventory::default();
        let decls = [NetworkDeclaration::private_static("192.168.33.10", "255.255.255.0")];
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(&decls, &mut FailFast)
            .unwrap();

        assert_eq!(plan.default_switch.as_deref(), Some("nat-0"));
        let net = &plan.networks[0];
        assert_eq!(net.adapter.switch_id, "S1");
        assert_eq!(net.adapter.adapter_slot, 2);
        assert_eq!(net.adapter.network_kind, NetworkKind::Hostonly);
        let cfg = net.config.as_ref().unwrap();
        assert_eq!(cfg.config_type, ConfigType::Static);
        assert_eq!(cfg.ip.to_string(), "192.168.33.10");
        assert_eq!(cfg.adapter_ip.to_string(), "192.168.33.1");
        assert_eq!(cfg.netmask.to_string(), "255.255.255.0");
    }

    #[test]
    fn private_and_internal_terminology_is_inverted() {
        let switches = lab();
        let host = HostInventory::default();
        let mut intnet = NetworkDeclaration::private_static("10.10.0.5", "255.255.255.0");
        intnet.intnet = true;
        let internal = NetworkDeclaration {
            ip: Some("10.11.0.5".into()),
            ..NetworkDeclaration::new(DeclarationKind::Internal)
        };
        let decls = [
            NetworkDeclaration::private_static("10.9.0.5", "255.255.255.0"),
            intnet,
            internal,
        ];
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(&decls, &mut FailFast)
            .unwrap();

        let picked: Vec<(&str, NetworkKind)> = plan
            .networks
            .iter()
            .map(|n| (n.adapter.switch_id.as_str(), n.adapter.network_kind))
            .collect();
        assert_eq!(
            picked,
            vec![
                ("S1", NetworkKind::Hostonly),
                ("S3", NetworkKind::Internal),
                ("S3", NetworkKind::Internal),
            ]
        );
        let slots: Vec<u32> = plan.networks.iter().map(|n| n.adapter.adapter_slot).collect();
        assert_eq!(slots, vec![2, 3, 4]);
    }

    #[test]
    fn public_bridge_matches_name_or_id_case_insensitively() {
        let switches = lab();
        let host = HostInventory::default();
        let decls = [
            NetworkDeclaration::public(Some("wifi")),
            NetworkDeclaration::public(Some("s4")),
        ];
        let mut chooser = Scripted {
            answer: 0,
            offered: Vec::new(),
        };
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(&decls, &mut chooser)
            .unwrap();
        assert_eq!(plan.networks[0].adapter.switch_id, "S5");
        assert_eq!(plan.networks[1].adapter.switch_id, "S4");
        assert!(chooser.offered.is_empty());
        assert!(plan.networks[0].config.is_none());
    }

    #[test]
    fn unknown_bridge_prompts_among_external_switches() {
        let switches = lab();
        let host = HostInventory::default();
        let mut chooser = Scripted {
            answer: 1,
            offered: Vec::new(),
        };
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(&[NetworkDeclaration::public(Some("missing"))], &mut chooser)
            .unwrap();
        assert_eq!(chooser.offered, vec![vec!["LAN".to_owned(), "WiFi".to_owned()]]);
        assert_eq!(plan.networks[0].adapter.switch_id, "S5");
    }

    #[test]
    fn single_external_switch_is_auto_selected() {
        let switches = inventory(vec![SwitchRecord::new("X", "LAN", SwitchType::External)]);
        let host = HostInventory::default();
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(&[NetworkDeclaration::public(None)], &mut FailFast)
            .unwrap();
        assert_eq!(plan.networks[0].adapter.switch_id, "X");
    }

    #[test]
    fn public_without_external_switches_fails() {
        let switches = inventory(vec![SwitchRecord::new("S1", "Lab", SwitchType::Internal)]);
        let host = HostInventory::default();
        let err = SwitchResolver::new(&switches, &host)
            .resolve(&[NetworkDeclaration::public(None)], &mut PickFirst)
            .unwrap_err();
        assert!(matches!(err, CoreError::NoExternalSwitches));
    }

    #[test]
    fn fail_fast_chooser_aborts_on_ambiguity() {
        let switches = lab();
        let host = HostInventory::default();
        let err = SwitchResolver::new(&switches, &host)
            .resolve(&[NetworkDeclaration::public(None)], &mut FailFast)
            .unwrap_err();
        match err {
            CoreError::SwitchSelectionRequired { candidates } => {
                assert_eq!(candidates, vec!["LAN".to_owned(), "WiFi".to_owned()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let switches = lab();
        let host = HostInventory::default();
        let mut chooser = Scripted {
            answer: 7,
            offered: Vec::new(),
        };
        let err = SwitchResolver::new(&switches, &host)
            .resolve(&[NetworkDeclaration::public(None)], &mut chooser)
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn largest_choice_is_rejected_without_overflow() {
        let switches = lab();
        let host = HostInventory::default();
        let mut chooser = Scripted {
            answer: usize::MAX,
            offered: Vec::new(),
        };
        let err = SwitchResolver::new(&switches, &host)
            .resolve(&[NetworkDeclaration::public(None)], &mut chooser)
            .unwrap_err();
        let CoreError::Internal(message) = err else {
            panic!("expected an internal error, got {err:?}");
        };
        assert!(message.contains(&usize::MAX.to_string()), "{message}");
    }

    #[test]
    fn bridged_static_keeps_its_address() {
        let switches = lab();
        let host = HostInventory::default();
        let decl = NetworkDeclaration {
            ip: Some("192.168.1.50".into()),
            dhcp: false,
            ..NetworkDeclaration::public(Some("LAN"))
        };
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(&[decl], &mut FailFast)
            .unwrap();
        let cfg = plan.networks[0].config.as_ref().unwrap();
        assert_eq!(cfg.config_type, ConfigType::Static);
        assert_eq!(cfg.ip.to_string(), "192.168.1.50");
    }

    #[test]
    fn failed_network_is_recorded_and_takes_no_slot() {
        let switches = lab();
        let host = HostInventory {
            reserved: vec!["192.168.57.0/21".into()],
            ..HostInventory::default()
        };
        let decls = [
            NetworkDeclaration::private_static("192.168.57.5", "255.255.248.0"),
            NetworkDeclaration::private_static("192.168.70.5", "255.255.255.0"),
        ];
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(&decls, &mut FailFast)
            .unwrap();
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].declaration_index, 0);
        assert!(matches!(plan.failures[0].error, CoreError::ReservedSubnet { .. }));
        assert_eq!(plan.networks.len(), 1);
        assert_eq!(plan.networks[0].declaration_index, 1);
        assert_eq!(plan.networks[0].adapter.adapter_slot, 2);
    }

    #[test]
    fn missing_switch_type_is_network_scoped() {
        let switches = inventory(vec![SwitchRecord::new("X", "LAN", SwitchType::External)]);
        let host = HostInventory::default();
        let plan = SwitchResolver::new(&switches, &host)
            .resolve(
                &[
                    NetworkDeclaration::private_static("10.0.0.5", "255.255.255.0"),
                    NetworkDeclaration::public(None),
                ],
                &mut FailFast,
            )
            .unwrap();
        assert!(matches!(
            plan.failures[0].error,
            CoreError::SwitchNotFound { ref switch_type, .. } if switch_type == "internal"
        ));
        assert_eq!(plan.networks[0].adapter.adapter_slot, 2);
    }

    #[test]
    fn dhcp_server_request_needs_provider_support() {
        let switches = lab();
        let host = HostInventory::default();
        let decl = NetworkDeclaration {
            dhcp_server: true,
            ..NetworkDeclaration::private_dhcp()
        };
        let err = SwitchResolver::new(&switches, &host)
            .resolve(std::slice::from_ref(&decl), &mut FailFast)
            .unwrap_err();
        assert!(matches!(err, CoreError::DhcpNotSupported { ref provider } if provider == "hyperv"));

        let plan = SwitchResolver::new(&switches, &host)
            .with_dhcp_server(true)
            .resolve(&[decl], &mut FailFast)
            .unwrap();
        assert!(plan.networks[0].config.as_ref().unwrap().dhcp.is_some());
    }

    #[test]
    fn resolution_is_deterministic() {
        let switches = lab();
        let host = HostInventory::default();
        let decls = [
            NetworkDeclaration::private_dhcp(),
            NetworkDeclaration::public(Some("LAN")),
            NetworkDeclaration::private_static("10.1.1.1", "255.255.255.0"),
        ];
        let resolver = SwitchResolver::new(&switches, &host);
        let first = resolver.resolve(&decls, &mut PickFirst).unwrap();
        let second = resolver.resolve(&decls, &mut PickFirst).unwrap();
        assert_eq!(first.networks, second.networks);
        assert_eq!(first.default_switch, second.default_switch);
        assert_eq!(first.additional_switches(), vec!["S1", "S4", "S1"]);
    }
}
