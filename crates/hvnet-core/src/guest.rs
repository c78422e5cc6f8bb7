// ── Guest-side network application ──
//
// Runs against the guest communication channel. The hypervisor reports
// adapter reference → MAC; the guest reports MAC → local adapter. Joining
// the two on the normalized MAC tells us which local adapter is which.

use tracing::{debug, info, warn};

use crate::driver::GuestChannel;
use crate::error::CoreError;
use crate::model::{
    ConfigType, GuestInterface, HostMacTable, InterfaceMap, MacAddress, NetworkRequest,
};

/// Per-call options for [`GuestApplier`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Move every network to a non-public profile after configuring.
    pub set_work_network: bool,
}

/// What happened to one requested network.
#[derive(Debug)]
pub enum ApplyOutcome {
    Configured {
        interface: String,
        index: u32,
        config_type: ConfigType,
    },
    /// No local adapter correlated with the interface reference.
    Skipped { interface: String },
    /// The guest rejected the configuration. Other networks still run.
    Failed { interface: String, error: CoreError },
}

/// Per-network results of a `configure_networks` call.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<ApplyOutcome>,
    /// Error from the set-work-network step that runs after every network
    /// was applied. The guest may have dropped the channel while switching
    /// addresses, so the outcomes above still stand.
    pub post_step: Option<CoreError>,
}

impl ApplyReport {
    pub fn configured(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::Configured { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ApplyOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Applies network requests inside the guest.
pub struct GuestApplier<'g, G: GuestChannel> {
    guest: &'g G,
    provider: String,
    options: ApplyOptions,
}

impl<'g, G: GuestChannel> GuestApplier<'g, G> {
    pub fn new(guest: &'g G, options: ApplyOptions) -> Self {
        Self {
            guest,
            provider: "hyperv".into(),
            options,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Correlate guest adapters with the hypervisor's MAC table.
    ///
    /// Adapters without a connection id are virtual-only and ignored, as
    /// are adapters whose MAC the hypervisor did not report.
    pub async fn interface_map(&self, macs: &HostMacTable) -> Result<InterfaceMap, CoreError> {
        let driver_mac_address: std::collections::HashMap<&MacAddress, &String> =
            macs.iter().map(|(reference, mac)| (mac, reference)).collect();
        debug!(?driver_mac_address, "mac addresses");

        let mut map = InterfaceMap::new();
        for nic in self.guest.network_adapters().await? {
            debug!(?nic, "nic");
            let mac = MacAddress::new(&nic.mac_address);
            let Some(net_connection_id) = nic.net_connection_id else {
                continue;
            };
            let Some(&reference) = driver_mac_address.get(&mac) else {
                continue;
            };
            map.insert(
                reference.clone(),
                GuestInterface {
                    net_connection_id,
                    mac_address: mac,
                    interface_index: nic.interface_index,
                    index: nic.index,
                },
            );
        }

        debug!(?map, "vm interface map");
        Ok(map)
    }

    /// Configure each requested network on its correlated adapter.
    ///
    /// `macs` is the provider's `nic_mac_addresses` capability; `None`
    /// means the provider has none. An unsupported network type aborts
    /// the call. Guest failures on one interface, and a failed
    /// set-work-network step, are recorded on the report instead.
    pub async fn configure_networks(
        &self,
        macs: Option<&HostMacTable>,
        networks: &[NetworkRequest],
    ) -> Result<ApplyReport, CoreError> {
        info!(count = networks.len(), "configuring guest networks");
        let mut report = ApplyReport::default();

        if self.provider.starts_with("vmware") {
            warn!("Configuring secondary network adapters through VMware on Windows is not yet supported");
            warn!("You will need to manually configure the network adapter");
        } else {
            let macs = macs.ok_or_else(|| CoreError::CantReadMacAddresses {
                provider: self.provider.clone(),
            })?;
            let map = self.interface_map(macs).await?;
            for network in networks {
                report.outcomes.push(self.configure_one(&map, network).await?);
            }
        }

        if self.options.set_work_network {
            if let Err(error) = self.guest.set_all_networks_to_work().await {
                warn!(error = %error, "could not move guest networks to the work profile");
                report.post_step = Some(error);
            }
        }

        Ok(report)
    }

    async fn configure_one(
        &self,
        map: &InterfaceMap,
        network: &NetworkRequest,
    ) -> Result<ApplyOutcome, CoreError> {
        let interface = network.interface.clone();
        let Some(target) = map.get(&network.interface) else {
            info!(interface = %network.interface, "could not find interface for network");
            return Ok(ApplyOutcome::Skipped { interface });
        };

        let result = match network.request_type {
            ConfigType::Static => {
                let (Some(ip), Some(netmask)) = (&network.ip, &network.netmask) else {
                    return Ok(ApplyOutcome::Failed {
                        error: CoreError::AddressInvalid {
                            ip: network.ip.clone().unwrap_or_default(),
                            netmask: network.netmask.clone().unwrap_or_default(),
                            message: "static networks need an IP and a netmask".into(),
                        },
                        interface,
                    });
                };
                info!(
                    index = target.index,
                    mac = %target.mac_address,
                    "configuring static IP for interface"
                );
                self.guest
                    .configure_static_interface(target.index, &target.net_connection_id, ip, netmask)
                    .await
            }
            ConfigType::Dhcp => {
                info!(index = target.index, mac = %target.mac_address, "configuring DHCP for interface");
                self.guest
                    .configure_dhcp_interface(target.index, &target.net_connection_id)
                    .await
            }
            other => {
                return Err(CoreError::UnsupportedNetworkType {
                    network_type: other.to_string(),
                });
            }
        };

        Ok(match result {
            Ok(()) => ApplyOutcome::Configured {
                interface,
                index: target.index,
                config_type: network.request_type,
            },
            Err(error) => {
                warn!(interface = %interface, error = %error, "guest rejected network configuration");
                ApplyOutcome::Failed { interface, error }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::GuestNic;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGuest {
        nics: Vec<GuestNic>,
        fail_index: Option<u32>,
        fail_work: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGuest {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GuestChannel for FakeGuest {
        async fn network_adapters(&self) -> Result<Vec<GuestNic>, CoreError> {
            Ok(self.nics.clone())
        }

        async fn configure_static_interface(
            &self,
            index: u32,
            net_connection_id: &str,
            ip: &str,
            netmask: &str,
        ) -> Result<(), CoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("static {index} {net_connection_id} {ip} {netmask}"));
            if self.fail_index == Some(index) {
                return Err(CoreError::Guest {
                    message: "netsh failed".into(),
                });
            }
            Ok(())
        }

        async fn configure_dhcp_interface(
            &self,
            index: u32,
            net_connection_id: &str,
        ) -> Result<(), CoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("dhcp {index} {net_connection_id}"));
            Ok(())
        }

        async fn set_all_networks_to_work(&self) -> Result<(), CoreError> {
            self.calls.lock().unwrap().push("work".into());
            if self.fail_work {
                return Err(CoreError::Guest {
                    message: "connection reset".into(),
                });
            }
            Ok(())
        }
    }

    fn nic(mac: &str, connection: Option<&str>, index: u32) -> GuestNic {
        GuestNic {
            mac_address: mac.into(),
            net_connection_id: connection.map(str::to_owned),
            interface_index: index + 10,
            index,
        }
    }

    fn macs(entries: &[(&str, &str)]) -> HostMacTable {
        entries
            .iter()
            .map(|(reference, mac)| ((*reference).to_owned(), MacAddress::new(mac)))
            .collect()
    }

    #[tokio::test]
    async fn mac_lookup_ignores_separators_and_case() {
        let guest = FakeGuest {
            nics: vec![nic("00:15:5D:01:02:03", Some("Ethernet"), 0)],
            ..FakeGuest::default()
        };
        let applier = GuestApplier::new(&guest, ApplyOptions::default());
        let map = applier
            .interface_map(&macs(&[("A1", "00155D010203")]))
            .await
            .unwrap();
        assert_eq!(map["A1"].index, 0);
        assert_eq!(map["A1"].net_connection_id, "Ethernet");
    }

    #[tokio::test]
    async fn virtual_and_unknown_adapters_are_left_out() {
        let guest = FakeGuest {
            nics: vec![
                nic("00:15:5d:00:00:01", None, 0),
                nic("00:15:5d:00:00:02", Some("Ethernet 2"), 1),
                nic("00:15:5d:00:00:99", Some("Loopback"), 2),
            ],
            ..FakeGuest::default()
        };
        let applier = GuestApplier::new(&guest, ApplyOptions::default());
        let map = applier
            .interface_map(&macs(&[("0", "00155d000001"), ("1", "00155d000002")]))
            .await
            .unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["1"]);
    }

    #[tokio::test]
    async fn configures_static_and_dhcp_and_skips_missing() {
        let guest = FakeGuest {
            nics: vec![
                nic("00-15-5d-00-00-02", Some("Ethernet 2"), 4),
                nic("00-15-5d-00-00-03", Some("Ethernet 3"), 5),
            ],
            ..FakeGuest::default()
        };
        let table = macs(&[("1", "00155D000002"), ("2", "00155D000003")]);
        let requests = [
            NetworkRequest::static_ip("1", "192.168.33.10", "255.255.255.0"),
            NetworkRequest::dhcp("3"),
            NetworkRequest::dhcp("2"),
        ];
        let applier = GuestApplier::new(
            &guest,
            ApplyOptions {
                set_work_network: true,
            },
        );
        let report = applier.configure_networks(Some(&table), &requests).await.unwrap();

        assert_eq!(report.configured(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            guest.calls(),
            vec![
                "static 4 Ethernet 2 192.168.33.10 255.255.255.0".to_owned(),
                "dhcp 5 Ethernet 3".to_owned(),
                "work".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn guest_failure_does_not_stop_remaining_networks() {
        let guest = FakeGuest {
            nics: vec![
                nic("00155d000002", Some("Ethernet 2"), 4),
                nic("00155d000003", Some("Ethernet 3"), 5),
            ],
            fail_index: Some(4),
            ..FakeGuest::default()
        };
        let table = macs(&[("1", "00155d000002"), ("2", "00155d000003")]);
        let requests = [
            NetworkRequest::static_ip("1", "10.0.0.5", "255.255.255.0"),
            NetworkRequest::static_ip("2", "10.0.1.5", "255.255.255.0"),
        ];
        let report = GuestApplier::new(&guest, ApplyOptions::default())
            .configure_networks(Some(&table), &requests)
            .await
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.configured(), 1);
        assert_eq!(guest.calls().len(), 2);
    }

    #[tokio::test]
    async fn failed_work_profile_step_keeps_outcomes() {
        let guest = FakeGuest {
            nics: vec![nic("00155d000002", Some("Ethernet 2"), 4)],
            fail_work: true,
            ..FakeGuest::default()
        };
        let table = macs(&[("1", "00155d000002")]);
        let report = GuestApplier::new(
            &guest,
            ApplyOptions {
                set_work_network: true,
            },
        )
        .configure_networks(Some(&table), &[NetworkRequest::dhcp("1")])
        .await
        .unwrap();

        assert_eq!(report.configured(), 1);
        assert!(matches!(report.post_step, Some(CoreError::Guest { ref message }) if message == "connection reset"));
        assert_eq!(guest.calls(), vec!["dhcp 4 Ethernet 2".to_owned(), "work".to_owned()]);
    }

    #[tokio::test]
    async fn unsupported_type_aborts() {
        let guest = FakeGuest {
            nics: vec![nic("00155d000002", Some("Ethernet 2"), 4)],
            ..FakeGuest::default()
        };
        let table = macs(&[("1", "00155d000002")]);
        let requests = [NetworkRequest {
            request_type: ConfigType::Static6,
            ..NetworkRequest::static_ip("1", "fd00::5", "64")
        }];
        let err = GuestApplier::new(&guest, ApplyOptions::default())
            .configure_networks(Some(&table), &requests)
            .await
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"static6 network type is not supported, try static or dhcp");
        assert!(guest.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_mac_capability_is_fatal() {
        let guest = FakeGuest::default();
        let err = GuestApplier::new(&guest, ApplyOptions::default())
            .configure_networks(None, &[NetworkRequest::dhcp("1")])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CantReadMacAddresses { ref provider } if provider == "hyperv"));
    }

    #[tokio::test]
    async fn vmware_provider_only_warns() {
        let guest = FakeGuest::default();
        let report = GuestApplier::new(
            &guest,
            ApplyOptions {
                set_work_network: true,
            },
        )
        .with_provider("vmware_desktop")
        .configure_networks(None, &[NetworkRequest::dhcp("1")])
        .await
        .unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(guest.calls(), vec!["work".to_owned()]);
    }
}
