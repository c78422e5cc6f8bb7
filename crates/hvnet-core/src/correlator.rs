// ── Adapter → interface correlation ──
//
// Adapter slots and guest interface numbers are independent numbering
// schemes. The guest refers to "interface N" where N is the adapter's rank
// among active adapters in slot order; this module computes that rank.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{InterfaceBinding, LiveAdapter, ResolvedNetwork};

/// Adapter slot → compact 0-based interface number, active adapters only.
pub fn assign_interface_numbers(live: &[LiveAdapter]) -> BTreeMap<u32, u32> {
    let active: BTreeMap<u32, &LiveAdapter> = live
        .iter()
        .filter(|a| a.is_active())
        .map(|a| (a.number, a))
        .collect();

    active
        .keys()
        .zip(0u32..)
        .map(|(&slot, rank)| (slot, rank))
        .collect()
}

/// Joins the resolved plan with the adapters the hypervisor actually created.
pub struct AdapterCorrelator;

impl AdapterCorrelator {
    /// See [`correlate`].
    pub fn correlate(networks: &[ResolvedNetwork], live: &[LiveAdapter]) -> Vec<InterfaceBinding> {
        correlate(networks, live)
    }
}

/// Bind each resolved network to its guest interface number.
///
/// Networks whose slot has no live adapter are left out; the guest step
/// simply never sees them.
pub fn correlate(networks: &[ResolvedNetwork], live: &[LiveAdapter]) -> Vec<InterfaceBinding> {
    let numbers = assign_interface_numbers(live);
    debug!(?numbers, "assigned interface numbers");

    let mut bindings: Vec<InterfaceBinding> = networks
        .iter()
        .filter_map(|network| {
            let slot = network.adapter.adapter_slot;
            let Some(&interface_number) = numbers.get(&slot) else {
                debug!(slot, switch = %network.adapter.switch_id, "no live adapter for slot");
                return None;
            };
            Some(InterfaceBinding {
                adapter_slot: slot,
                interface_number,
                network_kind: network.adapter.network_kind,
                network_config: network.config.clone(),
            })
        })
        .collect();

    bindings.sort_by_key(|b| b.adapter_slot);
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NetworkKind, ResolvedAdapterConfig};
    use pretty_assertions::assert_eq;

    fn live(number: u32, adapter_type: &str) -> LiveAdapter {
        LiveAdapter {
            number,
            adapter_type: adapter_type.into(),
            switch_id: None,
        }
    }

    fn resolved(slot: u32) -> ResolvedNetwork {
        ResolvedNetwork {
            declaration_index: 0,
            adapter: ResolvedAdapterConfig {
                adapter_slot: slot,
                switch_id: format!("S{slot}"),
                switch_name: format!("switch {slot}"),
                mac: None,
                nic_type: None,
                network_kind: NetworkKind::Hostonly,
            },
            config: None,
        }
    }

    #[test]
    fn ranks_skip_empty_slots() {
        let adapters = [
            live(4, "hostonly"),
            live(1, "nat"),
            live(2, "none"),
            live(3, "bridged"),
        ];
        let numbers = assign_interface_numbers(&adapters);
        assert_eq!(numbers, BTreeMap::from([(1, 0), (3, 1), (4, 2)]));
    }

    #[test]
    fn declared_slots_map_to_compact_numbers() {
        let adapters = [live(1, "nat"), live(2, "None"), live(3, "hostonly"), live(5, "hostonly")];
        let bindings = AdapterCorrelator::correlate(&[resolved(5), resolved(3)], &adapters);
        let pairs: Vec<(u32, u32)> = bindings
            .iter()
            .map(|b| (b.adapter_slot, b.interface_number))
            .collect();
        assert_eq!(pairs, vec![(3, 1), (5, 2)]);
    }

    #[test]
    fn guest_requests_are_keyed_by_interface_number() {
        let adapters = [live(1, "nat"), live(3, "hostonly"), live(5, "hostonly")];
        let requests: Vec<String> = correlate(&[resolved(3), resolved(5)], &adapters)
            .iter()
            .map(|b| b.to_request().interface)
            .collect();
        assert_eq!(requests, vec!["1".to_owned(), "2".to_owned()]);
    }

    #[test]
    fn missing_live_adapter_is_skipped() {
        let adapters = [live(1, "nat"), live(2, "hostonly")];
        let bindings = correlate(&[resolved(2), resolved(3)], &adapters);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].adapter_slot, 2);
        assert_eq!(bindings[0].interface_number, 1);
    }
}
