//! `hvnet map`: MAC correlation between hypervisor and guest adapters.

use serde::Serialize;
use tabled::Tabled;

use hvnet_core::{
    ApplyOptions, CoreError, GuestApplier, GuestChannel, GuestInterface, GuestNic, HostMacTable,
};

use crate::cli::{GlobalOpts, MapArgs};
use crate::commands::util;
use crate::config;
use crate::error::CliError;
use crate::output;

/// Guest channel backed by a captured adapter list. Read-only.
struct SnapshotGuest {
    nics: Vec<GuestNic>,
}

impl GuestChannel for SnapshotGuest {
    async fn network_adapters(&self) -> Result<Vec<GuestNic>, CoreError> {
        Ok(self.nics.clone())
    }

    async fn configure_static_interface(
        &self,
        _index: u32,
        _net_connection_id: &str,
        _ip: &str,
        _netmask: &str,
    ) -> Result<(), CoreError> {
        Err(read_only())
    }

    async fn configure_dhcp_interface(
        &self,
        _index: u32,
        _net_connection_id: &str,
    ) -> Result<(), CoreError> {
        Err(read_only())
    }

    async fn set_all_networks_to_work(&self) -> Result<(), CoreError> {
        Err(read_only())
    }
}

fn read_only() -> CoreError {
    CoreError::Guest {
        message: "guest snapshot is read-only".into(),
    }
}

#[derive(Debug, Serialize)]
struct MapEntry {
    reference: String,
    #[serde(flatten)]
    interface: GuestInterface,
}

#[derive(Tabled)]
struct MapRow {
    #[tabled(rename = "Adapter")]
    reference: String,
    #[tabled(rename = "Connection")]
    connection: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Index")]
    index: u32,
    #[tabled(rename = "IfIndex")]
    interface_index: u32,
}

impl From<&MapEntry> for MapRow {
    fn from(e: &MapEntry) -> Self {
        Self {
            reference: e.reference.clone(),
            connection: e.interface.net_connection_id.clone(),
            mac: e.interface.mac_address.to_string(),
            index: e.interface.index,
            interface_index: e.interface.interface_index,
        }
    }
}

pub async fn handle(args: &MapArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let macs: HostMacTable = util::read_json(&args.host_macs)?;
    let guest = SnapshotGuest {
        nics: util::read_json(&args.guest_nics)?,
    };

    let map = GuestApplier::new(&guest, ApplyOptions::default())
        .interface_map(&macs)
        .await?;
    for reference in macs.keys().filter(|r| !map.contains_key(*r)) {
        tracing::warn!(reference = %reference, mac = %macs[reference], "no guest adapter matches");
    }

    let entries: Vec<MapEntry> = map
        .into_iter()
        .map(|(reference, interface)| MapEntry {
            reference,
            interface,
        })
        .collect();

    let out = output::render_list(
        config::output_format(global, &cfg),
        &entries,
        |e| MapRow::from(e),
        |e| format!("{} {}", e.reference, e.interface.index),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
