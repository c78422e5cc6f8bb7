//! `hvnet plan`: offline switch resolution against an inventory snapshot.

use std::fmt::Write;

use serde::Serialize;
use tabled::Tabled;

use hvnet_core::{InventorySnapshot, ResolvedNetwork, SwitchPlan, SwitchResolver};

use crate::cli::{GlobalOpts, OutputFormat, PlanArgs};
use crate::commands::{prompt, util};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct PlanView<'a> {
    machine: &'a str,
    default_switch: Option<&'a str>,
    additional_switches: Vec<String>,
    networks: &'a [ResolvedNetwork],
    failures: Vec<FailureView>,
}

#[derive(Debug, Serialize)]
struct FailureView {
    declaration_index: usize,
    label: String,
    error: String,
}

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "Slot")]
    slot: u32,
    #[tabled(rename = "Switch")]
    switch: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Type")]
    config_type: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Netmask")]
    netmask: String,
    #[tabled(rename = "Adapter IP")]
    adapter_ip: String,
}

impl From<&ResolvedNetwork> for NetworkRow {
    fn from(n: &ResolvedNetwork) -> Self {
        let cfg = n.config.as_ref();
        Self {
            slot: n.adapter.adapter_slot,
            switch: n.adapter.switch_name.clone(),
            kind: n.adapter.network_kind.to_string(),
            config_type: cfg.map_or_else(|| "dhcp".into(), |c| c.config_type.to_string()),
            ip: cfg.map(|c| c.ip.to_string()).unwrap_or_default(),
            netmask: cfg.map(|c| c.netmask.to_string()).unwrap_or_default(),
            adapter_ip: cfg.map(|c| c.adapter_ip.to_string()).unwrap_or_default(),
        }
    }
}

pub fn handle(args: &PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let settings = config::active_machine(global, &cfg)?;
    let snapshot: InventorySnapshot = util::read_json(&args.inventory)?;
    tracing::debug!(
        machine = %settings.name,
        networks = settings.networks.len(),
        switches = snapshot.switches.switches.len(),
        "planning networks"
    );

    let mut chooser = prompt::chooser(global);
    let plan = SwitchResolver::new(&snapshot.switches, &snapshot.host)
        .with_provider(&args.provider)
        .with_dhcp_server(args.dhcp_server)
        .resolve(&settings.networks, chooser.as_mut())?;

    let format = config::output_format(global, &cfg);
    let color = output::should_color(config::color_mode(global, &cfg));
    let view = PlanView {
        machine: &settings.name,
        default_switch: plan.default_switch.as_deref(),
        additional_switches: plan.additional_switches(),
        networks: &plan.networks,
        failures: plan
            .failures
            .iter()
            .map(|f| FailureView {
                declaration_index: f.declaration_index,
                label: f.label.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    };

    let out = output::render_single(
        format,
        &view,
        |_| Ok(render_table(&plan, color)),
        |v| v.additional_switches.join("\n"),
    )?;
    output::print_output(&out, global.quiet);

    if format != OutputFormat::Table && !global.quiet {
        for failure in &view.failures {
            eprintln!("{}", output::failure_line(&failure.error, color));
        }
    }
    Ok(())
}

fn render_table(plan: &SwitchPlan, color: bool) -> String {
    let rows: Vec<NetworkRow> = plan.networks.iter().map(NetworkRow::from).collect();
    let mut out = String::new();

    let management = plan.default_switch.as_deref().unwrap_or("(none)");
    let _ = writeln!(out, "{}", output::dim(&format!("Management switch: {management}"), color));
    if rows.is_empty() {
        let _ = writeln!(out, "No networks resolved.");
    } else {
        let _ = writeln!(out, "{}", output::render_table(&rows));
    }
    for failure in &plan.failures {
        let text = format!("{}: {}", failure.label, failure.error);
        let _ = writeln!(out, "{}", output::failure_line(&text, color));
    }
    out.trim_end().to_owned()
}
