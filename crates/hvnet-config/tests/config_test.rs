#![allow(clippy::unwrap_used)]
// Loading and saving machine profiles against real files.

use std::time::Duration;

use pretty_assertions::assert_eq;

use hvnet_config::{
    Config, ConfigError, Machine, load_config_from, machine_to_settings, resolve_machine,
    save_config_to,
};
use hvnet_core::{DeclarationKind, NetworkDeclaration};

const SAMPLE: &str = r#"
default_machine = "web"

[defaults]
output = "json"
guest_timeout = 300

[machines.web]
vm_id = "6f1c0b7e-0000-4000-8000-000000000001"
memory = 2048
maxmemory = 4096
cpus = 2
enable_enhanced_session_mode = true
set_work_network = true

[machines.web.vm_integration_services]
guest_service_interface = true
time_synchronization = false

[[machines.web.networks]]
kind = "private_network"
ip = "192.168.33.10"
netmask = "255.255.255.0"

[[machines.web.networks]]
kind = "public"
bridge = "External LAN"
dhcp = true
"#;

fn write_sample() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();
    (dir, path)
}

#[test]
fn loads_machines_and_networks() {
    let (_dir, path) = write_sample();
    let cfg = load_config_from(&path).unwrap();

    assert_eq!(cfg.defaults.output, "json");
    assert_eq!(cfg.defaults.color, "auto");
    assert!(cfg.defaults.install_managed_switches);

    let web = &cfg.machines["web"];
    assert_eq!(web.networks.len(), 2);
    assert_eq!(web.networks[0].kind, DeclarationKind::Private);
    assert_eq!(web.networks[1].bridge.as_deref(), Some("External LAN"));
    assert!(web.networks[1].auto_config);
}

#[test]
fn machine_translates_to_orchestrator_config() {
    let (_dir, path) = write_sample();
    let cfg = load_config_from(&path).unwrap();
    let (name, machine) = resolve_machine(&cfg, None).unwrap();

    let settings = machine_to_settings(name, machine, &cfg.defaults).unwrap();

    assert_eq!(settings.name, "web");
    assert_eq!(settings.config.guest_timeout, Duration::from_secs(300));
    assert_eq!(settings.config.vm.max_memory, Some(4096));
    assert!(settings.config.vm.enable_enhanced_session_mode);
    assert!(settings.config.set_work_network);
    assert_eq!(settings.config.vm.vm_integration_services.len(), 2);
    assert_eq!(
        settings.networks[0],
        NetworkDeclaration::private_static("192.168.33.10", "255.255.255.0")
    );
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert!(cfg.machines.is_empty());
    assert_eq!(cfg.defaults.guest_timeout, 120);
}

#[test]
fn unknown_network_kind_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[machines.a]\nvm_id = \"x\"\n[[machines.a.networks]]\nkind = \"wormhole\"\n",
    )
    .unwrap();
    assert!(matches!(load_config_from(&path), Err(ConfigError::Figment(_))));
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.machines.insert(
        "db".into(),
        Machine {
            vm_id: "vm-db".into(),
            cpus: Some(4),
            networks: vec![NetworkDeclaration::private_dhcp()],
            ..Machine::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let db = &loaded.machines["db"];
    assert_eq!(db.vm_id, "vm-db");
    assert_eq!(db.cpus, Some(4));
    assert_eq!(db.networks, vec![NetworkDeclaration::private_dhcp()]);
}
