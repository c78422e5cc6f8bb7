// ── Virtual switch inventory ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Hyper-V switch type.
///
/// The hypervisor's naming is inverted relative to the declarations: a
/// host-only (`private`) network lives on an `Internal` switch, and a
/// guest-only (`internal`) network lives on a `Private` switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(try_from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SwitchType {
    Nat,
    Internal,
    Private,
    External,
}

impl TryFrom<String> for SwitchType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

impl From<SwitchType> for String {
    fn from(value: SwitchType) -> Self {
        value.to_string()
    }
}

/// One switch as reported by `get_switches` / `get_managed_switches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "SwitchType", alias = "switch_type", alias = "type")]
    pub switch_type: SwitchType,
}

impl SwitchRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, switch_type: SwitchType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            switch_type,
        }
    }

    /// Case-insensitive match on either the name or the id.
    pub fn matches(&self, name_or_id: &str) -> bool {
        self.name.eq_ignore_ascii_case(name_or_id) || self.id.eq_ignore_ascii_case(name_or_id)
    }
}

/// Switch snapshot taken once per resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchInventory {
    /// Switches installed and owned by the provider (the NAT default switch).
    #[serde(default)]
    pub managed: Vec<SwitchRecord>,
    /// Every switch on the host.
    #[serde(default)]
    pub switches: Vec<SwitchRecord>,
}

impl SwitchInventory {
    /// First switch of the given type, in inventory order.
    pub fn first_of(&self, switch_type: SwitchType) -> Option<&SwitchRecord> {
        self.switches.iter().find(|s| s.switch_type == switch_type)
    }

    pub fn of_type(&self, switch_type: SwitchType) -> Vec<&SwitchRecord> {
        self.switches
            .iter()
            .filter(|s| s.switch_type == switch_type)
            .collect()
    }

    /// The managed NAT switch used for the management adapter.
    pub fn default_switch(&self) -> Option<&SwitchRecord> {
        self.managed.iter().find(|s| s.switch_type == SwitchType::Nat)
    }

    pub fn find(&self, name_or_id: &str) -> Option<&SwitchRecord> {
        self.switches.iter().find(|s| s.matches(name_or_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_powershell_records() {
        let json = r#"[
            {"Id": "a1", "Name": "Default Switch", "SwitchType": "NAT"},
            {"Id": "b2", "Name": "Lab", "SwitchType": "Internal"}
        ]"#;
        let switches: Vec<SwitchRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(switches[0].switch_type, SwitchType::Nat);
        assert_eq!(switches[1].switch_type, SwitchType::Internal);
    }

    #[test]
    fn rejects_unknown_switch_type() {
        let json = r#"{"Id": "a1", "Name": "x", "SwitchType": "Overlay"}"#;
        assert!(serde_json::from_str::<SwitchRecord>(json).is_err());
    }

    #[test]
    fn match_is_case_insensitive_on_name_and_id() {
        let s = SwitchRecord::new("ABC-123", "External LAN", SwitchType::External);
        assert!(s.matches("external lan"));
        assert!(s.matches("abc-123"));
        assert!(!s.matches("lan"));
    }

    #[test]
    fn default_switch_comes_from_managed_inventory() {
        let inv = SwitchInventory {
            managed: vec![SwitchRecord::new("nat-1", "Default Switch", SwitchType::Nat)],
            switches: vec![SwitchRecord::new("nat-2", "Other NAT", SwitchType::Nat)],
        };
        assert_eq!(inv.default_switch().unwrap().id, "nat-1");
    }
}
