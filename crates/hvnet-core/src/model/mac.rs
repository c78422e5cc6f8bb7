// ── MAC address identity ──
//
// The only key shared by the hypervisor and the guest. Both sides report
// MACs in their own format (Hyper-V: bare uppercase hex, Windows guests:
// colon separated), so everything is folded to one canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MAC address, normalized to 12 lowercase hex digits with no separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, dotted (Cisco) or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw
            .as_ref()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.') && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        Self(normalized)
    }

    /// The normalized form, e.g. `00155d010203`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the normalized value is exactly six hex octets.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 12 && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str(&self.0);
        }
        for (i, octet) in self.0.as_bytes().chunks(2).enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            // chunks of an ASCII hex string are always valid UTF-8
            f.write_str(std::str::from_utf8(octet).map_err(|_| fmt::Error)?)?;
        }
        Ok(())
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for MacAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}
