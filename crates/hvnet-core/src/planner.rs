// ── Address planning ──
//
// Pure subnet arithmetic for host-only and internal networks: adapter
// address, netmask, DHCP bounds, and the collision checks against the
// host snapshot. No I/O happens here.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{
    ConfigType, DhcpRange, HostInventory, HostOnlyInterface, Netmask, NetworkConfig,
    NetworkDeclaration,
};

/// Address handed to DHCP networks when no host-only interface matches.
pub const DEFAULT_DHCP_IP: &str = "172.28.128.1";

pub const DEFAULT_IPV4_NETMASK: &str = "255.255.255.0";

pub const DEFAULT_IPV6_PREFIX: u8 = 64;

/// Host bits a static network needs: adapter plus guest.
const STATIC_HOST_BITS: u8 = 2;

/// Host bits a DHCP network needs: adapter, server, and a lease range.
const DHCP_HOST_BITS: u8 = 3;

/// A partial configuration request, usually derived from a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub ip: Option<String>,
    pub netmask: Option<String>,
    pub dhcp: bool,
    /// Host-only interface name to reuse for DHCP networks.
    pub name: Option<String>,
    pub adapter_ip: Option<String>,
    pub dhcp_ip: Option<String>,
    pub dhcp_lower: Option<String>,
    pub dhcp_upper: Option<String>,
    pub auto_config: bool,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            ip: None,
            netmask: None,
            dhcp: false,
            name: None,
            adapter_ip: None,
            dhcp_ip: None,
            dhcp_lower: None,
            dhcp_upper: None,
            auto_config: true,
        }
    }
}

impl From<&NetworkDeclaration> for PlanRequest {
    fn from(decl: &NetworkDeclaration) -> Self {
        Self {
            ip: decl.ip.clone(),
            netmask: decl.netmask.clone(),
            dhcp: decl.wants_dhcp(),
            name: decl.name.clone(),
            adapter_ip: decl.adapter_ip.clone(),
            dhcp_ip: decl.dhcp_ip.clone(),
            dhcp_lower: decl.dhcp_lower.clone(),
            dhcp_upper: decl.dhcp_upper.clone(),
            auto_config: decl.auto_config,
        }
    }
}

/// Computes [`NetworkConfig`]s against a host snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AddressPlanner<'a> {
    host: &'a HostInventory,
}

impl<'a> AddressPlanner<'a> {
    pub fn new(host: &'a HostInventory) -> Self {
        Self { host }
    }

    /// Produce a complete address plan, validated against the host.
    pub fn plan(&self, req: &PlanRequest) -> Result<NetworkConfig, CoreError> {
        let mut req = req.clone();
        if req.dhcp && req.ip.is_none() {
            match find_matching_host_only(
                &self.host.host_only,
                req.name.as_deref(),
                None,
                req.netmask.as_deref(),
            ) {
                Some(iface) => {
                    debug!(interface = %iface.name, ip = %iface.ip, "reusing host-only interface address");
                    req.ip = Some(iface.ip.clone());
                    if req.netmask.is_none() {
                        req.netmask = Some(iface.netmask.clone());
                    }
                }
                None => {
                    debug!(ip = DEFAULT_DHCP_IP, "no matching host-only interface, using default");
                    req.ip = Some(DEFAULT_DHCP_IP.to_owned());
                }
            }
        }

        let ip_str = req.ip.as_deref().ok_or_else(|| CoreError::AddressInvalid {
            ip: String::new(),
            netmask: req.netmask.clone().unwrap_or_default(),
            message: "a static network needs an IP address".into(),
        })?;
        let parsed = parse_network(ip_str, req.netmask.as_deref())?;

        self.check_collisions(&parsed.net)?;
        self.check_reserved(parsed.ip, &parsed.net)?;

        build_config(&req, &parsed)
    }

    /// Plan a bridged static network: addressing only, no host checks.
    pub fn passthrough(req: &PlanRequest) -> Result<NetworkConfig, CoreError> {
        let ip_str = req.ip.as_deref().ok_or_else(|| CoreError::AddressInvalid {
            ip: String::new(),
            netmask: req.netmask.clone().unwrap_or_default(),
            message: "a static network needs an IP address".into(),
        })?;
        let parsed = parse_network(ip_str, req.netmask.as_deref())?;
        build_config(req, &parsed)
    }

    fn check_collisions(&self, net: &IpNet) -> Result<(), CoreError> {
        for iface in &self.host.bridged {
            if iface.is_down() {
                continue;
            }
            let (Some(ip), Some(netmask)) = (&iface.ip, &iface.netmask) else {
                continue;
            };
            let theirs = match parse_network(ip, Some(netmask)) {
                Ok(parsed) => parsed.net,
                Err(e) => {
                    debug!(interface = %iface.name, error = %e, "skipping unparseable bridged interface");
                    continue;
                }
            };
            if theirs.network() == net.network() {
                return Err(CoreError::NetworkCollision {
                    network: net.trunc().to_string(),
                    interface: iface.name.clone(),
                    interface_network: theirs.trunc().to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_reserved(&self, ip: IpAddr, net: &IpNet) -> Result<(), CoreError> {
        let mut ranges = Vec::new();
        for raw in &self.host.reserved {
            let range: IpNet = match raw.parse() {
                Ok(range) => range,
                Err(e) => {
                    debug!(range = %raw, error = %e, "skipping unparseable reserved range");
                    continue;
                }
            };
            if range.contains(&ip) || range.contains(net) || net.contains(&range) {
                ranges.push(raw.clone());
            }
        }
        if ranges.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ReservedSubnet {
                ip: ip.to_string(),
                ranges,
            })
        }
    }
}

/// Find a host-only interface by exact name, or else by subnet.
///
/// Hyper-V hosts expose a single host-only interface today, but the
/// lookup works over any number of them.
pub fn find_matching_host_only<'h>(
    interfaces: &'h [HostOnlyInterface],
    name: Option<&str>,
    ip: Option<&str>,
    netmask: Option<&str>,
) -> Option<&'h HostOnlyInterface> {
    if let Some(name) = name {
        if let Some(iface) = interfaces.iter().find(|i| i.name == name) {
            return Some(iface);
        }
    }
    let wanted = parse_network(ip?, netmask).ok()?.net.network();
    interfaces.iter().find(|i| {
        parse_network(&i.ip, Some(&i.netmask)).is_ok_and(|theirs| theirs.net.network() == wanted)
    })
}

/// Network address of `ip` under `netmask`, with the same defaults as
/// [`AddressPlanner::plan`].
pub fn network_address(ip: &str, netmask: Option<&str>) -> Result<IpAddr, CoreError> {
    parse_network(ip, netmask).map(|p| p.net.network())
}

// ── Parsing ──────────────────────────────────────────────────────────

struct ParsedNetwork {
    ip: IpAddr,
    netmask: Netmask,
    net: IpNet,
}

fn invalid(ip: &str, netmask: &str, message: impl Into<String>) -> CoreError {
    CoreError::AddressInvalid {
        ip: ip.to_owned(),
        netmask: netmask.to_owned(),
        message: message.into(),
    }
}

fn parse_network(ip_str: &str, netmask: Option<&str>) -> Result<ParsedNetwork, CoreError> {
    let shown_mask = netmask.unwrap_or("");
    let ip: IpAddr = ip_str
        .trim()
        .parse()
        .map_err(|e: std::net::AddrParseError| invalid(ip_str, shown_mask, e.to_string()))?;

    match ip {
        IpAddr::V4(v4) => {
            let raw = netmask.unwrap_or(DEFAULT_IPV4_NETMASK);
            let prefix = match Netmask::try_from(raw.to_owned()).map_err(|e| invalid(ip_str, raw, e))? {
                Netmask::V4(mask) => {
                    ipnet::ipv4_mask_to_prefix(mask).map_err(|e| invalid(ip_str, raw, e.to_string()))?
                }
                Netmask::Prefix(len) => len,
            };
            let net = Ipv4Net::new(v4, prefix).map_err(|e| invalid(ip_str, raw, e.to_string()))?;
            Ok(ParsedNetwork {
                ip,
                netmask: Netmask::V4(net.netmask()),
                net: IpNet::V4(net),
            })
        }
        IpAddr::V6(v6) => {
            let prefix_str = DEFAULT_IPV6_PREFIX.to_string();
            let raw = netmask.unwrap_or(&prefix_str);
            let prefix = match Netmask::try_from(raw.to_owned()).map_err(|e| invalid(ip_str, raw, e))? {
                Netmask::Prefix(len) => len,
                Netmask::V4(_) => {
                    return Err(invalid(ip_str, raw, "IPv6 networks take a prefix length"));
                }
            };
            let net = Ipv6Net::new(v6, prefix).map_err(|e| invalid(ip_str, raw, e.to_string()))?;
            Ok(ParsedNetwork {
                ip,
                netmask: Netmask::Prefix(prefix),
                net: IpNet::V6(net),
            })
        }
    }
}

// ── Address arithmetic ───────────────────────────────────────────────

/// `network | n`. Callers keep `n` below the host size.
fn nth_address(net: &IpNet, n: u8) -> IpAddr {
    match net {
        IpNet::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4.network()) | u32::from(n))),
        IpNet::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6.network()) | u128::from(n))),
    }
}

/// The address just below the broadcast (or last) address.
fn last_usable(net: &IpNet) -> IpAddr {
    match net {
        IpNet::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4.broadcast()).saturating_sub(1))),
        IpNet::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6.broadcast()).saturating_sub(1))),
    }
}

fn host_bits(net: &IpNet) -> u8 {
    net.max_prefix_len() - net.prefix_len()
}

/// Strictly inside: not the network address, not the broadcast address.
fn strictly_inside(net: &IpNet, addr: IpAddr) -> bool {
    net.contains(&addr) && addr != net.network() && addr != net.broadcast()
}

fn parse_override(
    field: &str,
    value: Option<&String>,
    net: &IpNet,
    parsed: &ParsedNetwork,
) -> Result<Option<IpAddr>, CoreError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let shown_ip = parsed.ip.to_string();
    let shown_mask = parsed.netmask.to_string();
    let addr: IpAddr = raw
        .trim()
        .parse()
        .map_err(|e: std::net::AddrParseError| invalid(&shown_ip, &shown_mask, format!("{field} '{raw}': {e}")))?;
    if !strictly_inside(net, addr) {
        return Err(invalid(
            &shown_ip,
            &shown_mask,
            format!("{field} {addr} is outside {}", net.trunc()),
        ));
    }
    Ok(Some(addr))
}

fn build_config(req: &PlanRequest, parsed: &ParsedNetwork) -> Result<NetworkConfig, CoreError> {
    let net = &parsed.net;
    let shown_ip = parsed.ip.to_string();
    let shown_mask = parsed.netmask.to_string();
    let ipv6 = matches!(net, IpNet::V6(_));

    let needed = if req.dhcp { DHCP_HOST_BITS } else { STATIC_HOST_BITS };
    if host_bits(net) < needed {
        return Err(invalid(
            &shown_ip,
            &shown_mask,
            format!("subnet {} is too small", net.trunc()),
        ));
    }

    let adapter_ip =
        parse_override("adapter_ip", req.adapter_ip.as_ref(), net, parsed)?.unwrap_or_else(|| nth_address(net, 1));

    let dhcp = if req.dhcp {
        let server =
            parse_override("dhcp_ip", req.dhcp_ip.as_ref(), net, parsed)?.unwrap_or_else(|| nth_address(net, 2));
        let lower = parse_override("dhcp_lower", req.dhcp_lower.as_ref(), net, parsed)?
            .unwrap_or_else(|| nth_address(net, 3));
        let upper =
            parse_override("dhcp_upper", req.dhcp_upper.as_ref(), net, parsed)?.unwrap_or_else(|| last_usable(net));

        if lower >= upper {
            return Err(invalid(
                &shown_ip,
                &shown_mask,
                format!("DHCP range {lower}-{upper} is empty"),
            ));
        }
        if [server, lower, upper].contains(&adapter_ip) {
            return Err(invalid(
                &shown_ip,
                &shown_mask,
                format!("DHCP addresses must not reuse the adapter address {adapter_ip}"),
            ));
        }
        Some(DhcpRange { server, lower, upper })
    } else {
        None
    };

    Ok(NetworkConfig {
        config_type: ConfigType::for_family(req.dhcp, ipv6),
        adapter_ip,
        ip: parsed.ip,
        netmask: parsed.netmask,
        dhcp,
        auto_config: req.auto_config,
    })
}
