//! Address substitution over a decoded layer stack.

use std::collections::HashMap;
use std::net::IpAddr;

use macaddr::MacAddr6;

use crate::error::RewriteWarning;
use crate::layers::{Layer, LayerStack};
use crate::utils::{format_mac, parse_mac};

/// Exact-match address substitutions, one map per field.
///
/// IP maps serve both IPv4 and IPv6 headers; the replacement must be of
/// the same family as the address it replaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressRewritePolicy {
    mac_source: HashMap<MacAddr6, String>,
    mac_destination: HashMap<MacAddr6, String>,
    ip_source: HashMap<IpAddr, String>,
    ip_destination: HashMap<IpAddr, String>,
}

impl AddressRewritePolicy {
    pub fn new(
        mac_source: HashMap<MacAddr6, String>,
        mac_destination: HashMap<MacAddr6, String>,
        ip_source: HashMap<IpAddr, String>,
        ip_destination: HashMap<IpAddr, String>,
    ) -> Self {
        Self {
            mac_source,
            mac_destination,
            ip_source,
            ip_destination,
        }
    }

    pub fn with_mac_source(mut self, from: MacAddr6, to: impl Into<String>) -> Self {
        self.mac_source.insert(from, to.into());
        self
    }

    pub fn with_mac_destination(mut self, from: MacAddr6, to: impl Into<String>) -> Self {
        self.mac_destination.insert(from, to.into());
        self
    }

    pub fn with_ip_source(mut self, from: IpAddr, to: impl Into<String>) -> Self {
        self.ip_source.insert(from, to.into());
        self
    }

    pub fn with_ip_destination(mut self, from: IpAddr, to: impl Into<String>) -> Self {
        self.ip_destination.insert(from, to.into());
        self
    }

    /// Total number of mappings across all four maps.
    pub fn len(&self) -> usize {
        self.mac_source.len()
            + self.mac_destination.len()
            + self.ip_source.len()
            + self.ip_destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of applying a policy to one stack.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub stack: LayerStack,
    /// True when at least one field took a new value.
    pub modified: bool,
    pub warnings: Vec<RewriteWarning>,
}

/// Apply `policy` to the Ethernet and IP addresses of `stack`.
///
/// Each field is looked up once, against its value as decoded, so a
/// mapping `a -> b, b -> a` swaps rather than loops.
pub fn rewrite(mut stack: LayerStack, policy: &AddressRewritePolicy) -> RewriteOutcome {
    let mut modified = false;
    let mut warnings = Vec::new();

    for layer in stack.layers_mut().iter_mut() {
        match layer {
            Layer::Ethernet(eth) => {
                modified |= map_mac(&mut eth.source, &policy.mac_source, &mut warnings);
                modified |= map_mac(&mut eth.destination, &policy.mac_destination, &mut warnings);
            }
            Layer::Ipv4(ip) => {
                let mut source = IpAddr::V4(ip.source);
                let mut destination = IpAddr::V4(ip.destination);
                modified |= map_ip(&mut source, &policy.ip_source, &mut warnings);
                modified |= map_ip(&mut destination, &policy.ip_destination, &mut warnings);
                if let (IpAddr::V4(source), IpAddr::V4(destination)) = (source, destination) {
                    ip.source = source;
                    ip.destination = destination;
                }
            }
            Layer::Ipv6(ip) => {
                let mut source = IpAddr::V6(ip.source);
                let mut destination = IpAddr::V6(ip.destination);
                modified |= map_ip(&mut source, &policy.ip_source, &mut warnings);
                modified |= map_ip(&mut destination, &policy.ip_destination, &mut warnings);
                if let (IpAddr::V6(source), IpAddr::V6(destination)) = (source, destination) {
                    ip.source = source;
                    ip.destination = destination;
                }
            }
            _ => {}
        }
    }

    RewriteOutcome {
        stack,
        modified,
        warnings,
    }
}

fn map_mac(
    field: &mut MacAddr6,
    map: &HashMap<MacAddr6, String>,
    warnings: &mut Vec<RewriteWarning>,
) -> bool {
    let Some(replacement) = map.get(field) else {
        return false;
    };
    match parse_mac(replacement) {
        Some(mac) if mac != *field => {
            *field = mac;
            true
        }
        Some(_) => false,
        None => {
            warnings.push(RewriteWarning::InvalidMac {
                original: format_mac(field),
                replacement: replacement.clone(),
            });
            false
        }
    }
}

/// Substitute `field` in place; the replacement keeps the field's family.
fn map_ip(
    field: &mut IpAddr,
    map: &HashMap<IpAddr, String>,
    warnings: &mut Vec<RewriteWarning>,
) -> bool {
    let Some(replacement) = map.get(field) else {
        return false;
    };
    match replacement.trim().parse::<IpAddr>() {
        Ok(ip) if ip.is_ipv4() == field.is_ipv4() => {
            if ip == *field {
                return false;
            }
            *field = ip;
            true
        }
        _ => {
            warnings.push(RewriteWarning::InvalidIp {
                original: *field,
                replacement: replacement.clone(),
            });
            false
        }
    }
}
