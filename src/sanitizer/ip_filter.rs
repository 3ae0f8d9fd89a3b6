//! IP blocklist filter.

use std::collections::HashSet;
use std::net::IpAddr;

use crate::layers::LayerStack;

/// Set of addresses whose traffic is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    blocked: HashSet<IpAddr>,
}

impl FilterPolicy {
    pub fn new(blocked: HashSet<IpAddr>) -> Self {
        Self { blocked }
    }

    /// Add one address to the blocklist.
    pub fn with_blocked(mut self, ip: IpAddr) -> Self {
        self.blocked.insert(ip);
        self
    }

    pub fn is_blocked(&self, ip: &IpAddr) -> bool {
        self.blocked.contains(ip)
    }

    /// Blocked addresses, in no particular order.
    pub fn blocked(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.blocked.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

/// Whether a frame survives the filter.
///
/// Frames without an IP layer are kept.
pub fn should_keep(stack: &LayerStack, policy: &FilterPolicy) -> bool {
    match stack.ip_addresses() {
        Some((source, destination)) => {
            !policy.is_blocked(&source) && !policy.is_blocked(&destination)
        }
        None => true,
    }
}
