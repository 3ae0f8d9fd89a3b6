//! Ordered protocol layers of one frame, and their encoder.

use std::net::IpAddr;

use super::{icmp, ip_protocol, tcp, udp, Ethernet, Ipv4, Ipv6, Layer, Tcp, Udp};
use crate::checksum::{self, PseudoHeader};
use crate::error::ChecksumError;

/// Decoded layers of a frame plus any bytes past the network layer.
///
/// A stack produced by the parser remembers its layers as decoded. Encoding
/// compares against that baseline: untouched stacks are written back
/// verbatim, and only lengths and checksums that depend on changed content
/// are recomputed. Stacks built with [`LayerStack::new`] have no baseline
/// and get all lengths and checksums computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerStack {
    layers: Vec<Layer>,
    trailer: Vec<u8>,
    baseline: Option<Vec<Layer>>,
}

impl LayerStack {
    /// Build a stack from scratch.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self {
            layers,
            trailer: Vec::new(),
            baseline: None,
        }
    }

    pub(crate) fn decoded(layers: Vec<Layer>, trailer: Vec<u8>) -> Self {
        Self {
            baseline: Some(layers.clone()),
            layers,
            trailer,
        }
    }

    /// Attach bytes to emit after the last layer (link-layer padding).
    pub fn with_trailer(mut self, trailer: Vec<u8>) -> Self {
        self.trailer = trailer;
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// True when any layer differs from the decoded baseline.
    pub fn is_modified(&self) -> bool {
        match &self.baseline {
            Some(baseline) => *baseline != self.layers,
            None => true,
        }
    }

    pub fn ethernet(&self) -> Option<&Ethernet> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Ethernet(eth) => Some(eth),
            _ => None,
        })
    }

    pub fn ethernet_mut(&mut self) -> Option<&mut Ethernet> {
        self.layers.iter_mut().find_map(|layer| match layer {
            Layer::Ethernet(eth) => Some(eth),
            _ => None,
        })
    }

    pub fn ipv4(&self) -> Option<&Ipv4> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Ipv4(ip) => Some(ip),
            _ => None,
        })
    }

    pub fn ipv4_mut(&mut self) -> Option<&mut Ipv4> {
        self.layers.iter_mut().find_map(|layer| match layer {
            Layer::Ipv4(ip) => Some(ip),
            _ => None,
        })
    }

    pub fn ipv6(&self) -> Option<&Ipv6> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Ipv6(ip) => Some(ip),
            _ => None,
        })
    }

    pub fn ipv6_mut(&mut self) -> Option<&mut Ipv6> {
        self.layers.iter_mut().find_map(|layer| match layer {
            Layer::Ipv6(ip) => Some(ip),
            _ => None,
        })
    }

    pub fn tcp(&self) -> Option<&Tcp> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Tcp(tcp) => Some(tcp),
            _ => None,
        })
    }

    pub fn udp(&self) -> Option<&Udp> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Udp(udp) => Some(udp),
            _ => None,
        })
    }

    /// Source and destination of the first IP layer.
    pub fn ip_addresses(&self) -> Option<(IpAddr, IpAddr)> {
        self.layers.iter().find_map(Layer::ip_addresses)
    }

    /// Bytes of the undecoded payload, if decoding stopped early.
    pub fn payload(&self) -> Option<&[u8]> {
        match self.layers.last() {
            Some(Layer::Opaque(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Serialize the stack.
    ///
    /// An unmodified decoded stack reproduces its frame byte for byte.
    pub fn encode(&self) -> Result<Vec<u8>, ChecksumError> {
        let baseline = self.baseline.as_deref().filter(|baseline| {
            baseline.len() == self.layers.len()
                && baseline
                    .iter()
                    .zip(&self.layers)
                    .all(|(old, new)| old.same_kind(new))
        });

        if baseline.is_some_and(|baseline| baseline == self.layers.as_slice()) {
            return Ok(serialize(&self.layers, &self.trailer));
        }

        let mut layers = self.layers.clone();

        for (index, layer) in layers.iter_mut().enumerate() {
            if changed(baseline, layer, index) {
                match layer {
                    Layer::Ipv4(ip) => ip.sync_header_len(),
                    Layer::Tcp(tcp) => tcp.sync_data_offset(),
                    _ => {}
                }
            }
        }

        fix_lengths(&mut layers, baseline);
        fix_checksums(&mut layers, baseline)?;
        update_undecoded_checksums(&mut layers, baseline);

        Ok(serialize(&layers, &self.trailer))
    }
}

fn serialize(layers: &[Layer], trailer: &[u8]) -> Vec<u8> {
    let size = layers.iter().map(Layer::encoded_len).sum::<usize>() + trailer.len();
    let mut out = Vec::with_capacity(size);
    for layer in layers {
        layer.write(&mut out);
    }
    out.extend_from_slice(trailer);
    out
}

fn encoded_len(layers: &[Layer]) -> usize {
    layers.iter().map(Layer::encoded_len).sum()
}

fn changed(baseline: Option<&[Layer]>, layer: &Layer, index: usize) -> bool {
    baseline.map_or(true, |baseline| !baseline[index].same_content(layer))
}

/// Apply a size delta to a 16-bit length field, saturating at its bounds.
fn adjust(field: u16, old: usize, new: usize) -> u16 {
    let value = i64::from(field) + new as i64 - old as i64;
    value.clamp(0, i64::from(u16::MAX)) as u16
}

fn exact(len: usize) -> u16 {
    len.min(usize::from(u16::MAX)) as u16
}

/// Rewrite IPv4 total length, IPv6 payload length and UDP length.
///
/// With a baseline each field moves by the change in encoded size below it,
/// so capture quirks (padding, short UDP lengths) survive. Without one the
/// fields are set from the encoded sizes.
fn fix_lengths(layers: &mut [Layer], baseline: Option<&[Layer]>) {
    for index in 0..layers.len() {
        let (head, rest) = layers.split_at_mut(index + 1);
        let new_payload = encoded_len(rest);
        let layer = &mut head[index];
        let old = baseline.map(|baseline| {
            (
                baseline[index].encoded_len(),
                encoded_len(&baseline[index + 1..]),
            )
        });

        match layer {
            Layer::Ipv4(ip) => {
                let new_len = ip.header_bytes() + new_payload;
                ip.total_length = match old {
                    Some((header, payload)) => adjust(ip.total_length, header + payload, new_len),
                    None => exact(new_len),
                };
            }
            Layer::Ipv6(ip) => {
                ip.payload_length = match old {
                    Some((_, payload)) => adjust(ip.payload_length, payload, new_payload),
                    None => exact(new_payload),
                };
            }
            Layer::Udp(udp) => {
                let new_len = udp.header_len() + new_payload;
                udp.length = match old {
                    Some((header, payload)) => adjust(udp.length, header + payload, new_len),
                    None => exact(new_len),
                };
            }
            _ => {}
        }
    }
}

/// Recompute every checksum whose covered content differs from the
/// baseline, innermost first.
fn fix_checksums(layers: &mut [Layer], baseline: Option<&[Layer]>) -> Result<(), ChecksumError> {
    let dirty: Vec<bool> = layers
        .iter()
        .enumerate()
        .map(|(index, layer)| changed(baseline, layer, index))
        .collect();

    for index in (0..layers.len()).rev() {
        let content_changed = dirty[index..].iter().any(|&d| d);

        match &layers[index] {
            Layer::Ipv4(_) => {
                if dirty[index] {
                    let mut header = Vec::new();
                    layers[index].write(&mut header);
                    let value = checksum::ipv4_header_checksum(&header);
                    layers[index].set_checksum(value);
                }
            }
            Layer::Icmpv4(_) => {
                if content_changed {
                    let value = checksum::icmp_checksum(&serialize(&layers[index..], &[]));
                    layers[index].set_checksum(value);
                }
            }
            Layer::Tcp(_) | Layer::Udp(_) | Layer::Icmpv6(_) => {
                let network = layers[..index]
                    .iter()
                    .rposition(|layer| layer.ip_addresses().is_some());
                let pseudo_changed = match (network, baseline) {
                    (Some(network), Some(baseline)) => {
                        baseline[network].ip_addresses() != layers[network].ip_addresses()
                    }
                    _ => true,
                };
                if !content_changed && !pseudo_changed {
                    continue;
                }

                let name = layers[index].name();
                let pseudo = network
                    .and_then(|network| layers[network].ip_addresses())
                    .and_then(|(source, destination)| PseudoHeader::new(source, destination))
                    .ok_or(ChecksumError::MissingPseudoHeader { layer: name })?;

                // IPv4 UDP sent without a checksum keeps it disabled.
                let udp_over_ipv4 = matches!(layers[index], Layer::Udp(_))
                    && matches!(pseudo, PseudoHeader::V4 { .. });
                let disabled = baseline.is_some_and(|baseline| {
                    matches!(&baseline[index], Layer::Udp(udp) if udp.checksum == 0)
                });
                if udp_over_ipv4 && disabled {
                    layers[index].set_checksum(0);
                    continue;
                }

                let segment = serialize(&layers[index..], &[]);
                let value = match &layers[index] {
                    Layer::Tcp(_) => {
                        checksum::transport_checksum(&pseudo, ip_protocol::TCP, &segment)
                    }
                    Layer::Udp(_) => checksum::udp_checksum(&pseudo, &segment),
                    _ => checksum::transport_checksum(&pseudo, ip_protocol::ICMPV6, &segment),
                };
                layers[index].set_checksum(value);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Carry an address change into a transport checksum held in undecoded
/// bytes, as left by snap-length truncation or a first IPv4 fragment.
fn update_undecoded_checksums(layers: &mut [Layer], baseline: Option<&[Layer]>) {
    let Some(baseline) = baseline else {
        return;
    };
    for index in 1..layers.len() {
        let (head, rest) = layers.split_at_mut(index);
        let network = &head[index - 1];
        let (Some(old_network), Some(old_payload)) = (baseline.get(index - 1), baseline.get(index))
        else {
            continue;
        };
        if *old_payload != rest[0] {
            continue;
        }
        let Layer::Opaque(bytes) = &mut rest[0] else {
            continue;
        };

        let (protocol, over_ipv4) = match network {
            Layer::Ipv4(ip) if ip.fragment_offset() == 0 => (ip.protocol, true),
            Layer::Ipv6(ip) => (ip.next_header, false),
            _ => continue,
        };
        let offset = match (protocol, over_ipv4) {
            (ip_protocol::TCP, _) => tcp::CHECKSUM_OFFSET,
            (ip_protocol::UDP, _) => udp::CHECKSUM_OFFSET,
            (ip_protocol::ICMPV6, false) => icmp::CHECKSUM_OFFSET,
            _ => continue,
        };
        let (Some(old), Some(new)) = (old_network.ip_addresses(), network.ip_addresses())
        else {
            continue;
        };
        let (old, new) = (address_bytes(old), address_bytes(new));
        if old == new || old.len() != new.len() {
            continue;
        }
        let Some(field) = bytes.get_mut(offset..offset + 2) else {
            continue;
        };

        let stored = u16::from_be_bytes([field[0], field[1]]);
        let is_udp = protocol == ip_protocol::UDP;
        if is_udp && over_ipv4 && stored == 0 {
            continue;
        }
        let value = match checksum::update(stored, &old, &new) {
            0 if is_udp => 0xffff,
            value => value,
        };
        field.copy_from_slice(&value.to_be_bytes());
    }
}

fn address_bytes((source, destination): (IpAddr, IpAddr)) -> Vec<u8> {
    [source, destination]
        .into_iter()
        .flat_map(|address| match address {
            IpAddr::V4(address) => address.octets().to_vec(),
            IpAddr::V6(address) => address.octets().to_vec(),
        })
        .collect()
}
