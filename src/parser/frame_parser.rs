//! Frame parser implementation.
//!
//! Decodes raw frame bytes into a [`LayerStack`], starting at the layer the
//! capture's link type names. Decoding is best effort: the first header
//! that does not fit, or announces a protocol we do not model, ends the
//! stack with an opaque layer holding the remaining bytes.

use crate::container::LinkType;
use crate::error::DecodeError;
use crate::layers::{
    ethertype, ip_protocol, Arp, Ethernet, Icmp, Ipv4, Ipv6, Layer, LayerStack, Tcp, Udp,
    ETHERNET_HEADER_LEN, UDP_HEADER_LEN,
};

/// Parser for frames of one link type.
#[derive(Debug, Clone, Copy)]
pub struct FrameParser {
    link_type: LinkType,
}

impl FrameParser {
    /// Create a parser for frames captured with `link_type`.
    pub fn new(link_type: LinkType) -> Self {
        Self { link_type }
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Parse one frame.
    ///
    /// Fails only when the link-layer header itself is missing; every other
    /// inconsistency ends decoding with an opaque layer.
    pub fn parse(&self, frame: &[u8]) -> Result<LayerStack, DecodeError> {
        let mut decoder = Decoder::default();

        match self.link_type {
            LinkType::ETHERNET => {
                let eth = Ethernet::decode(frame).ok_or(DecodeError::PacketTooShort {
                    layer: "Ethernet",
                    expected: ETHERNET_HEADER_LEN,
                    actual: frame.len(),
                })?;
                let ethertype = eth.ethertype;
                decoder.layers.push(Layer::Ethernet(eth));
                decoder.network(ethertype, &frame[ETHERNET_HEADER_LEN..]);
            }
            LinkType::RAW | LinkType::IPV4 | LinkType::IPV6 => {
                let first = frame.first().ok_or(DecodeError::PacketTooShort {
                    layer: "IP",
                    expected: 1,
                    actual: 0,
                })?;
                match (self.link_type, first >> 4) {
                    (LinkType::IPV6, _) | (LinkType::RAW, 6) => decoder.ipv6(frame),
                    (LinkType::IPV4, _) | (LinkType::RAW, 4) => decoder.ipv4(frame),
                    _ => decoder.opaque(frame),
                }
            }
            _ => decoder.opaque(frame),
        }

        Ok(LayerStack::decoded(decoder.layers, decoder.trailer))
    }
}

/// Decode `frame` captured with `link_type`.
pub fn decode(frame: &[u8], link_type: LinkType) -> Result<LayerStack, DecodeError> {
    FrameParser::new(link_type).parse(frame)
}

#[derive(Default)]
struct Decoder {
    layers: Vec<Layer>,
    trailer: Vec<u8>,
}

impl Decoder {
    fn opaque(&mut self, data: &[u8]) {
        if !data.is_empty() {
            self.layers.push(Layer::Opaque(data.to_vec()));
        }
    }

    fn network(&mut self, ethertype: u16, data: &[u8]) {
        match ethertype {
            ethertype::IPV4 => self.ipv4(data),
            ethertype::IPV6 => self.ipv6(data),
            ethertype::ARP => self.arp(data),
            _ => self.opaque(data),
        }
    }

    fn arp(&mut self, data: &[u8]) {
        let Some(arp) = Arp::decode(data) else {
            return self.opaque(data);
        };
        let len = arp.header_len();
        self.layers.push(Layer::Arp(arp));
        self.trailer.extend_from_slice(&data[len..]);
    }

    fn ipv4(&mut self, data: &[u8]) {
        let Some(ip) = Ipv4::decode(data) else {
            return self.opaque(data);
        };
        let header_len = ip.header_bytes();
        let total = ip.total_length as usize;
        let protocol = ip.protocol;
        let fragment = ip.is_fragment();
        self.layers.push(Layer::Ipv4(ip));

        if total < header_len || total > data.len() {
            return self.opaque(&data[header_len..]);
        }

        let payload = &data[header_len..total];
        if fragment {
            self.opaque(payload);
        } else {
            self.transport(protocol, payload, false);
        }
        self.trailer.extend_from_slice(&data[total..]);
    }

    fn ipv6(&mut self, data: &[u8]) {
        let Some(ip) = Ipv6::decode(data) else {
            return self.opaque(data);
        };
        let header_len = ip.header_len();
        let end = header_len + ip.payload_length as usize;
        let next_header = ip.next_header;
        self.layers.push(Layer::Ipv6(ip));

        if end > data.len() {
            return self.opaque(&data[header_len..]);
        }

        self.transport(next_header, &data[header_len..end], true);
        self.trailer.extend_from_slice(&data[end..]);
    }

    fn transport(&mut self, protocol: u8, data: &[u8], over_ipv6: bool) {
        match (protocol, over_ipv6) {
            (ip_protocol::TCP, _) => self.tcp(data),
            (ip_protocol::UDP, _) => self.udp(data),
            (ip_protocol::ICMP, false) => self.icmp(data, Layer::Icmpv4),
            (ip_protocol::ICMPV6, true) => self.icmp(data, Layer::Icmpv6),
            _ => self.opaque(data),
        }
    }

    fn tcp(&mut self, data: &[u8]) {
        let Some(tcp) = Tcp::decode(data) else {
            return self.opaque(data);
        };
        let len = tcp.header_len();
        self.layers.push(Layer::Tcp(tcp));
        self.opaque(&data[len..]);
    }

    fn udp(&mut self, data: &[u8]) {
        let udp = match Udp::decode(data) {
            Some(udp) if (UDP_HEADER_LEN..=data.len()).contains(&(udp.length as usize)) => udp,
            _ => return self.opaque(data),
        };
        let end = udp.length as usize;
        self.layers.push(Layer::Udp(udp));
        self.opaque(&data[UDP_HEADER_LEN..end]);
        // bytes the IP layer carries past the datagram
        self.trailer.extend_from_slice(&data[end..]);
    }

    fn icmp(&mut self, data: &[u8], variant: fn(Icmp) -> Layer) {
        let Some(icmp) = Icmp::decode(data) else {
            return self.opaque(data);
        };
        let len = icmp.header_len();
        self.layers.push(variant(icmp));
        self.opaque(&data[len..]);
    }
}
