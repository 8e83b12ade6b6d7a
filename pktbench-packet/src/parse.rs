//! Wire-to-layer parsing
//!
//! Each layer parser consumes one header and names the protocol that
//! follows. [`parse`] walks the chain through a [`Dispatch`] table until the
//! remaining bytes become the trailing [`Payload`].

use crate::ethernet::{parse_ether, EtherType};
use crate::ip::{parse_ipv4, IpProtocol};
use crate::layer::{Layer, Layers};
use crate::payload::Payload;
use crate::tcp::parse_tcp;
use crate::udp::parse_udp;
use pktbench_core::Result;
use std::collections::HashMap;
use std::fmt;

/// What follows a parsed header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextProtocol {
    /// Look up an EtherType in the dispatch table
    EtherType(u16),
    /// Look up an IP protocol number in the dispatch table
    IpProtocol(u8),
    /// The rest is application data
    Payload,
    /// Nothing follows
    Done,
}

/// One parsed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub layer: Layer,
    /// Bytes consumed by the header
    pub header_len: usize,
    /// Length of header plus data when the header declares one; bytes past
    /// it are dropped
    pub data_len: Option<usize>,
    pub next: NextProtocol,
}

/// Parses one layer from the front of the buffer
pub type LayerParser = fn(&[u8]) -> Result<Parsed>;

/// Treat the whole buffer as payload
pub fn parse_payload(data: &[u8]) -> Result<Parsed> {
    Ok(Parsed {
        layer: Layer::Payload(Payload::new(data.to_vec())),
        header_len: data.len(),
        data_len: None,
        next: NextProtocol::Done,
    })
}

/// Maps EtherTypes and IP protocol numbers to layer parsers
#[derive(Clone, Default)]
pub struct Dispatch {
    ether_types: HashMap<u16, LayerParser>,
    ip_protocols: HashMap<u8, LayerParser>,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ether_types: Vec<_> = self.ether_types.keys().collect();
        ether_types.sort();
        let mut ip_protocols: Vec<_> = self.ip_protocols.keys().collect();
        ip_protocols.sort();
        f.debug_struct("Dispatch")
            .field("ether_types", &ether_types)
            .field("ip_protocols", &ip_protocols)
            .finish()
    }
}

impl Dispatch {
    /// A table with no entries; everything after the first layer is payload
    pub fn empty() -> Self {
        Self::default()
    }

    /// IPv4 over Ethernet, TCP and UDP over IPv4
    pub fn standard() -> Self {
        Self::empty()
            .with_ether_type(EtherType::IPv4.to_u16(), parse_ipv4)
            .with_ip_protocol(IpProtocol::TCP.to_u8(), parse_tcp)
            .with_ip_protocol(IpProtocol::UDP.to_u8(), parse_udp)
    }

    pub fn with_ether_type(mut self, ether_type: u16, parser: LayerParser) -> Self {
        self.register_ether_type(ether_type, parser);
        self
    }

    pub fn with_ip_protocol(mut self, protocol: u8, parser: LayerParser) -> Self {
        self.register_ip_protocol(protocol, parser);
        self
    }

    /// Register (or replace) the parser for an EtherType
    pub fn register_ether_type(&mut self, ether_type: u16, parser: LayerParser) {
        self.ether_types.insert(ether_type, parser);
    }

    /// Register (or replace) the parser for an IP protocol number
    pub fn register_ip_protocol(&mut self, protocol: u8, parser: LayerParser) {
        self.ip_protocols.insert(protocol, parser);
    }

    /// Parser for the next layer; unknown protocols fall back to payload
    fn lookup(&self, next: NextProtocol) -> Option<LayerParser> {
        match next {
            NextProtocol::EtherType(value) => Some(
                self.ether_types
                    .get(&value)
                    .copied()
                    .unwrap_or(parse_payload as LayerParser),
            ),
            NextProtocol::IpProtocol(value) => Some(
                self.ip_protocols
                    .get(&value)
                    .copied()
                    .unwrap_or(parse_payload as LayerParser),
            ),
            NextProtocol::Payload => Some(parse_payload),
            NextProtocol::Done => None,
        }
    }
}

/// Parse `bytes` into a layer chain starting with `first`
///
/// The chain always ends with exactly one payload layer, possibly empty.
pub fn parse(dispatch: &Dispatch, first: LayerParser, bytes: &[u8]) -> Result<Layers> {
    let mut layers = Layers::new();
    let mut rest = bytes;
    let mut parser = Some(first);

    while let Some(parse_layer) = parser {
        let parsed = parse_layer(rest)?;
        let end = parsed.data_len.map_or(rest.len(), |len| len.min(rest.len()));
        let start = parsed.header_len.min(end);
        let is_payload = matches!(parsed.layer, Layer::Payload(_));
        layers.push(parsed.layer);
        if is_payload {
            break;
        }
        rest = &rest[start..end];
        parser = dispatch.lookup(parsed.next);
    }

    if layers.payload().is_none() {
        layers.push(Payload::new(Vec::new()));
    }
    Ok(layers)
}

/// Parse an Ethernet frame with the standard dispatch table
pub fn parse_frame(bytes: &[u8]) -> Result<Layers> {
    parse(&Dispatch::standard(), parse_ether, bytes)
}
