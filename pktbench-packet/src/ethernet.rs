//! Ethernet II link layer
//!
//! Provides the [`Ether`] layer record, its wire codec, and the MAC address and
//! EtherType helpers used to fill it in.

use crate::field::layer_fields;
use crate::layer::{Layer, WireContext};
use crate::parse::{NextProtocol, Parsed};
use bytes::{BufMut, BytesMut};
use pktbench_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// EtherType values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// Any other EtherType
    Custom(u16),
}

impl EtherType {
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => 0x0800,
            EtherType::Custom(val) => val,
        }
    }
}

impl From<EtherType> for u16 {
    fn from(value: EtherType) -> Self {
        value.to_u16()
    }
}

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Zero MAC address (00:00:00:00:00:00)
    pub const ZERO: MacAddress = MacAddress([0x00; 6]);

    /// Create a MAC address from a slice
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.try_into().ok()?;
        Some(MacAddress(bytes))
    }

    /// Get the MAC address as a byte array
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(Error::invalid_parameter("mac", "expected six ':'-separated octets"));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| Error::invalid_parameter("mac", "octet is not hex"))?;
        }

        Ok(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

/// Ethernet II header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ether {
    pub src_addr: Option<MacAddress>,
    pub dst_addr: Option<MacAddress>,
    /// EtherType; inferred from the next layer when unset
    pub ether_type: Option<u16>,
}

layer_fields!(Ether, "Ether", {
    src_addr => "SrcAddr",
    dst_addr => "DstAddr",
    ether_type => "Type",
});

impl Ether {
    /// Ethernet header size (dst + src + type)
    pub const HEADER_SIZE: usize = 14;

    pub(crate) fn to_bytes(&self, ctx: &WireContext<'_>) -> Result<Vec<u8>> {
        let ether_type = match self.ether_type {
            Some(value) => value,
            None => match ctx.next {
                Some(Layer::Ipv4(_)) => EtherType::IPv4.to_u16(),
                Some(other) => {
                    return Err(Error::serialization(format!(
                        "cannot infer EtherType for next layer {}",
                        other.name()
                    )))
                }
                None => {
                    return Err(Error::serialization(
                        "cannot infer EtherType without a next layer",
                    ))
                }
            },
        };

        let mut buffer = BytesMut::with_capacity(Self::HEADER_SIZE + ctx.inner.len());
        buffer.put_slice(self.dst_addr.unwrap_or_default().as_bytes());
        buffer.put_slice(self.src_addr.unwrap_or_default().as_bytes());
        buffer.put_u16(ether_type);
        buffer.put_slice(ctx.inner);
        Ok(buffer.to_vec())
    }
}

/// Parse an Ethernet II header
pub fn parse_ether(data: &[u8]) -> Result<Parsed> {
    if data.len() < Ether::HEADER_SIZE {
        return Err(Error::Truncated {
            layer: Ether::NAME,
            needed: Ether::HEADER_SIZE,
            available: data.len(),
        });
    }

    let ether_type = u16::from_be_bytes([data[12], data[13]]);
    let layer = Ether {
        dst_addr: MacAddress::from_slice(&data[0..6]),
        src_addr: MacAddress::from_slice(&data[6..12]),
        ether_type: Some(ether_type),
    };

    Ok(Parsed {
        layer: Layer::Ether(layer),
        header_len: Ether::HEADER_SIZE,
        data_len: None,
        next: NextProtocol::EtherType(ether_type),
    })
}
