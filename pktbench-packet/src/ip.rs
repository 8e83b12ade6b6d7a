//! IPv4 network layer
//!
//! The [`Ipv4`] layer record and its wire codec. Header and total lengths,
//! TTL, protocol and header checksum are computed on serialization when
//! left unset.

use crate::checksum::internet_checksum;
use crate::field::layer_fields;
use crate::layer::{Layer, WireContext};
use crate::parse::{NextProtocol, Parsed};
use bytes::{BufMut, BytesMut};
use pktbench_core::{Error, Result};
use std::net::Ipv4Addr;

/// IP Protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// ICMP (1)
    ICMP,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// Custom protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::Custom(val) => val,
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(value: IpProtocol) -> Self {
        value.to_u8()
    }
}

/// IPv4 header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv4 {
    /// Header length in bytes (not 32-bit words)
    pub ihl: Option<u8>,
    pub tos: Option<u8>,
    /// Header plus data, in bytes
    pub total_length: Option<u16>,
    pub id: Option<u16>,
    /// Flags (3 bits): reserved, don't fragment, more fragments
    pub flags: Option<u8>,
    /// Fragment offset in 8-byte units (13 bits)
    pub fragment_offset: Option<u16>,
    pub ttl: Option<u8>,
    pub protocol: Option<u8>,
    pub checksum: Option<u16>,
    pub src_addr: Option<Ipv4Addr>,
    pub dst_addr: Option<Ipv4Addr>,
    /// Raw option bytes, zero-padded to a 4-byte boundary on the wire
    pub options: Option<Vec<u8>>,
}

layer_fields!(Ipv4, "IPv4", {
    ihl => "IHL",
    tos => "TOS",
    total_length => "TotalLength",
    id => "ID",
    flags => "Flags",
    fragment_offset => "FragmentOffset",
    ttl => "TTL",
    protocol => "Protocol",
    checksum => "Checksum",
    src_addr => "SrcAddr",
    dst_addr => "DstAddr",
    options => "Options",
});

impl Ipv4 {
    /// Largest value of the 3-bit flags field
    pub const MAX_FLAGS: u8 = 0b111;

    /// Largest value of the 13-bit fragment offset field
    pub const MAX_FRAGMENT_OFFSET: u16 = 0x1FFF;

    /// Minimum IPv4 header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Maximum IPv4 header size (with maximum options)
    pub const MAX_HEADER_SIZE: usize = 60;

    /// TTL used when none is given
    pub const DEFAULT_TTL: u8 = 64;

    /// Source address, or the unspecified address when unset
    pub fn src(&self) -> Ipv4Addr {
        self.src_addr.unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    /// Destination address, or the unspecified address when unset
    pub fn dst(&self) -> Ipv4Addr {
        self.dst_addr.unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    pub(crate) fn to_bytes(&self, ctx: &WireContext<'_>) -> Result<Vec<u8>> {
        let options = padded_options(self.options.as_deref());
        let header_len = Self::MIN_HEADER_SIZE + options.len();
        if header_len > Self::MAX_HEADER_SIZE {
            return Err(Error::serialization(format!(
                "IPv4 options too long: {} bytes",
                options.len()
            )));
        }
        if let Some(ihl) = self.ihl {
            if usize::from(ihl) != header_len {
                return Err(Error::serialization(format!(
                    "IPv4 IHL {} does not match header length {}",
                    ihl, header_len
                )));
            }
        }

        let flags = self.flags.unwrap_or(0);
        if flags > Self::MAX_FLAGS {
            return Err(Error::serialization(format!(
                "IPv4 flags {} do not fit in 3 bits",
                flags
            )));
        }
        let fragment_offset = self.fragment_offset.unwrap_or(0);
        if fragment_offset > Self::MAX_FRAGMENT_OFFSET {
            return Err(Error::serialization(format!(
                "IPv4 fragment offset {} does not fit in 13 bits",
                fragment_offset
            )));
        }

        let actual_len = header_len + ctx.inner.len();
        let total_length = match self.total_length {
            Some(len) if usize::from(len) > actual_len => {
                return Err(Error::serialization(format!(
                    "IPv4 total length {} exceeds the {} bytes available",
                    len, actual_len
                )))
            }
            Some(len) => len,
            None => u16::try_from(actual_len).map_err(|_| {
                Error::serialization(format!("IPv4 datagram too long: {} bytes", actual_len))
            })?,
        };

        let protocol = match self.protocol {
            Some(protocol) => protocol,
            None => match ctx.next {
                Some(Layer::Tcp(_)) => IpProtocol::TCP.to_u8(),
                Some(Layer::Udp(_)) => IpProtocol::UDP.to_u8(),
                Some(other) => {
                    return Err(Error::serialization(format!(
                        "cannot infer IPv4 protocol for next layer {}",
                        other.name()
                    )))
                }
                None => {
                    return Err(Error::serialization(
                        "cannot infer IPv4 protocol without a next layer",
                    ))
                }
            },
        };

        let mut buffer = BytesMut::with_capacity(actual_len);
        // Version (4 bits) + IHL in words (4 bits)
        buffer.put_u8((4 << 4) | ((header_len / 4) as u8));
        buffer.put_u8(self.tos.unwrap_or(0));
        buffer.put_u16(total_length);
        buffer.put_u16(self.id.unwrap_or(0));
        buffer.put_u16((u16::from(flags) << 13) | fragment_offset);
        buffer.put_u8(self.ttl.unwrap_or(Self::DEFAULT_TTL));
        buffer.put_u8(protocol);
        buffer.put_u16(0);
        buffer.put_slice(&self.src().octets());
        buffer.put_slice(&self.dst().octets());
        buffer.put_slice(&options);

        let checksum = self
            .checksum
            .unwrap_or_else(|| internet_checksum(&buffer[..header_len]));
        buffer[10..12].copy_from_slice(&checksum.to_be_bytes());

        buffer.put_slice(ctx.inner);
        Ok(buffer.to_vec())
    }
}

/// Options padded with zeros to a multiple of four bytes
pub(crate) fn padded_options(options: Option<&[u8]>) -> Vec<u8> {
    let mut padded = options.unwrap_or_default().to_vec();
    padded.resize((padded.len() + 3) & !3, 0);
    padded
}

/// Parse an IPv4 header
///
/// The datagram is bounded by its total length; anything past it (link-layer
/// padding) is not part of the parsed chain.
pub fn parse_ipv4(data: &[u8]) -> Result<Parsed> {
    if data.len() < Ipv4::MIN_HEADER_SIZE {
        return Err(Error::Truncated {
            layer: Ipv4::NAME,
            needed: Ipv4::MIN_HEADER_SIZE,
            available: data.len(),
        });
    }

    let version = data[0] >> 4;
    if version != 4 {
        return Err(Error::malformed(format!("IP version {} is not 4", version)));
    }

    let header_len = usize::from(data[0] & 0x0F) * 4;
    if header_len < Ipv4::MIN_HEADER_SIZE {
        return Err(Error::malformed(format!(
            "IPv4 header length {} is below the minimum",
            header_len
        )));
    }
    if data.len() < header_len {
        return Err(Error::Truncated {
            layer: Ipv4::NAME,
            needed: header_len,
            available: data.len(),
        });
    }

    let total_length = u16::from_be_bytes([data[2], data[3]]);
    let flags_and_offset = u16::from_be_bytes([data[6], data[7]]);
    let protocol = data[9];

    let layer = Ipv4 {
        ihl: Some(header_len as u8),
        tos: Some(data[1]),
        total_length: Some(total_length),
        id: Some(u16::from_be_bytes([data[4], data[5]])),
        flags: Some((flags_and_offset >> 13) as u8),
        fragment_offset: Some(flags_and_offset & 0x1FFF),
        ttl: Some(data[8]),
        protocol: Some(protocol),
        checksum: Some(u16::from_be_bytes([data[10], data[11]])),
        src_addr: Some(Ipv4Addr::new(data[12], data[13], data[14], data[15])),
        dst_addr: Some(Ipv4Addr::new(data[16], data[17], data[18], data[19])),
        options: (header_len > Ipv4::MIN_HEADER_SIZE)
            .then(|| data[Ipv4::MIN_HEADER_SIZE..header_len].to_vec()),
    };

    Ok(Parsed {
        layer: Layer::Ipv4(layer),
        header_len,
        data_len: Some(usize::from(total_length)),
        next: NextProtocol::IpProtocol(protocol),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::validate_checksum;
    use crate::layer::Layers;
    use crate::payload::Payload;
    use crate::tcp::Tcp;

    fn addrs() -> (Ipv4Addr, Ipv4Addr) {
        (Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2))
    }

    #[test]
    fn test_ip_protocol_conversion() {
        assert_eq!(IpProtocol::TCP.to_u8(), 6);
        assert_eq!(IpProtocol::UDP.to_u8(), 17);
        assert_eq!(IpProtocol::Custom(99).to_u8(), 99);
        assert_eq!(u8::from(IpProtocol::ICMP), 1);
    }

    #[test]
    fn test_ipv4_display() {
        let ip = Ipv4 {
            ihl: Some(5),
            tos: Some(0),
            total_length: Some(44),
            id: Some(0),
            flags: Some(2),
            fragment_offset: Some(0),
            ttl: Some(64),
            protocol: Some(6),
            checksum: Some(0x2e2b),
            src_addr: Some(Ipv4Addr::new(197, 34, 63, 10)),
            dst_addr: Some(Ipv4Addr::new(197, 34, 63, 20)),
            options: None,
        };
        assert_eq!(
            ip.to_string(),
            "IPv4{IHL:5 TOS:0 TotalLength:44 ID:0 Flags:2 FragmentOffset:0 TTL:64 \
             Protocol:6 Checksum:11819 SrcAddr:197.34.63.10 DstAddr:197.34.63.20}"
        );
    }

    #[test]
    fn test_ipv4_to_bytes_defaults() {
        let (src, dst) = addrs();
        let layers = Layers::new()
            .with(Ipv4 {
                src_addr: Some(src),
                dst_addr: Some(dst),
                ..Default::default()
            })
            .with(Tcp::default())
            .with(Payload::new(vec![0x01, 0x02, 0x03, 0x04]));
        let bytes = layers.to_bytes().unwrap();

        assert_eq!(bytes[0], 0x45);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 44);
        assert_eq!(bytes[8], Ipv4::DEFAULT_TTL);
        assert_eq!(bytes[9], 6);
        assert_eq!(&bytes[12..16], &[192, 168, 1, 1]);
        assert_eq!(&bytes[16..20], &[192, 168, 1, 2]);
        assert!(validate_checksum(&bytes[..20]));
    }

    #[test]
    fn test_ipv4_options_are_padded() {
        let layers = Layers::new()
            .with(Ipv4 {
                protocol: Some(253),
                options: Some(vec![0x01]),
                ..Default::default()
            })
            .with(Payload::default());
        let bytes = layers.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x46);
        assert_eq!(&bytes[20..24], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(bytes.len(), 24);
    }

    #[test]
    fn test_ipv4_explicit_ihl_mismatch_fails() {
        let layers = Layers::new()
            .with(Ipv4 {
                ihl: Some(24),
                protocol: Some(253),
                ..Default::default()
            })
            .with(Payload::default());
        assert!(matches!(layers.to_bytes(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_ipv4_total_length_beyond_data_fails() {
        let layers = Layers::new()
            .with(Ipv4 {
                total_length: Some(100),
                protocol: Some(253),
                ..Default::default()
            })
            .with(Payload::new(vec![0; 4]));
        assert!(matches!(layers.to_bytes(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_ipv4_flags_beyond_three_bits_fail() {
        let ip = |flags| {
            Layers::new()
                .with(Ipv4 {
                    flags: Some(flags),
                    protocol: Some(253),
                    ..Default::default()
                })
                .with(Payload::default())
        };
        assert!(matches!(ip(8).to_bytes(), Err(Error::Serialization(_))));

        let bytes = ip(Ipv4::MAX_FLAGS).to_bytes().unwrap();
        assert_eq!(bytes[6] >> 5, 0b111);
    }

    #[test]
    fn test_ipv4_fragment_offset_beyond_thirteen_bits_fails() {
        let ip = |offset| {
            Layers::new()
                .with(Ipv4 {
                    flags: Some(0b001),
                    fragment_offset: Some(offset),
                    protocol: Some(253),
                    ..Default::default()
                })
                .with(Payload::default())
        };
        assert!(matches!(ip(0x2001).to_bytes(), Err(Error::Serialization(_))));

        let frame = ip(Ipv4::MAX_FRAGMENT_OFFSET);
        let bytes = frame.to_bytes().unwrap();
        assert_eq!(u16::from_be_bytes([bytes[6], bytes[7]]), 0x3FFF);
        let parsed = parse_ipv4(&bytes).unwrap();
        assert!(frame.get(0).unwrap().matches(&parsed.layer));
    }

    #[test]
    fn test_ipv4_protocol_needs_transport() {
        let layers = Layers::new()
            .with(Ipv4::default())
            .with(Payload::new(vec![1]));
        assert!(matches!(layers.to_bytes(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_parse_ipv4_rejects_other_versions() {
        let mut data = [0u8; 20];
        data[0] = 0x65;
        assert!(matches!(parse_ipv4(&data), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_parse_ipv4_truncated_options() {
        let mut data = [0u8; 22];
        data[0] = 0x46;
        assert!(matches!(
            parse_ipv4(&data),
            Err(Error::Truncated {
                layer: "IPv4",
                needed: 24,
                available: 22
            })
        ));
    }
}
