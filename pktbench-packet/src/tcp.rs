//! TCP transport layer
//!
//! The [`Tcp`] layer record, flag helpers and the TCP wire codec. The
//! checksum covers the IPv4 pseudo-header, so serializing a TCP layer with
//! no checksum set needs an IPv4 layer directly before it.

use crate::checksum::pseudo_header_checksum;
use crate::field::layer_fields;
use crate::ip::{padded_options, IpProtocol};
use crate::layer::{Layer, WireContext};
use crate::parse::{NextProtocol, Parsed};
use bytes::{BufMut, BytesMut};
use pktbench_core::{Error, Result};

/// Bits of the TCP flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFlags;

impl TcpFlags {
    pub const FIN: u8 = 0b0000_0001;
    pub const SYN: u8 = 0b0000_0010;
    pub const RST: u8 = 0b0000_0100;
    pub const PSH: u8 = 0b0000_1000;
    pub const ACK: u8 = 0b0001_0000;
    pub const URG: u8 = 0b0010_0000;
    pub const ECE: u8 = 0b0100_0000;
    pub const CWR: u8 = 0b1000_0000;

    /// SYN+ACK (connection acknowledgment)
    pub const SYN_ACK: u8 = Self::SYN | Self::ACK;

    /// FIN+ACK (connection termination)
    pub const FIN_ACK: u8 = Self::FIN | Self::ACK;

    /// PSH+ACK (push data)
    pub const PSH_ACK: u8 = Self::PSH | Self::ACK;
}

/// TCP header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tcp {
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub seq_num: Option<u32>,
    pub ack_num: Option<u32>,
    /// Header length in bytes (not 32-bit words)
    pub data_offset: Option<u8>,
    /// Flag byte, see [`TcpFlags`]
    pub flags: Option<u8>,
    pub window_size: Option<u16>,
    pub checksum: Option<u16>,
    pub urgent_pointer: Option<u16>,
    /// Raw option bytes, zero-padded to a 4-byte boundary on the wire
    pub options: Option<Vec<u8>>,
}

layer_fields!(Tcp, "TCP", {
    src_port => "SrcPort",
    dst_port => "DstPort",
    seq_num => "SeqNum",
    ack_num => "AckNum",
    data_offset => "DataOffset",
    flags => "Flags",
    window_size => "WindowSize",
    checksum => "Checksum",
    urgent_pointer => "UrgentPointer",
    options => "Options",
});

impl Tcp {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Maximum TCP header size (with maximum options)
    pub const MAX_HEADER_SIZE: usize = 60;

    /// Window advertised when none is given
    pub const DEFAULT_WINDOW_SIZE: u16 = 32768;

    /// True when every bit of `mask` is set in the flag field
    pub fn has_flags(&self, mask: u8) -> bool {
        self.flags.map_or(false, |flags| flags & mask == mask)
    }

    pub(crate) fn to_bytes(&self, ctx: &WireContext<'_>) -> Result<Vec<u8>> {
        let options = padded_options(self.options.as_deref());
        let header_len = Self::MIN_HEADER_SIZE + options.len();
        if header_len > Self::MAX_HEADER_SIZE {
            return Err(Error::serialization(format!(
                "TCP options too long: {} bytes",
                options.len()
            )));
        }
        if let Some(data_offset) = self.data_offset {
            if usize::from(data_offset) != header_len {
                return Err(Error::serialization(format!(
                    "TCP data offset {} does not match header length {}",
                    data_offset, header_len
                )));
            }
        }

        let mut buffer = BytesMut::with_capacity(header_len + ctx.inner.len());
        buffer.put_u16(self.src_port.unwrap_or(0));
        buffer.put_u16(self.dst_port.unwrap_or(0));
        buffer.put_u32(self.seq_num.unwrap_or(0));
        buffer.put_u32(self.ack_num.unwrap_or(0));
        // Data offset in words (4 bits) + reserved
        buffer.put_u8(((header_len / 4) as u8) << 4);
        buffer.put_u8(self.flags.unwrap_or(0));
        buffer.put_u16(self.window_size.unwrap_or(Self::DEFAULT_WINDOW_SIZE));
        buffer.put_u16(0);
        buffer.put_u16(self.urgent_pointer.unwrap_or(0));
        buffer.put_slice(&options);
        buffer.put_slice(ctx.inner);

        let checksum = match (self.checksum, ctx.prev) {
            (Some(checksum), _) => checksum,
            (None, Some(Layer::Ipv4(ip))) => {
                pseudo_header_checksum(ip.src(), ip.dst(), IpProtocol::TCP.to_u8(), &buffer)
            }
            (None, _) => {
                return Err(Error::serialization(
                    "TCP checksum needs an IPv4 layer before it",
                ))
            }
        };
        buffer[16..18].copy_from_slice(&checksum.to_be_bytes());

        Ok(buffer.to_vec())
    }
}

/// Parse a TCP header; the rest of the segment is payload
pub fn parse_tcp(data: &[u8]) -> Result<Parsed> {
    if data.len() < Tcp::MIN_HEADER_SIZE {
        return Err(Error::Truncated {
            layer: Tcp::NAME,
            needed: Tcp::MIN_HEADER_SIZE,
            available: data.len(),
        });
    }

    let header_len = usize::from(data[12] >> 4) * 4;
    if header_len < Tcp::MIN_HEADER_SIZE {
        return Err(Error::malformed(format!(
            "TCP data offset {} is below the minimum",
            header_len
        )));
    }
    if data.len() < header_len {
        return Err(Error::Truncated {
            layer: Tcp::NAME,
            needed: header_len,
            available: data.len(),
        });
    }

    let layer = Tcp {
        src_port: Some(u16::from_be_bytes([data[0], data[1]])),
        dst_port: Some(u16::from_be_bytes([data[2], data[3]])),
        seq_num: Some(u32::from_be_bytes([data[4], data[5], data[6], data[7]])),
        ack_num: Some(u32::from_be_bytes([data[8], data[9], data[10], data[11]])),
        data_offset: Some(header_len as u8),
        flags: Some(data[13]),
        window_size: Some(u16::from_be_bytes([data[14], data[15]])),
        checksum: Some(u16::from_be_bytes([data[16], data[17]])),
        urgent_pointer: Some(u16::from_be_bytes([data[18], data[19]])),
        options: (header_len > Tcp::MIN_HEADER_SIZE)
            .then(|| data[Tcp::MIN_HEADER_SIZE..header_len].to_vec()),
    };

    Ok(Parsed {
        layer: Layer::Tcp(layer),
        header_len,
        data_len: None,
        next: NextProtocol::Payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::validate_checksum;
    use crate::ip::Ipv4;
    use crate::layer::Layers;
    use crate::payload::Payload;
    use std::net::Ipv4Addr;

    #[test]
    fn test_tcp_flag_bits() {
        assert_eq!(TcpFlags::SYN_ACK, 0x12);
        assert_eq!(TcpFlags::FIN_ACK, 0x11);
        assert_eq!(TcpFlags::PSH_ACK, 0x18);
        assert_eq!(TcpFlags::CWR | TcpFlags::ECE | TcpFlags::URG, 0xE0);
    }

    #[test]
    fn test_has_flags() {
        let tcp = Tcp {
            flags: Some(TcpFlags::SYN_ACK),
            ..Default::default()
        };
        assert!(tcp.has_flags(TcpFlags::SYN));
        assert!(tcp.has_flags(TcpFlags::SYN_ACK));
        assert!(!tcp.has_flags(TcpFlags::FIN));
        assert!(!Tcp::default().has_flags(TcpFlags::ACK));
    }

    #[test]
    fn test_tcp_display() {
        let tcp = Tcp {
            src_port: Some(34785),
            dst_port: Some(47767),
            seq_num: Some(3452155723),
            ack_num: Some(2596996163),
            data_offset: Some(5),
            flags: Some(20),
            window_size: Some(64240),
            checksum: Some(0x2e2b),
            ..Default::default()
        };
        assert_eq!(
            tcp.to_string(),
            "TCP{SrcPort:34785 DstPort:47767 SeqNum:3452155723 AckNum:2596996163 \
             DataOffset:5 Flags:20 WindowSize:64240 Checksum:11819}"
        );
    }

    #[test]
    fn test_tcp_checksum_over_pseudo_header() {
        let layers = Layers::new()
            .with(Ipv4 {
                src_addr: Some(Ipv4Addr::new(10, 0, 0, 1)),
                dst_addr: Some(Ipv4Addr::new(10, 0, 0, 2)),
                ..Default::default()
            })
            .with(Tcp {
                src_port: Some(1234),
                dst_port: Some(80),
                flags: Some(TcpFlags::PSH_ACK),
                ..Default::default()
            })
            .with(Payload::new(b"GET /".to_vec()));
        let bytes = layers.to_bytes().unwrap();
        let segment = &bytes[20..];

        assert_eq!(u16::from_be_bytes([segment[14], segment[15]]), Tcp::DEFAULT_WINDOW_SIZE);
        assert_eq!(segment[12] >> 4, 5);

        let mut pseudo = Vec::new();
        pseudo.extend_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2, 0, 6]);
        pseudo.extend_from_slice(&(segment.len() as u16).to_be_bytes());
        pseudo.extend_from_slice(segment);
        assert!(validate_checksum(&pseudo));
    }

    #[test]
    fn test_tcp_without_ipv4_needs_checksum() {
        let layers = Layers::new()
            .with(Tcp::default())
            .with(Payload::default());
        assert!(matches!(layers.to_bytes(), Err(Error::Serialization(_))));

        let layers = Layers::new()
            .with(Tcp {
                checksum: Some(0xABCD),
                ..Default::default()
            })
            .with(Payload::default());
        let bytes = layers.to_bytes().unwrap();
        assert_eq!(&bytes[16..18], &[0xAB, 0xCD]);
    }

    #[test]
    fn test_tcp_explicit_data_offset_mismatch_fails() {
        let layers = Layers::new()
            .with(Tcp {
                data_offset: Some(20),
                checksum: Some(0),
                options: Some(vec![1, 1, 1, 1]),
                ..Default::default()
            })
            .with(Payload::default());
        assert!(matches!(layers.to_bytes(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_parse_tcp_bad_offset() {
        let mut data = [0u8; 20];
        data[12] = 0x40;
        assert!(matches!(parse_tcp(&data), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_parse_tcp_options() {
        let mut data = vec![0u8; 24];
        data[12] = 0x60;
        data[13] = TcpFlags::SYN;
        data[20..24].copy_from_slice(&[3, 3, 2, 0]);
        data.extend_from_slice(b"data");

        let parsed = parse_tcp(&data).unwrap();
        assert_eq!(parsed.header_len, 24);
        assert_eq!(parsed.next, NextProtocol::Payload);
        let Layer::Tcp(tcp) = parsed.layer else {
            panic!("expected TCP layer");
        };
        assert_eq!(tcp.data_offset, Some(24));
        assert_eq!(tcp.options, Some(vec![3, 3, 2, 0]));
        assert!(tcp.has_flags(TcpFlags::SYN));
    }
}
