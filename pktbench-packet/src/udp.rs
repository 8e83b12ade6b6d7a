//! UDP transport layer

use crate::checksum::pseudo_header_checksum;
use crate::field::layer_fields;
use crate::ip::IpProtocol;
use crate::layer::{Layer, WireContext};
use crate::parse::{NextProtocol, Parsed};
use bytes::{BufMut, BytesMut};
use pktbench_core::{Error, Result};

/// UDP header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Udp {
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    /// Header plus data, in bytes
    pub length: Option<u16>,
    pub checksum: Option<u16>,
}

layer_fields!(Udp, "UDP", {
    src_port => "SrcPort",
    dst_port => "DstPort",
    length => "Length",
    checksum => "Checksum",
});

impl Udp {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn to_bytes(&self, ctx: &WireContext<'_>) -> Result<Vec<u8>> {
        let actual_len = Self::HEADER_SIZE + ctx.inner.len();
        let length = match self.length {
            Some(length) if usize::from(length) > actual_len => {
                return Err(Error::serialization(format!(
                    "UDP length {} exceeds the {} bytes available",
                    length, actual_len
                )))
            }
            Some(length) if usize::from(length) < Self::HEADER_SIZE => {
                return Err(Error::serialization(format!(
                    "UDP length {} is shorter than the header",
                    length
                )))
            }
            Some(length) => length,
            None => u16::try_from(actual_len).map_err(|_| {
                Error::serialization(format!("UDP datagram too long: {} bytes", actual_len))
            })?,
        };

        let mut buffer = BytesMut::with_capacity(actual_len);
        buffer.put_u16(self.src_port.unwrap_or(0));
        buffer.put_u16(self.dst_port.unwrap_or(0));
        buffer.put_u16(length);
        buffer.put_u16(0);
        buffer.put_slice(ctx.inner);

        let checksum = match (self.checksum, ctx.prev) {
            (Some(checksum), _) => checksum,
            (None, Some(Layer::Ipv4(ip))) => {
                // Zero on the wire means "no checksum"
                match pseudo_header_checksum(ip.src(), ip.dst(), IpProtocol::UDP.to_u8(), &buffer)
                {
                    0 => 0xFFFF,
                    checksum => checksum,
                }
            }
            (None, _) => {
                return Err(Error::serialization(
                    "UDP checksum needs an IPv4 layer before it",
                ))
            }
        };
        buffer[6..8].copy_from_slice(&checksum.to_be_bytes());

        Ok(buffer.to_vec())
    }
}

/// Parse a UDP header
///
/// The datagram is bounded by its length field.
pub fn parse_udp(data: &[u8]) -> Result<Parsed> {
    if data.len() < Udp::HEADER_SIZE {
        return Err(Error::Truncated {
            layer: Udp::NAME,
            needed: Udp::HEADER_SIZE,
            available: data.len(),
        });
    }

    let length = u16::from_be_bytes([data[4], data[5]]);
    let layer = Udp {
        src_port: Some(u16::from_be_bytes([data[0], data[1]])),
        dst_port: Some(u16::from_be_bytes([data[2], data[3]])),
        length: Some(length),
        checksum: Some(u16::from_be_bytes([data[6], data[7]])),
    };

    Ok(Parsed {
        layer: Layer::Udp(layer),
        header_len: Udp::HEADER_SIZE,
        data_len: Some(usize::from(length)),
        next: NextProtocol::Payload,
    })
}
