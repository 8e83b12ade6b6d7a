//! Internet checksum (RFC 1071) helpers used by the IPv4, TCP and UDP codecs.

use std::net::Ipv4Addr;

/// Calculates the Internet Checksum as defined in RFC 1071.
///
/// The data is summed as big-endian 16-bit words (an odd trailing byte is
/// padded with zero), the carries are folded back in, and the one's
/// complement of the result is returned.
///
/// # Examples
///
/// ```
/// use pktbench_packet::checksum::internet_checksum;
///
/// let checksum = internet_checksum(&[0x45, 0x00, 0x00, 0x3c]);
/// assert_eq!(checksum, !0x453cu16);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    !fold(accumulate(0, data))
}

/// Checksum of a TCP or UDP segment including the IPv4 pseudo-header.
///
/// `segment` is the transport header (with a zero checksum field) followed by
/// its payload.
pub fn pseudo_header_checksum(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, segment: &[u8]) -> u16 {
    let mut sum = accumulate(0, &src.octets());
    sum = accumulate(sum, &dst.octets());
    sum += u32::from(protocol);
    sum += segment.len() as u32;
    !fold(accumulate(sum, segment))
}

/// Validates data that already contains its checksum field.
///
/// Summing a correctly checksummed buffer yields all ones, so the checksum
/// computed over it is zero.
pub fn validate_checksum(data: &[u8]) -> bool {
    internet_checksum(data) == 0
}

fn accumulate(mut sum: u32, data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let Some(&byte) = chunks.remainder().first() {
        sum += u32::from(byte) << 8;
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}
