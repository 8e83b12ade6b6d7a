//! BPF filter builders for test bench captures
//!
//! Narrowing the kernel filter to the connection under test keeps unrelated
//! traffic out of `Exchange::expect` and its timeout diffs.

use pktbench_conn::TestbenchConfig;
use pktbench_packet::{IpProtocol, MacAddress};
use std::net::Ipv4Addr;

/// Frames sent from `mac`
pub fn src_mac_filter(mac: MacAddress) -> String {
    format!("ether src {}", mac)
}

/// IPv4 datagrams from `ip`
pub fn src_host_filter(ip: Ipv4Addr) -> String {
    format!("src host {}", ip)
}

/// IPv4 datagrams to `ip`
pub fn dst_host_filter(ip: Ipv4Addr) -> String {
    format!("dst host {}", ip)
}

/// All traffic of one IPv4 protocol
pub fn protocol_filter(protocol: IpProtocol) -> String {
    match protocol {
        IpProtocol::ICMP => "icmp".to_string(),
        IpProtocol::TCP => "tcp".to_string(),
        IpProtocol::UDP => "udp".to_string(),
        IpProtocol::Custom(value) => format!("ip proto {}", value),
    }
}

/// Segments from `port`; `None` for protocols without ports
pub fn src_port_filter(protocol: IpProtocol, port: u16) -> Option<String> {
    port_qualifier(protocol).map(|name| format!("{} src port {}", name, port))
}

/// Segments to `port`; `None` for protocols without ports
pub fn dst_port_filter(protocol: IpProtocol, port: u16) -> Option<String> {
    port_qualifier(protocol).map(|name| format!("{} dst port {}", name, port))
}

fn port_qualifier(protocol: IpProtocol) -> Option<&'static str> {
    match protocol {
        IpProtocol::TCP => Some("tcp"),
        IpProtocol::UDP => Some("udp"),
        _ => None,
    }
}

/// Frames the remote endpoint sends to the local one
///
/// Covers the link layer when the remote MAC is known and the IPv4
/// addresses. With a `protocol` it also covers the remote port, plus the
/// local port if one is configured.
pub fn inbound_filter(config: &TestbenchConfig, protocol: Option<IpProtocol>) -> String {
    let mut parts = Vec::new();
    if config.remote_mac != MacAddress::ZERO {
        parts.push(src_mac_filter(config.remote_mac));
    }
    parts.push(src_host_filter(config.remote_ipv4));
    parts.push(dst_host_filter(config.local_ipv4));
    if let Some(protocol) = protocol {
        match src_port_filter(protocol, config.remote_port) {
            Some(remote) => {
                parts.push(remote);
                parts.extend(
                    config
                        .local_port
                        .and_then(|port| dst_port_filter(protocol, port)),
                );
            }
            None => parts.push(protocol_filter(protocol)),
        }
    }
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    combine_filters(&parts)
}

/// Combine multiple filters with AND logic
pub fn combine_filters(filters: &[&str]) -> String {
    if filters.is_empty() {
        return String::new();
    }

    filters
        .iter()
        .map(|f| format!("({})", f))
        .collect::<Vec<_>>()
        .join(" and ")
}
