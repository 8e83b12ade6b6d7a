//! Test bench configuration
//!
//! Addresses and ports of the two endpoints under test, plus how long to
//! wait for expected frames.

use pktbench_packet::MacAddress;
use rand::Rng;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Endpoint addressing for a test connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestbenchConfig {
    /// Capture/injection device
    pub device: String,
    pub local_mac: MacAddress,
    pub remote_mac: MacAddress,
    pub local_ipv4: Ipv4Addr,
    pub remote_ipv4: Ipv4Addr,
    /// Local transport port; an ephemeral one is picked when unset
    pub local_port: Option<u16>,
    pub remote_port: u16,
    /// Default wait for `Exchange::expect`
    pub recv_timeout: Duration,
}

impl Default for TestbenchConfig {
    fn default() -> Self {
        Self {
            device: "lo".to_string(),
            local_mac: MacAddress::ZERO,
            remote_mac: MacAddress::ZERO,
            local_ipv4: Ipv4Addr::LOCALHOST,
            remote_ipv4: Ipv4Addr::LOCALHOST,
            local_port: None,
            remote_port: 0,
            recv_timeout: Duration::from_secs(1),
        }
    }
}

impl TestbenchConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    pub fn with_local_mac(mut self, mac: MacAddress) -> Self {
        self.local_mac = mac;
        self
    }

    pub fn with_remote_mac(mut self, mac: MacAddress) -> Self {
        self.remote_mac = mac;
        self
    }

    pub fn with_local_ipv4(mut self, addr: Ipv4Addr) -> Self {
        self.local_ipv4 = addr;
        self
    }

    pub fn with_remote_ipv4(mut self, addr: Ipv4Addr) -> Self {
        self.remote_ipv4 = addr;
        self
    }

    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = Some(port);
        self
    }

    pub fn with_remote_port(mut self, port: u16) -> Self {
        self.remote_port = port;
        self
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// The configured local port, or a random one from the dynamic range
    pub fn local_port_or_ephemeral(&self) -> u16 {
        self.local_port
            .unwrap_or_else(|| rand::thread_rng().gen_range(49152..=65535))
    }
}
