//! Network interface lookup
//!
//! Enumerates interfaces through `pnet_datalink` and turns one into a
//! starting [`TestbenchConfig`] for the local side of a test.

use ipnetwork::IpNetwork;
use pktbench_conn::TestbenchConfig;
use pktbench_core::{Error, Result};
use pktbench_packet::MacAddress;
use pnet_datalink::{self, NetworkInterface};
use std::fmt;
use std::net::Ipv4Addr;

/// Information about a network interface
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    /// Interface name (e.g., "eth0", "wlan0")
    pub name: String,
    /// Kernel interface index
    pub index: u32,
    pub mac: Option<MacAddress>,
    /// Assigned networks
    pub ips: Vec<IpNetwork>,
    pub is_up: bool,
    pub is_loopback: bool,
}

impl From<&NetworkInterface> for InterfaceInfo {
    fn from(iface: &NetworkInterface) -> Self {
        InterfaceInfo {
            name: iface.name.clone(),
            index: iface.index,
            mac: iface
                .mac
                .map(|mac| MacAddress([mac.0, mac.1, mac.2, mac.3, mac.4, mac.5])),
            ips: iface.ips.clone(),
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl InterfaceInfo {
    /// First IPv4 address assigned to the interface
    pub fn primary_ipv4(&self) -> Option<Ipv4Addr> {
        self.ips.iter().find_map(|network| match network {
            IpNetwork::V4(v4) => Some(v4.ip()),
            IpNetwork::V6(_) => None,
        })
    }

    /// Configuration with this interface as the local endpoint
    ///
    /// Remote addresses and ports are left at their defaults.
    pub fn testbench_config(&self) -> Result<TestbenchConfig> {
        let local_ipv4 = self.primary_ipv4().ok_or_else(|| {
            Error::invalid_parameter("interface", format!("{} has no IPv4 address", self.name))
        })?;
        Ok(TestbenchConfig::new(self.name.clone())
            .with_local_mac(self.mac.unwrap_or(MacAddress::ZERO))
            .with_local_ipv4(local_ipv4))
    }
}

impl fmt::Display for InterfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(mac) = self.mac {
            write!(f, " {}", mac)?;
        }
        for ip in &self.ips {
            write!(f, " {}", ip)?;
        }
        if !self.is_up {
            write!(f, " (down)")?;
        }
        Ok(())
    }
}

/// List all available network interfaces
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>> {
    let interfaces = pnet_datalink::interfaces();

    if interfaces.is_empty() {
        return Err(Error::Capture(
            "No network interfaces found. Are you running with sufficient privileges?".to_string(),
        ));
    }

    Ok(interfaces.iter().map(InterfaceInfo::from).collect())
}

/// Get information about a specific interface by name
pub fn get_interface(name: &str) -> Result<InterfaceInfo> {
    pnet_datalink::interfaces()
        .iter()
        .find(|iface| iface.name == name)
        .map(InterfaceInfo::from)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}

/// Local-side configuration for the interface called `name`
pub fn config_from_interface(name: &str) -> Result<TestbenchConfig> {
    get_interface(name)?.testbench_config()
}
