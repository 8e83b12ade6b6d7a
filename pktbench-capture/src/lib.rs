//! Live capture and injection for pktbench
//!
//! Real [`Sniffer`](pktbench_core::Sniffer) and
//! [`Injector`](pktbench_core::Injector) backends for running an
//! `Exchange` against a device under test: a pcap capture with BPF
//! filtering and a raw Ethernet sender, plus interface lookup.
//!
//! ## Example
//!
//! ```no_run
//! use pktbench_capture::{config_from_interface, filters, DatalinkInjector, PcapSniffer};
//! use pktbench_conn::{Connection, Exchange};
//! use pktbench_packet::IpProtocol;
//! use std::net::Ipv4Addr;
//!
//! # fn main() -> pktbench_core::Result<()> {
//! let config = config_from_interface("eth1")?
//!     .with_remote_ipv4(Ipv4Addr::new(192, 168, 7, 2))
//!     .with_remote_port(80);
//!
//! let sniffer = PcapSniffer::open(&config.device)?;
//! sniffer.set_filter(&filters::inbound_filter(&config, Some(IpProtocol::TCP)))?;
//! let injector = DatalinkInjector::open(&config.device)?;
//!
//! let mut exchange = Exchange::new(Connection::tcp_ipv4(&config), injector, sniffer);
//! exchange.handshake(config.recv_timeout)?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod filters;
pub mod inject;
pub mod interface;
pub mod stats;

pub use capture::{CaptureConfig, PcapSniffer};
pub use inject::DatalinkInjector;
pub use interface::{config_from_interface, get_interface, list_interfaces, InterfaceInfo};
pub use stats::{CaptureStats, StatsAccumulator};
