//! Layered packet model for pktbench
//!
//! Packets are chains of protocol layers whose header fields may be left
//! unset. An unset field is a wildcard when matching and is computed (or
//! defaulted) when serializing, so the same types describe both the frames a
//! test sends and the frames it expects to receive.
//!
//! - **Ethernet II**, **IPv4**, **TCP**, **UDP** and a trailing **payload**
//! - Matching, merging and human-readable diffs of layer chains
//! - Serialization with automatic lengths and checksums
//! - Parsing through an extensible dispatch table
//!
//! # Architecture
//!
//! - [`field`] - optional field helpers shared by every layer
//! - [`layer`] - the [`Layer`] enum and [`Layers`] chains
//! - [`ethernet`], [`ip`], [`tcp`], [`udp`], [`payload`] - layer records and codecs
//! - [`diff`] - mismatch reports
//! - [`parse`] - wire-to-layer parsing and the [`Dispatch`] table
//! - [`checksum`] - Internet checksum calculation utilities
//!
//! # Quick Start
//!
//! ## Describing and matching a segment
//!
//! ```rust
//! use pktbench_packet::{Layers, Payload, Tcp, TcpFlags};
//!
//! let expected = Layers::new().with(Tcp {
//!     flags: Some(TcpFlags::SYN_ACK),
//!     ..Default::default()
//! });
//! let received = Layers::new()
//!     .with(Tcp {
//!         src_port: Some(80),
//!         flags: Some(TcpFlags::SYN_ACK),
//!         ..Default::default()
//!     })
//!     .with(Payload::default());
//!
//! assert!(expected.matches(&received));
//! assert_eq!(expected.diff(&received), "");
//! ```
//!
//! ## Building and parsing a UDP frame
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use pktbench_packet::{parse_frame, Ether, Ipv4, Layers, Payload, Udp};
//!
//! let frame = Layers::new()
//!     .with(Ether::default())
//!     .with(Ipv4 {
//!         src_addr: Some(Ipv4Addr::new(192, 168, 1, 1)),
//!         dst_addr: Some(Ipv4Addr::new(192, 168, 1, 2)),
//!         ..Default::default()
//!     })
//!     .with(Udp {
//!         src_port: Some(12345),
//!         dst_port: Some(53),
//!         ..Default::default()
//!     })
//!     .with(Payload::new(b"query".to_vec()));
//!
//! let bytes = frame.to_bytes().unwrap();
//! let parsed = parse_frame(&bytes).unwrap();
//! assert!(frame.matches(&parsed));
//! ```

pub mod checksum;
pub mod diff;
pub mod ethernet;
pub mod field;
pub mod ip;
pub mod layer;
pub mod parse;
pub mod payload;
pub mod tcp;
pub mod udp;

// Re-export commonly used types for convenience
pub use checksum::{internet_checksum, pseudo_header_checksum};
pub use ethernet::{parse_ether, EtherType, Ether, MacAddress};
pub use ip::{parse_ipv4, IpProtocol, Ipv4};
pub use layer::{Layer, Layers, WireContext};
pub use parse::{parse, parse_frame, parse_payload, Dispatch, LayerParser, NextProtocol, Parsed};
pub use payload::Payload;
pub use tcp::{parse_tcp, Tcp, TcpFlags};
pub use udp::{parse_udp, Udp};
