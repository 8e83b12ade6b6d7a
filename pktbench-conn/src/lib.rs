//! Connection-level conformance testing
//!
//! A [`Connection`] keeps per-layer state for one logical connection (an
//! Ethernet, IPv4 and TCP stack, say) so tests only spell out the fields they
//! care about. An [`Exchange`] runs a connection over an injector and a
//! sniffer.
//!
//! Layers a connection does not track yet can be learned from matched
//! frames. [`Connection::ether`] does this by default; other constructors
//! opt in with [`Connection::learn_layers`]. A learned TCP layer takes the
//! peer's acknowledgment number as its own next sequence number.
//!
//! ```
//! use pktbench_conn::{Connection, TestbenchConfig};
//! use pktbench_packet::{Layers, Tcp, TcpFlags};
//!
//! let config = TestbenchConfig::default().with_local_port(4000).with_remote_port(80);
//! let conn = Connection::tcp_ipv4(&config);
//! let syn = conn
//!     .create_frame(&Layers::new().with_absent().with_absent().with(Tcp {
//!         flags: Some(TcpFlags::SYN),
//!         ..Default::default()
//!     }))
//!     .unwrap();
//! assert_eq!(syn.tcp().and_then(|tcp| tcp.dst_port), Some(80));
//! ```

pub mod config;
pub mod connection;
pub mod exchange;
pub mod seqnum;
pub mod state;

pub use config::TestbenchConfig;
pub use connection::Connection;
pub use exchange::Exchange;
pub use seqnum::SeqNum;
pub use state::{observed_state, EtherState, Ipv4State, LayerState, TcpState, UdpState};
