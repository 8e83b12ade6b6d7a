//! pktbench core library
//!
//! Shared error handling and the collaborator interfaces (frame injection and
//! capture) used by the pktbench packet-conformance test bench.

pub mod error;
pub mod frame;
pub mod transport;

pub use error::{Error, Result};
pub use frame::Frame;
pub use transport::{Frames, Injector, Sniffer};
