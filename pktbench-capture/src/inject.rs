//! `pnet_datalink`-backed [`Injector`]

use pktbench_core::{Error, Injector, Result};
use pnet_datalink::{self, Channel, DataLinkSender};
use tracing::{debug, info};

use crate::stats::{CaptureStats, StatsAccumulator};

/// Raw Ethernet sender bound to one interface
pub struct DatalinkInjector {
    interface: String,
    tx: Box<dyn DataLinkSender>,
    stats: StatsAccumulator,
}

impl DatalinkInjector {
    /// Open an Ethernet channel on `interface`
    pub fn open(interface: &str) -> Result<Self> {
        let device = pnet_datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface)
            .ok_or_else(|| Error::InterfaceNotFound(interface.to_string()))?;

        let tx = match pnet_datalink::channel(&device, Default::default()) {
            Ok(Channel::Ethernet(tx, _rx)) => tx,
            Ok(_) => return Err(Error::Injection("Unsupported channel type".to_string())),
            Err(e) => {
                return Err(Error::Injection(format!(
                    "Failed to create channel on {}: {}",
                    interface, e
                )))
            }
        };

        info!(interface, "injector ready");
        Ok(Self {
            interface: interface.to_string(),
            tx,
            stats: StatsAccumulator::new(),
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Frames and bytes sent so far
    pub fn stats(&self) -> CaptureStats {
        self.stats.snapshot()
    }
}

impl Injector for DatalinkInjector {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.tx
            .send_to(frame, None)
            .ok_or_else(|| Error::Injection("Failed to send packet".to_string()))?
            .map_err(|e| Error::Injection(format!("Send error: {}", e)))?;
        self.stats.record_frame(frame.len());
        debug!(interface = %self.interface, len = frame.len(), "frame injected");
        Ok(())
    }
}
