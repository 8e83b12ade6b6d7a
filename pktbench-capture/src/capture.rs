//! pcap-backed [`Sniffer`]

use parking_lot::{Mutex, RwLock};
use pcap::{Active, Capture, Device, Linktype};
use pktbench_core::{Error, Frame, Result, Sniffer};
use std::time::{Duration, Instant, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::stats::{CaptureStats, StatsAccumulator};

/// Default snapshot length (maximum bytes per packet)
const DEFAULT_SNAPLEN: i32 = 65535;

/// Default pcap read timeout (milliseconds); bounds how far `recv` can
/// overrun its own timeout
const DEFAULT_TIMEOUT_MS: i32 = 20;

/// Configuration for packet capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// pcap read timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Buffer size (0 = default)
    pub buffer_size: i32,
    /// Enable immediate mode (deliver packets immediately)
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            buffer_size: 0,
            immediate_mode: true,
        }
    }
}

/// Live capture on one interface
pub struct PcapSniffer {
    interface: String,
    capture: Mutex<Capture<Active>>,
    filter: RwLock<Option<String>>,
    stats: StatsAccumulator,
}

impl PcapSniffer {
    /// Open a live capture on `interface` with the default configuration
    pub fn open(interface: &str) -> Result<Self> {
        Self::with_config(interface, &CaptureConfig::default())
    }

    pub fn with_config(interface: &str, config: &CaptureConfig) -> Result<Self> {
        debug!(interface, ?config, "opening pcap capture");

        let mut capture = Capture::from_device(Device::from(interface))
            .map_err(|e| Error::Capture(format!("Failed to create capture: {}", e)))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .immediate_mode(config.immediate_mode);
        if config.buffer_size > 0 {
            capture = capture.buffer_size(config.buffer_size);
        }
        let capture = capture
            .open()
            .map_err(|e| Error::Capture(format!("Failed to open capture on {}: {}", interface, e)))?;

        info!(interface, "capture started");
        Ok(Self {
            interface: interface.to_string(),
            capture: Mutex::new(capture),
            filter: RwLock::new(None),
            stats: StatsAccumulator::new(),
        })
    }

    /// Install a BPF filter on the running capture
    pub fn set_filter(&self, bpf: &str) -> Result<()> {
        self.capture
            .lock()
            .filter(bpf, true)
            .map_err(|e| Error::Capture(format!("Invalid BPF filter '{}': {}", bpf, e)))?;
        *self.filter.write() = Some(bpf.to_string());
        info!(interface = %self.interface, filter = bpf, "BPF filter set");
        Ok(())
    }

    /// The BPF filter currently installed, if any
    pub fn filter(&self) -> Option<String> {
        self.filter.read().clone()
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn datalink(&self) -> Linktype {
        self.capture.lock().get_datalink()
    }

    /// Counters so far, including kernel drops when pcap reports them
    pub fn stats(&self) -> CaptureStats {
        let snapshot = self.stats.snapshot();
        match self.capture.lock().stats() {
            Ok(stats) => snapshot.with_pcap_stats(stats),
            Err(e) => {
                warn!(error = %e, "pcap statistics unavailable");
                snapshot
            }
        }
    }
}

impl Sniffer for PcapSniffer {
    fn recv(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        let deadline = Instant::now() + timeout;
        let capture = self.capture.get_mut();
        loop {
            match capture.next_packet() {
                Ok(packet) => {
                    let data = packet.data.to_vec();
                    self.stats.record_frame(data.len());
                    let ts = packet.header.ts;
                    return Ok(Some(Frame {
                        timestamp: UNIX_EPOCH
                            + Duration::from_secs(ts.tv_sec as u64)
                            + Duration::from_micros(ts.tv_usec as u64),
                        interface: self.interface.clone(),
                        wire_len: packet.header.len as usize,
                        data,
                    }));
                }
                Err(pcap::Error::TimeoutExpired) => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    warn!(interface = %self.interface, error = %e, "capture failed");
                    return Err(Error::Capture(format!("Packet capture error: {}", e)));
                }
            }
        }
    }
}

impl Drop for PcapSniffer {
    fn drop(&mut self) {
        debug!(interface = %self.interface, stats = %self.stats.snapshot(), "capture closed");
    }
}
