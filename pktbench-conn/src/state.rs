//! Per-layer connection state
//!
//! A [`Connection`](crate::Connection) keeps one [`LayerState`] for each
//! position of the frames it exchanges. Each state supplies the fields it
//! owns for outgoing frames, the fields it expects on incoming ones, and
//! learns from frames that were sent or matched.

use crate::config::TestbenchConfig;
use crate::seqnum::SeqNum;
use pktbench_core::{Error, Result};
use pktbench_packet::{Ether, Ipv4, Layer, Layers, Tcp, TcpFlags, Udp};
use rand::Rng;
use std::fmt;

/// State tracked for one layer position of a connection
pub trait LayerState: Send + fmt::Debug {
    /// Fields this state fills in on outgoing frames
    fn outgoing(&self) -> Layer;

    /// Fields expected on an incoming frame at this position
    ///
    /// `received` is the layer of the candidate frame at the same position,
    /// for expectations that depend on what arrived (e.g. an ACK number is
    /// only expected when the ACK flag is set).
    fn incoming(&self, received: Option<&Layer>) -> Layer;

    /// Called after `frame` was sent, with the index of this state's layer
    fn sent(&mut self, frame: &Layers, index: usize) -> Result<()>;

    /// Called after `frame` was received and matched
    fn received(&mut self, frame: &Layers, index: usize) -> Result<()>;
}

fn layer_at<'a, T>(
    frame: &'a Layers,
    index: usize,
    name: &str,
    pick: fn(&Layer) -> Option<&T>,
) -> Result<&'a T> {
    frame.get(index).and_then(pick).ok_or_else(|| {
        Error::invalid_parameter("frame", format!("layer {} of {} is not {}", index, frame, name))
    })
}

/// Link-layer addressing
#[derive(Debug, Clone, Default)]
pub struct EtherState {
    out: Ether,
    expected: Ether,
}

impl EtherState {
    pub fn new(config: &TestbenchConfig) -> Self {
        Self {
            out: Ether {
                src_addr: Some(config.local_mac),
                dst_addr: Some(config.remote_mac),
                ..Default::default()
            },
            expected: Ether {
                src_addr: Some(config.remote_mac),
                dst_addr: Some(config.local_mac),
                ..Default::default()
            },
        }
    }
}

impl LayerState for EtherState {
    fn outgoing(&self) -> Layer {
        Layer::Ether(self.out.clone())
    }

    fn incoming(&self, _received: Option<&Layer>) -> Layer {
        Layer::Ether(self.expected.clone())
    }

    fn sent(&mut self, _frame: &Layers, _index: usize) -> Result<()> {
        Ok(())
    }

    fn received(&mut self, _frame: &Layers, _index: usize) -> Result<()> {
        Ok(())
    }
}

/// Network-layer addressing
#[derive(Debug, Clone, Default)]
pub struct Ipv4State {
    out: Ipv4,
    expected: Ipv4,
}

impl Ipv4State {
    pub fn new(config: &TestbenchConfig) -> Self {
        Self {
            out: Ipv4 {
                src_addr: Some(config.local_ipv4),
                dst_addr: Some(config.remote_ipv4),
                ..Default::default()
            },
            expected: Ipv4 {
                src_addr: Some(config.remote_ipv4),
                dst_addr: Some(config.local_ipv4),
                ..Default::default()
            },
        }
    }

    /// State for a peer first seen as the sender of `ip`
    pub fn observed(ip: &Ipv4) -> Self {
        Self {
            out: Ipv4 {
                src_addr: ip.dst_addr,
                dst_addr: ip.src_addr,
                ..Default::default()
            },
            expected: Ipv4 {
                src_addr: ip.src_addr,
                dst_addr: ip.dst_addr,
                ..Default::default()
            },
        }
    }
}

impl LayerState for Ipv4State {
    fn outgoing(&self) -> Layer {
        Layer::Ipv4(self.out.clone())
    }

    fn incoming(&self, _received: Option<&Layer>) -> Layer {
        Layer::Ipv4(self.expected.clone())
    }

    fn sent(&mut self, _frame: &Layers, _index: usize) -> Result<()> {
        Ok(())
    }

    fn received(&mut self, _frame: &Layers, _index: usize) -> Result<()> {
        Ok(())
    }
}

/// Ports plus sequence and acknowledgment tracking
#[derive(Debug, Clone)]
pub struct TcpState {
    local_port: u16,
    remote_port: u16,
    local_seq: SeqNum,
    remote_seq: Option<SeqNum>,
}

impl TcpState {
    /// Fresh state with a random initial sequence number
    pub fn new(local_port: u16, remote_port: u16) -> Self {
        Self::with_isn(local_port, remote_port, SeqNum(rand::thread_rng().gen()))
    }

    pub fn with_isn(local_port: u16, remote_port: u16, isn: SeqNum) -> Self {
        Self {
            local_port,
            remote_port,
            local_seq: isn,
            remote_seq: None,
        }
    }

    /// State for a peer first seen as the sender of `tcp`
    ///
    /// The peer's acknowledgment number becomes our next sequence number,
    /// so its later segments keep matching. Without one the ISN is random.
    pub fn observed(tcp: &Tcp) -> Self {
        let local_port = tcp.dst_port.unwrap_or(0);
        let remote_port = tcp.src_port.unwrap_or(0);
        match tcp.ack_num {
            Some(ack) => Self::with_isn(local_port, remote_port, SeqNum(ack)),
            None => Self::new(local_port, remote_port),
        }
    }

    /// Next sequence number this side will send
    pub fn local_seq(&self) -> SeqNum {
        self.local_seq
    }

    /// Next sequence number expected from the peer, once learned
    pub fn remote_seq(&self) -> Option<SeqNum> {
        self.remote_seq
    }

    /// Sequence space used by the segment at `index`: payload plus one for
    /// each of SYN and FIN
    fn segment_len(tcp: &Tcp, frame: &Layers, index: usize) -> u32 {
        let mut len = frame.payload_len_after(index) as u32;
        if tcp.has_flags(TcpFlags::SYN) {
            len = len.wrapping_add(1);
        }
        if tcp.has_flags(TcpFlags::FIN) {
            len = len.wrapping_add(1);
        }
        len
    }
}

impl LayerState for TcpState {
    fn outgoing(&self) -> Layer {
        Layer::Tcp(Tcp {
            src_port: Some(self.local_port),
            dst_port: Some(self.remote_port),
            seq_num: Some(self.local_seq.0),
            ack_num: self.remote_seq.map(u32::from),
            ..Default::default()
        })
    }

    fn incoming(&self, received: Option<&Layer>) -> Layer {
        let acks = received
            .and_then(Layer::as_tcp)
            .map_or(false, |tcp| tcp.has_flags(TcpFlags::ACK));
        Layer::Tcp(Tcp {
            src_port: Some(self.remote_port),
            dst_port: Some(self.local_port),
            seq_num: self.remote_seq.map(u32::from),
            ack_num: acks.then_some(self.local_seq.0),
            ..Default::default()
        })
    }

    fn sent(&mut self, frame: &Layers, index: usize) -> Result<()> {
        let tcp = layer_at(frame, index, Tcp::NAME, Layer::as_tcp)?;
        let start = tcp.seq_num.map_or(self.local_seq, SeqNum);
        self.local_seq = start.add(Self::segment_len(tcp, frame, index));
        Ok(())
    }

    fn received(&mut self, frame: &Layers, index: usize) -> Result<()> {
        let tcp = layer_at(frame, index, Tcp::NAME, Layer::as_tcp)?;
        let start = match (tcp.seq_num, self.remote_seq) {
            (Some(seq), _) => SeqNum(seq),
            (None, Some(seq)) => seq,
            (None, None) => {
                return Err(Error::invalid_parameter(
                    "frame",
                    "received TCP segment has no sequence number",
                ))
            }
        };
        self.remote_seq = Some(start.add(Self::segment_len(tcp, frame, index)));
        Ok(())
    }
}

/// UDP ports
#[derive(Debug, Clone, Default)]
pub struct UdpState {
    out: Udp,
    expected: Udp,
}

impl UdpState {
    pub fn new(local_port: u16, remote_port: u16) -> Self {
        Self {
            out: Udp {
                src_port: Some(local_port),
                dst_port: Some(remote_port),
                ..Default::default()
            },
            expected: Udp {
                src_port: Some(remote_port),
                dst_port: Some(local_port),
                ..Default::default()
            },
        }
    }

    /// State for a peer first seen as the sender of `udp`
    pub fn observed(udp: &Udp) -> Self {
        Self::new(udp.dst_port.unwrap_or(0), udp.src_port.unwrap_or(0))
    }
}

impl LayerState for UdpState {
    fn outgoing(&self) -> Layer {
        Layer::Udp(self.out.clone())
    }

    fn incoming(&self, _received: Option<&Layer>) -> Layer {
        Layer::Udp(self.expected.clone())
    }

    fn sent(&mut self, _frame: &Layers, _index: usize) -> Result<()> {
        Ok(())
    }

    fn received(&mut self, _frame: &Layers, _index: usize) -> Result<()> {
        Ok(())
    }
}

/// State for a layer first seen at the next untracked position of a
/// matched frame; `None` for layers that carry no connection state
pub fn observed_state(layer: &Layer) -> Option<Box<dyn LayerState>> {
    match layer {
        Layer::Ipv4(ip) => Some(Box::new(Ipv4State::observed(ip))),
        Layer::Tcp(tcp) => Some(Box::new(TcpState::observed(tcp))),
        Layer::Udp(udp) => Some(Box::new(UdpState::observed(udp))),
        Layer::Ether(_) | Layer::Payload(_) => None,
    }
}
