//! Exchange tests over an in-memory wire

use pktbench_conn::exchange::MAX_TIMEOUT_DIFFS;
use pktbench_conn::{Connection, EtherState, Exchange, Ipv4State, SeqNum, TcpState, TestbenchConfig};
use pktbench_core::{Error, Frame, Injector, Result, Sniffer};
use pktbench_packet::{parse_frame, Ether, Ipv4, Layers, MacAddress, Payload, Tcp, TcpFlags};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::time::Duration;

const LOCAL_MAC: MacAddress = MacAddress([0x02, 0, 0, 0, 0, 0x01]);
const REMOTE_MAC: MacAddress = MacAddress([0x02, 0, 0, 0, 0, 0x02]);
const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const REMOTE_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
const LOCAL_PORT: u16 = 40000;
const REMOTE_PORT: u16 = 80;
const WAIT: Duration = Duration::from_millis(50);

#[derive(Default)]
struct Recorder {
    sent: Vec<Vec<u8>>,
}

impl Injector for Recorder {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.sent.push(frame.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct Script {
    pending: VecDeque<Vec<u8>>,
}

impl Script {
    fn with(mut self, frame: Vec<u8>) -> Self {
        self.pending.push_back(frame);
        self
    }
}

impl Sniffer for Script {
    fn recv(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        match self.pending.pop_front() {
            Some(data) => Ok(Some(Frame::new("test0", data))),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(None)
            }
        }
    }
}

fn config() -> TestbenchConfig {
    TestbenchConfig::new("test0")
        .with_local_mac(LOCAL_MAC)
        .with_remote_mac(REMOTE_MAC)
        .with_local_ipv4(LOCAL_IP)
        .with_remote_ipv4(REMOTE_IP)
        .with_local_port(LOCAL_PORT)
        .with_remote_port(REMOTE_PORT)
}

fn tcp_connection(isn: u32) -> Connection {
    let config = config();
    Connection::new(vec![
        Box::new(EtherState::new(&config)),
        Box::new(Ipv4State::new(&config)),
        Box::new(TcpState::with_isn(LOCAL_PORT, REMOTE_PORT, SeqNum(isn))),
    ])
}

fn from_remote(tcp: Tcp) -> Vec<u8> {
    Layers::new()
        .with(Ether {
            src_addr: Some(REMOTE_MAC),
            dst_addr: Some(LOCAL_MAC),
            ..Default::default()
        })
        .with(Ipv4 {
            src_addr: Some(REMOTE_IP),
            dst_addr: Some(LOCAL_IP),
            ..Default::default()
        })
        .with(Tcp {
            src_port: Some(REMOTE_PORT),
            dst_port: Some(LOCAL_PORT),
            ..tcp
        })
        .with(Payload::default())
        .to_bytes()
        .unwrap()
}

fn flags(flags: u8) -> Layers {
    Layers::new().with_absent().with_absent().with(Tcp {
        flags: Some(flags),
        ..Default::default()
    })
}

#[test]
fn test_handshake() {
    let syn_ack = from_remote(Tcp {
        seq_num: Some(5000),
        ack_num: Some(1001),
        flags: Some(TcpFlags::SYN_ACK),
        ..Default::default()
    });
    let mut exchange = Exchange::new(
        tcp_connection(1000),
        Recorder::default(),
        Script::default().with(syn_ack),
    );

    exchange.handshake(WAIT).unwrap();

    let sent = &exchange.injector().sent;
    assert_eq!(sent.len(), 2);

    let syn = parse_frame(&sent[0]).unwrap();
    let syn = syn.tcp().unwrap();
    assert_eq!(syn.flags, Some(TcpFlags::SYN));
    assert_eq!(syn.seq_num, Some(1000));

    let ack = parse_frame(&sent[1]).unwrap();
    assert_eq!(ack.ipv4().and_then(|ip| ip.dst_addr), Some(REMOTE_IP));
    let ack = ack.tcp().unwrap();
    assert_eq!(ack.flags, Some(TcpFlags::ACK));
    assert_eq!((ack.seq_num, ack.ack_num), (Some(1001), Some(5001)));
}

#[test]
fn test_expect_skips_wrong_acknowledgment() {
    let stale = from_remote(Tcp {
        seq_num: Some(5000),
        ack_num: Some(999),
        flags: Some(TcpFlags::SYN_ACK),
        ..Default::default()
    });
    let good = from_remote(Tcp {
        seq_num: Some(5000),
        ack_num: Some(1001),
        flags: Some(TcpFlags::SYN_ACK),
        ..Default::default()
    });
    let mut exchange = Exchange::new(
        tcp_connection(1000),
        Recorder::default(),
        Script::default().with(stale).with(good),
    );

    exchange.send(&flags(TcpFlags::SYN)).unwrap();
    let matched = exchange.expect(&flags(TcpFlags::SYN_ACK), WAIT).unwrap();
    assert_eq!(matched.tcp().and_then(|tcp| tcp.ack_num), Some(1001));
}

#[test]
fn test_expect_timeout_reports_diffs() {
    let rst = from_remote(Tcp {
        seq_num: Some(5000),
        ack_num: Some(1001),
        flags: Some(TcpFlags::RST | TcpFlags::ACK),
        ..Default::default()
    });
    let mut exchange = Exchange::new(
        tcp_connection(1000),
        Recorder::default(),
        Script::default().with(vec![0xde, 0xad]).with(rst),
    );
    exchange.send(&flags(TcpFlags::SYN)).unwrap();

    match exchange.expect(&flags(TcpFlags::SYN_ACK), WAIT) {
        Err(Error::Timeout {
            waited,
            diffs,
            omitted,
        }) => {
            assert_eq!(waited, WAIT);
            assert_eq!(omitted, 0);
            // The runt frame is skipped without a diff
            assert_eq!(diffs.len(), 1);
            assert!(diffs[0].contains("Flags"));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_expect_timeout_keeps_latest_diffs() {
    let rejected = MAX_TIMEOUT_DIFFS + 8;
    let mut script = Script::default();
    for i in 0..rejected {
        script = script.with(from_remote(Tcp {
            seq_num: Some(5000),
            ack_num: Some(2000 + i as u32),
            flags: Some(TcpFlags::ACK),
            ..Default::default()
        }));
    }
    let mut exchange = Exchange::new(tcp_connection(1000), Recorder::default(), script);
    exchange.send(&flags(TcpFlags::SYN)).unwrap();

    match exchange.expect(&flags(TcpFlags::SYN_ACK), WAIT) {
        Err(Error::Timeout { diffs, omitted, .. }) => {
            assert_eq!(diffs.len(), MAX_TIMEOUT_DIFFS);
            assert_eq!(omitted, 8);
            assert!(diffs[0].contains("2008"));
            assert!(diffs[MAX_TIMEOUT_DIFFS - 1].contains("2039"));
            assert!(!diffs.iter().any(|diff| diff.contains("2007")));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_expect_none() {
    let mut quiet = Exchange::new(tcp_connection(1000), Recorder::default(), Script::default());
    quiet.expect_none(&flags(TcpFlags::RST), WAIT).unwrap();

    let rst = from_remote(Tcp {
        seq_num: Some(5000),
        flags: Some(TcpFlags::RST),
        ..Default::default()
    });
    let mut noisy = Exchange::new(
        tcp_connection(1000),
        Recorder::default(),
        Script::default().with(rst),
    );
    assert!(noisy.expect_none(&flags(TcpFlags::RST), WAIT).is_err());
}

#[test]
fn test_drain() {
    let mut exchange = Exchange::new(
        tcp_connection(1000),
        Recorder::default(),
        Script::default().with(vec![1]).with(vec![2]),
    );
    assert_eq!(exchange.drain().unwrap(), 2);
    assert_eq!(exchange.drain().unwrap(), 0);
}

#[test]
fn test_send_frame_advances_sequence() {
    let mut exchange = Exchange::new(tcp_connection(1000), Recorder::default(), Script::default());
    let frame = exchange
        .create_frame(
            &flags(TcpFlags::PSH_ACK).with(Payload::new(b"hello".to_vec())),
        )
        .unwrap();
    exchange.send_frame(&frame).unwrap();

    let next = exchange.create_frame(&Layers::new()).unwrap();
    assert_eq!(next.tcp().and_then(|tcp| tcp.seq_num), Some(1005));
}
