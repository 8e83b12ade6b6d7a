//! Driving a connection over a real (or fake) wire
//!
//! [`Exchange`] ties a [`Connection`] to an [`Injector`] and a [`Sniffer`]:
//! frames are built from the connection state, serialized and injected, and
//! captured frames are parsed and matched until one satisfies the
//! expectation or the timeout expires.

use crate::connection::Connection;
use pktbench_core::{Error, Injector, Result, Sniffer};
use pktbench_packet::{parse, parse_ether, Dispatch, LayerParser, Layers, Tcp, TcpFlags};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Rejected-frame diffs kept for a timeout error
pub const MAX_TIMEOUT_DIFFS: usize = 32;

/// A connection plus the transport it runs over
pub struct Exchange<I, S> {
    connection: Connection,
    injector: I,
    sniffer: S,
    dispatch: Dispatch,
    first: LayerParser,
}

impl<I: Injector, S: Sniffer> Exchange<I, S> {
    /// Frames are parsed as Ethernet with the standard dispatch table
    pub fn new(connection: Connection, injector: I, sniffer: S) -> Self {
        Self {
            connection,
            injector,
            sniffer,
            dispatch: Dispatch::standard(),
            first: parse_ether,
        }
    }

    /// Parse captured frames with a different first layer or dispatch table
    pub fn with_parser(mut self, dispatch: Dispatch, first: LayerParser) -> Self {
        self.dispatch = dispatch;
        self.first = first;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn sniffer(&self) -> &S {
        &self.sniffer
    }

    /// Give back the parts
    pub fn into_parts(self) -> (Connection, I, S) {
        (self.connection, self.injector, self.sniffer)
    }

    /// Build a frame from the connection state and `overrides` without
    /// sending it
    pub fn create_frame(&self, overrides: &Layers) -> Result<Layers> {
        self.connection.create_frame(overrides)
    }

    /// Build, send and record a frame; returns what was sent
    pub fn send(&mut self, overrides: &Layers) -> Result<Layers> {
        let frame = self.create_frame(overrides)?;
        self.send_frame(&frame)?;
        Ok(frame)
    }

    /// Send a fully built frame and update the connection state
    pub fn send_frame(&mut self, frame: &Layers) -> Result<()> {
        let bytes = frame.to_bytes()?;
        self.injector.send(&bytes)?;
        debug!(len = bytes.len(), frame = %frame, "frame sent");
        self.connection.sent(frame)
    }

    /// Wait for a frame matching `pattern`
    ///
    /// Frames that fail to parse or match are skipped. On timeout the error
    /// carries the diffs of the last [`MAX_TIMEOUT_DIFFS`] skipped frames and
    /// a count of the older ones.
    pub fn expect(&mut self, pattern: &Layers, timeout: Duration) -> Result<Layers> {
        let deadline = Instant::now() + timeout;
        let mut diffs = VecDeque::with_capacity(MAX_TIMEOUT_DIFFS);
        let mut omitted = 0;

        for frame in self.sniffer.frames(deadline) {
            let frame = frame?;
            let layers = match parse(&self.dispatch, self.first, frame.data()) {
                Ok(layers) => layers,
                Err(e) => {
                    debug!(error = %e, len = frame.len(), "skipping unparsable frame");
                    continue;
                }
            };
            if self.connection.match_frame(pattern, &layers) {
                return Ok(layers);
            }
            if diffs.len() == MAX_TIMEOUT_DIFFS {
                diffs.pop_front();
                omitted += 1;
            }
            diffs.push_back(self.connection.diff(pattern, &layers));
        }

        warn!(?timeout, rejected = diffs.len() + omitted, omitted, "no matching frame");
        Err(Error::Timeout {
            waited: timeout,
            diffs: diffs.into(),
            omitted,
        })
    }

    /// Succeed only if nothing matching `pattern` arrives within `timeout`
    pub fn expect_none(&mut self, pattern: &Layers, timeout: Duration) -> Result<()> {
        match self.expect(pattern, timeout) {
            Ok(layers) => Err(Error::invalid_parameter(
                "pattern",
                format!("unexpected frame {}", layers),
            )),
            Err(e) if e.is_timeout() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Discard frames already queued at the sniffer; returns how many
    pub fn drain(&mut self) -> Result<usize> {
        let mut drained = 0;
        while self.sniffer.recv(Duration::ZERO)?.is_some() {
            drained += 1;
        }
        if drained > 0 {
            debug!(drained, "drained pending frames");
        }
        Ok(drained)
    }

    /// Three-way handshake: send SYN, expect SYN-ACK, send ACK
    ///
    /// The connection must track a TCP layer.
    pub fn handshake(&mut self, timeout: Duration) -> Result<()> {
        let segment = |flags| {
            Layers::new().with_absent().with_absent().with(Tcp {
                flags: Some(flags),
                ..Default::default()
            })
        };

        self.send(&segment(TcpFlags::SYN))?;
        self.expect(&segment(TcpFlags::SYN_ACK), timeout)?;
        self.send(&segment(TcpFlags::ACK))?;
        info!("TCP handshake complete");
        Ok(())
    }
}
