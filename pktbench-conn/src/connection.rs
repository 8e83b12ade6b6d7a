//! Stateful frame matching for one connection under test

use crate::config::TestbenchConfig;
use crate::state::{observed_state, EtherState, Ipv4State, LayerState, TcpState, UdpState};
use pktbench_core::Result;
use pktbench_packet::Layers;
use tracing::{debug, trace, warn};

/// One logical connection: a stack of per-layer states, outermost first
///
/// Outgoing frames are built from the states' views merged with caller
/// overrides; received frames are matched against the states' expectations
/// merged with the caller's pattern. Sending and matching update the states.
#[derive(Debug, Default)]
pub struct Connection {
    states: Vec<Box<dyn LayerState>>,
    learn_layers: bool,
}

impl Connection {
    pub fn new(states: Vec<Box<dyn LayerState>>) -> Self {
        Self {
            states,
            learn_layers: false,
        }
    }

    /// Link layer only; layers past it are tracked once first matched
    pub fn ether(config: &TestbenchConfig) -> Self {
        Self::new(vec![Box::new(EtherState::new(config))]).learn_layers(true)
    }

    /// Ethernet, IPv4 and UDP
    pub fn udp_ipv4(config: &TestbenchConfig) -> Self {
        Self::new(vec![
            Box::new(EtherState::new(config)),
            Box::new(Ipv4State::new(config)),
            Box::new(UdpState::new(
                config.local_port_or_ephemeral(),
                config.remote_port,
            )),
        ])
    }

    /// Ethernet, IPv4 and TCP with a random initial sequence number
    pub fn tcp_ipv4(config: &TestbenchConfig) -> Self {
        Self::new(vec![
            Box::new(EtherState::new(config)),
            Box::new(Ipv4State::new(config)),
            Box::new(TcpState::new(
                config.local_port_or_ephemeral(),
                config.remote_port,
            )),
        ])
    }

    /// Start tracking layers the first time a matched frame carries them
    /// past the last tracked position
    pub fn learn_layers(mut self, learn: bool) -> Self {
        self.learn_layers = learn;
        self
    }

    /// Track one more layer position
    pub fn push_state(&mut self, state: Box<dyn LayerState>) {
        self.states.push(state);
    }

    pub fn states(&self) -> &[Box<dyn LayerState>] {
        &self.states
    }

    /// Build an outgoing frame: every state's fields, then `overrides`
    pub fn create_frame(&self, overrides: &Layers) -> Result<Layers> {
        let mut frame: Layers = self.states.iter().map(|state| state.outgoing()).collect();
        frame.merge(overrides)?;
        Ok(frame)
    }

    /// Record that `frame` went out
    pub fn sent(&mut self, frame: &Layers) -> Result<()> {
        for (index, state) in self.states.iter_mut().enumerate() {
            state.sent(frame, index)?;
        }
        Ok(())
    }

    /// The full expectation for `received`: every state's view, then
    /// `pattern`
    pub fn expectation(&self, pattern: &Layers, received: &Layers) -> Result<Layers> {
        let mut expected: Layers = self
            .states
            .iter()
            .enumerate()
            .map(|(index, state)| state.incoming(received.get(index)))
            .collect();
        expected.merge(pattern)?;
        Ok(expected)
    }

    /// Match a received frame against `pattern` and the connection state
    ///
    /// An empty pattern never matches. On a match every state learns from
    /// the frame.
    pub fn match_frame(&mut self, pattern: &Layers, received: &Layers) -> bool {
        if pattern.is_empty() {
            warn!("empty expectation never matches");
            return false;
        }

        let expected = match self.expectation(pattern, received) {
            Ok(expected) => expected,
            Err(e) => {
                warn!(error = %e, "cannot build expectation");
                return false;
            }
        };
        if !expected.matches(received) {
            trace!(expected = %expected, received = %received, "frame rejected");
            return false;
        }

        if let Err(e) = self.received(received) {
            warn!(error = %e, "matched frame could not update connection state");
            return false;
        }
        debug!(frame = %received, "frame matched");
        true
    }

    /// Why `received` does not match `pattern` under the current state
    pub fn diff(&self, pattern: &Layers, received: &Layers) -> String {
        if pattern.is_empty() {
            return "(empty expectation)\n".to_string();
        }
        match self.expectation(pattern, received) {
            Ok(expected) => expected.diff(received),
            Err(e) => format!("({})\n", e),
        }
    }

    fn received(&mut self, frame: &Layers) -> Result<()> {
        for (index, state) in self.states.iter_mut().enumerate() {
            state.received(frame, index)?;
        }

        if self.learn_layers {
            while let Some(layer) = frame.get(self.states.len()) {
                let Some(mut state) = observed_state(layer) else {
                    break;
                };
                state.received(frame, self.states.len())?;
                debug!(layer = layer.name(), "tracking new layer");
                self.states.push(state);
            }
        }
        Ok(())
    }
}

impl FromIterator<Box<dyn LayerState>> for Connection {
    fn from_iter<T: IntoIterator<Item = Box<dyn LayerState>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
