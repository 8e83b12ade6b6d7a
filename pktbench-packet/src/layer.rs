//! Layers and layer chains
//!
//! A [`Layer`] is one protocol header (or the trailing payload) whose fields
//! may be left unset. [`Layers`] is an ordered chain of them, outermost
//! first, that can be matched against another chain, merged with overrides,
//! diffed for diagnostics and serialized to wire bytes.

use crate::diff;
use crate::ethernet::Ether;
use crate::field::FieldRow;
use crate::ip::Ipv4;
use crate::payload::Payload;
use crate::tcp::Tcp;
use crate::udp::Udp;
use pktbench_core::{Error, Result};
use std::fmt;

/// One protocol layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Ether(Ether),
    Ipv4(Ipv4),
    Tcp(Tcp),
    Udp(Udp),
    Payload(Payload),
}

/// What a layer sees of its neighbours while serializing
///
/// `inner` holds the already serialized bytes of every layer after this one.
#[derive(Debug, Clone, Copy)]
pub struct WireContext<'a> {
    pub prev: Option<&'a Layer>,
    pub next: Option<&'a Layer>,
    pub inner: &'a [u8],
}

impl Layer {
    /// Layer name used in dumps and diffs
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Ether(_) => Ether::NAME,
            Layer::Ipv4(_) => Ipv4::NAME,
            Layer::Tcp(_) => Tcp::NAME,
            Layer::Udp(_) => Udp::NAME,
            Layer::Payload(_) => Payload::NAME,
        }
    }

    /// Wildcard match; layers of different kinds never match
    pub fn matches(&self, other: &Layer) -> bool {
        match (self, other) {
            (Layer::Ether(a), Layer::Ether(b)) => a.matches(b),
            (Layer::Ipv4(a), Layer::Ipv4(b)) => a.matches(b),
            (Layer::Tcp(a), Layer::Tcp(b)) => a.matches(b),
            (Layer::Udp(a), Layer::Udp(b)) => a.matches(b),
            (Layer::Payload(a), Layer::Payload(b)) => a.matches(b),
            _ => false,
        }
    }

    /// Overlay every field set in `other` onto `self`
    pub fn merge(&mut self, other: &Layer) -> Result<()> {
        match (self, other) {
            (Layer::Ether(a), Layer::Ether(b)) => a.merge_from(b),
            (Layer::Ipv4(a), Layer::Ipv4(b)) => a.merge_from(b),
            (Layer::Tcp(a), Layer::Tcp(b)) => a.merge_from(b),
            (Layer::Udp(a), Layer::Udp(b)) => a.merge_from(b),
            (Layer::Payload(a), Layer::Payload(b)) => a.merge_from(b),
            (this, other) => {
                return Err(Error::TypeMismatch {
                    expected: this.name(),
                    found: other.name(),
                })
            }
        }
        Ok(())
    }

    /// Labels and rendered values of the fields that are set
    pub fn set_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Layer::Ether(l) => l.set_fields(),
            Layer::Ipv4(l) => l.set_fields(),
            Layer::Tcp(l) => l.set_fields(),
            Layer::Udp(l) => l.set_fields(),
            Layer::Payload(l) => l.set_fields(),
        }
    }

    /// Fields set on both sides with different values; empty for layers of
    /// different kinds
    pub(crate) fn mismatched_fields(&self, other: &Layer) -> Vec<FieldRow> {
        match (self, other) {
            (Layer::Ether(a), Layer::Ether(b)) => a.mismatched_fields(b),
            (Layer::Ipv4(a), Layer::Ipv4(b)) => a.mismatched_fields(b),
            (Layer::Tcp(a), Layer::Tcp(b)) => a.mismatched_fields(b),
            (Layer::Udp(a), Layer::Udp(b)) => a.mismatched_fields(b),
            (Layer::Payload(a), Layer::Payload(b)) => a.mismatched_fields(b),
            _ => Vec::new(),
        }
    }

    pub(crate) fn to_bytes(&self, ctx: &WireContext<'_>) -> Result<Vec<u8>> {
        match self {
            Layer::Ether(l) => l.to_bytes(ctx),
            Layer::Ipv4(l) => l.to_bytes(ctx),
            Layer::Tcp(l) => l.to_bytes(ctx),
            Layer::Udp(l) => l.to_bytes(ctx),
            Layer::Payload(l) => {
                let mut bytes = l.data().to_vec();
                bytes.extend_from_slice(ctx.inner);
                Ok(bytes)
            }
        }
    }

    pub fn as_ether(&self) -> Option<&Ether> {
        match self {
            Layer::Ether(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<&Ipv4> {
        match self {
            Layer::Ipv4(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_tcp(&self) -> Option<&Tcp> {
        match self {
            Layer::Tcp(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_udp(&self) -> Option<&Udp> {
        match self {
            Layer::Udp(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_payload(&self) -> Option<&Payload> {
        match self {
            Layer::Payload(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Ether(l) => fmt::Display::fmt(l, f),
            Layer::Ipv4(l) => fmt::Display::fmt(l, f),
            Layer::Tcp(l) => fmt::Display::fmt(l, f),
            Layer::Udp(l) => fmt::Display::fmt(l, f),
            Layer::Payload(l) => fmt::Display::fmt(l, f),
        }
    }
}

impl From<Ether> for Layer {
    fn from(layer: Ether) -> Self {
        Layer::Ether(layer)
    }
}

impl From<Ipv4> for Layer {
    fn from(layer: Ipv4) -> Self {
        Layer::Ipv4(layer)
    }
}

impl From<Tcp> for Layer {
    fn from(layer: Tcp) -> Self {
        Layer::Tcp(layer)
    }
}

impl From<Udp> for Layer {
    fn from(layer: Udp) -> Self {
        Layer::Udp(layer)
    }
}

impl From<Payload> for Layer {
    fn from(layer: Payload) -> Self {
        Layer::Payload(layer)
    }
}

/// Ordered chain of layer slots, outermost first
///
/// A slot may be absent (`None`), which matches any layer at that position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layers(Vec<Option<Layer>>);

impl Layers {
    pub fn new() -> Self {
        Layers(Vec::new())
    }

    /// Append a layer
    pub fn with(mut self, layer: impl Into<Layer>) -> Self {
        self.push(layer);
        self
    }

    /// Append an absent slot
    pub fn with_absent(mut self) -> Self {
        self.0.push(None);
        self
    }

    pub fn push(&mut self, layer: impl Into<Layer>) {
        self.0.push(Some(layer.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All slots, absent ones included
    pub fn slots(&self) -> &[Option<Layer>] {
        &self.0
    }

    /// The layer at `index`, if the slot exists and is filled
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.0.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.0.get_mut(index).and_then(Option::as_mut)
    }

    /// Filled slots in order
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.0.iter().flatten()
    }

    pub fn ether(&self) -> Option<&Ether> {
        self.iter().find_map(Layer::as_ether)
    }

    pub fn ipv4(&self) -> Option<&Ipv4> {
        self.iter().find_map(Layer::as_ipv4)
    }

    pub fn tcp(&self) -> Option<&Tcp> {
        self.iter().find_map(Layer::as_tcp)
    }

    pub fn udp(&self) -> Option<&Udp> {
        self.iter().find_map(Layer::as_udp)
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.iter().find_map(Layer::as_payload)
    }

    /// Number of payload bytes carried by the layers after `index`
    pub fn payload_len_after(&self, index: usize) -> usize {
        self.0
            .iter()
            .skip(index + 1)
            .flatten()
            .filter_map(Layer::as_payload)
            .map(Payload::len)
            .sum()
    }

    /// True when every slot of `self` matches the slot of `other` at the
    /// same position
    ///
    /// `self` is the expectation: `other` may carry more layers than `self`
    /// describes, but not fewer.
    pub fn matches(&self, other: &Layers) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.0.iter().zip(&other.0).all(|pair| match pair {
            (Some(a), Some(b)) => a.matches(b),
            _ => true,
        })
    }

    /// Merge `other` into `self` slot by slot
    ///
    /// Set fields of `other` win. An absent slot in `other` leaves `self`
    /// untouched, an absent slot in `self` takes a copy of `other`, and
    /// extra layers of `other` are appended.
    pub fn merge(&mut self, other: &Layers) -> Result<()> {
        for (index, slot) in other.0.iter().enumerate() {
            match self.0.get_mut(index) {
                Some(Some(dst)) => {
                    if let Some(src) = slot {
                        dst.merge(src)?;
                    }
                }
                Some(dst) => {
                    if slot.is_some() {
                        *dst = slot.clone();
                    }
                }
                None => self.0.push(slot.clone()),
            }
        }
        Ok(())
    }

    /// Human-readable report of why `self` does not match `other`; empty
    /// when they match
    pub fn diff(&self, other: &Layers) -> String {
        diff::diff(self, other)
    }

    /// Serialize the chain, innermost layer first, filling in computed
    /// fields
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut inner = Vec::new();
        for index in (0..self.0.len()).rev() {
            let layer = self
                .get(index)
                .ok_or_else(|| Error::serialization(format!("layer {} is absent", index)))?;
            let ctx = WireContext {
                prev: index.checked_sub(1).and_then(|prev| self.get(prev)),
                next: self.get(index + 1),
                inner: &inner,
            };
            inner = layer.to_bytes(&ctx)?;
        }
        Ok(inner)
    }
}

impl fmt::Display for Layers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, slot) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            match slot {
                Some(layer) => write!(f, "{}", layer)?,
                None => write!(f, "nil")?,
            }
        }
        write!(f, "]")
    }
}

impl From<Vec<Option<Layer>>> for Layers {
    fn from(slots: Vec<Option<Layer>>) -> Self {
        Layers(slots)
    }
}

impl From<Vec<Layer>> for Layers {
    fn from(layers: Vec<Layer>) -> Self {
        layers.into_iter().collect()
    }
}

impl FromIterator<Layer> for Layers {
    fn from_iter<T: IntoIterator<Item = Layer>>(iter: T) -> Self {
        Layers(iter.into_iter().map(Some).collect())
    }
}
