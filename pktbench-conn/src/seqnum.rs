//! TCP sequence-number arithmetic (RFC 793)

use std::fmt;

/// A 32-bit TCP sequence number
///
/// Addition wraps modulo 2^32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeqNum(pub u32);

impl SeqNum {
    /// Advance by `size` bytes of sequence space
    pub fn add(self, size: u32) -> SeqNum {
        SeqNum(self.0.wrapping_add(size))
    }
}

impl From<u32> for SeqNum {
    fn from(value: u32) -> Self {
        SeqNum(value)
    }
}

impl From<SeqNum> for u32 {
    fn from(value: SeqNum) -> Self {
        value.0
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
