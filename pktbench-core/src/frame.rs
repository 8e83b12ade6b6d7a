//! Captured frame type

use std::time::SystemTime;

/// A raw frame handed over by a capture backend
#[derive(Debug, Clone)]
pub struct Frame {
    /// When the frame was captured
    pub timestamp: SystemTime,
    /// Interface the frame was captured on
    pub interface: String,
    /// Frame data, starting at the link-layer header
    pub data: Vec<u8>,
    /// Length on the wire (may exceed `data.len()` if the capture truncated)
    pub wire_len: usize,
}

impl Frame {
    /// Create a new frame stamped with the current time
    pub fn new(interface: impl Into<String>, data: Vec<u8>) -> Self {
        let wire_len = data.len();
        Self {
            timestamp: SystemTime::now(),
            interface: interface.into(),
            data,
            wire_len,
        }
    }

    /// Get frame data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the capture kept fewer bytes than were on the wire
    pub fn is_truncated(&self) -> bool {
        self.wire_len > self.data.len()
    }

    /// Get captured length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new("eth0", vec![1, 2, 3]);
        assert_eq!(frame.interface, "eth0");
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.wire_len, 3);
        assert!(!frame.is_truncated());
    }

    #[test]
    fn test_frame_truncated() {
        let mut frame = Frame::new("lo", vec![0; 64]);
        frame.wire_len = 1514;
        assert!(frame.is_truncated());
    }
}
