//! Interfaces to the frame transport
//!
//! The test bench never touches sockets itself. It hands serialized frames to
//! an [`Injector`] and pulls captured frames from a [`Sniffer`]. Real backends
//! live in `pktbench-capture`; tests use in-memory fakes.

use crate::{Frame, Result};
use std::time::{Duration, Instant};

/// Sends raw link-layer frames onto the wire
pub trait Injector: Send {
    /// Transmit one frame, exactly as given
    fn send(&mut self, frame: &[u8]) -> Result<()>;
}

/// Produces frames observed on the wire
pub trait Sniffer: Send {
    /// Block for at most `timeout` waiting for the next frame.
    ///
    /// Returns `Ok(None)` when the timeout expires without a frame.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Frame>>;

    /// Lazily yield captured frames until `deadline` passes.
    ///
    /// Every call starts a fresh sequence; frames already consumed by an
    /// earlier sequence are not replayed.
    fn frames(&mut self, deadline: Instant) -> Frames<'_, Self>
    where
        Self: Sized,
    {
        Frames {
            sniffer: self,
            deadline,
            done: false,
        }
    }
}

impl<T: Injector + ?Sized> Injector for Box<T> {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }
}

impl<T: Sniffer + ?Sized> Sniffer for Box<T> {
    fn recv(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        (**self).recv(timeout)
    }
}

/// Blocking iterator over captured frames, bounded by a deadline
///
/// Ends after the deadline or after the first error, which is yielded once.
pub struct Frames<'a, S> {
    sniffer: &'a mut S,
    deadline: Instant,
    done: bool,
}

impl<S: Sniffer> Iterator for Frames<'_, S> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let remaining = self.deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.done = true;
                return None;
            }
            match self.sniffer.recv(remaining) {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::VecDeque;

    struct Queue(VecDeque<Result<Frame>>);

    impl Sniffer for Queue {
        fn recv(&mut self, timeout: Duration) -> Result<Option<Frame>> {
            match self.0.pop_front() {
                Some(item) => item.map(Some),
                None => {
                    std::thread::sleep(timeout.min(Duration::from_millis(5)));
                    Ok(None)
                }
            }
        }
    }

    #[test]
    fn test_frames_yields_until_deadline() {
        let mut sniffer = Queue(VecDeque::from(vec![
            Ok(Frame::new("lo", vec![1])),
            Ok(Frame::new("lo", vec![2])),
        ]));
        let deadline = Instant::now() + Duration::from_millis(30);
        let data: Vec<Vec<u8>> = sniffer
            .frames(deadline)
            .map(|f| f.map(|f| f.data))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(data, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_frames_stops_after_error() {
        let mut sniffer = Queue(VecDeque::from(vec![
            Err(Error::Capture("gone".to_string())),
            Ok(Frame::new("lo", vec![1])),
        ]));
        let deadline = Instant::now() + Duration::from_millis(30);
        let mut frames = sniffer.frames(deadline);
        assert!(matches!(frames.next(), Some(Err(Error::Capture(_)))));
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_frames_restart_per_call() {
        let mut sniffer = Queue(VecDeque::from(vec![
            Ok(Frame::new("lo", vec![1])),
            Ok(Frame::new("lo", vec![2])),
        ]));
        let first = sniffer
            .frames(Instant::now() + Duration::from_millis(30))
            .next();
        assert_eq!(first.unwrap().unwrap().data, vec![1]);
        let second = sniffer
            .frames(Instant::now() + Duration::from_millis(30))
            .next();
        assert_eq!(second.unwrap().unwrap().data, vec![2]);
    }
}
