//! Regroups variable-size device packets into fixed-size frames.
//!
//! WASAPI hands out packets of whatever size the engine period produced;
//! the capture loop wants exactly one interval per read.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use mic_capture_core::CaptureError;

pub struct FrameAssembler {
    packets: Receiver<Vec<u8>>,
    /// Bytes received but not yet handed out.
    pending: Vec<u8>,
    frame: Vec<u8>,
    read_timeout: Duration,
}

impl FrameAssembler {
    pub fn new(packets: Receiver<Vec<u8>>, read_timeout: Duration) -> Self {
        Self {
            packets,
            pending: Vec::new(),
            frame: Vec::new(),
            read_timeout,
        }
    }

    /// Gather exactly `expected_len` bytes, waiting at most the read timeout.
    ///
    /// On timeout the partial frame is discarded and `Underflow` reports how
    /// much had arrived. A closed packet stream means the device is gone.
    pub fn next_frame(&mut self, expected_len: usize) -> Result<&[u8], CaptureError> {
        self.frame.clear();
        let deadline = Instant::now() + self.read_timeout;

        loop {
            let take = (expected_len - self.frame.len()).min(self.pending.len());
            self.frame.extend(self.pending.drain(..take));
            if self.frame.len() == expected_len {
                return Ok(&self.frame);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.packets.recv_timeout(remaining) {
                Ok(packet) => self.pending.extend_from_slice(&packet),
                Err(RecvTimeoutError::Timeout) => {
                    let actual = self.frame.len();
                    self.frame.clear();
                    return Err(CaptureError::Underflow {
                        expected: expected_len,
                        actual,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::DeviceUnavailable),
            }
        }
    }

    /// Bytes buffered for the next frame.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn packets_are_regrouped_into_exact_frames() {
        let (tx, rx) = bounded(8);
        let mut assembler = FrameAssembler::new(rx, Duration::from_millis(100));

        tx.send(vec![1, 2, 3]).unwrap();
        tx.send(vec![4, 5, 6, 7, 8]).unwrap();

        assert_eq!(assembler.next_frame(4).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(assembler.buffered(), 4);
        assert_eq!(assembler.next_frame(4).unwrap(), &[5, 6, 7, 8]);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn shortfall_is_an_underflow_and_is_discarded() {
        let (tx, rx) = bounded(8);
        let mut assembler = FrameAssembler::new(rx, Duration::from_millis(20));

        tx.send(vec![9; 3]).unwrap();
        assert_eq!(
            assembler.next_frame(8),
            Err(CaptureError::Underflow { expected: 8, actual: 3 })
        );

        tx.send(vec![7; 8]).unwrap();
        assert_eq!(assembler.next_frame(8).unwrap(), &[7; 8]);
    }

    #[test]
    fn closed_stream_means_device_lost() {
        let (tx, rx) = bounded::<Vec<u8>>(1);
        drop(tx);
        let mut assembler = FrameAssembler::new(rx, Duration::from_millis(20));

        assert_eq!(assembler.next_frame(4), Err(CaptureError::DeviceUnavailable));
    }
}
