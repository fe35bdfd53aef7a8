//! Scripted in-memory port for testing without hardware
//!
//! The session strictly alternates send and receive, so the mock is
//! scripted per exchange: each flushed frame consumes the next scripted
//! reply (or scripted silence) and makes it readable. Written frames are
//! recorded for assertions.

use crate::port::MeterPort;
use async_trait::async_trait;
use optimeter_core::MeterResult;
use std::collections::VecDeque;

/// In-memory [`MeterPort`] that records TX and replays canned RX
#[derive(Debug, Default)]
pub struct MockPort {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<Option<Vec<u8>>>,
    rx: VecDeque<u8>,
    awake: bool,
    drain_count: usize,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply to the next unanswered frame
    pub fn push_reply(&mut self, bytes: &[u8]) {
        self.replies.push_back(Some(bytes.to_vec()));
    }

    /// Script no reply for the next unanswered frame (forces a timeout)
    pub fn push_silence(&mut self) {
        self.replies.push_back(None);
    }

    /// Inject raw bytes as immediately readable, outside the script
    pub fn inject_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Frames written so far, one entry per `write_all`
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn drain_count(&self) -> usize {
        self.drain_count
    }
}

#[async_trait]
impl MeterPort for MockPort {
    async fn read(&mut self, buf: &mut [u8]) -> MeterResult<usize> {
        let n = buf.len().min(self.rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.rx.pop_front().unwrap();
        }
        Ok(n)
    }

    async fn write_all(&mut self, buf: &[u8]) -> MeterResult<()> {
        self.sent.push(buf.to_vec());
        Ok(())
    }

    async fn flush(&mut self) -> MeterResult<()> {
        // The frame is now "on the wire": release the scripted reply.
        if let Some(reply) = self.replies.pop_front().flatten() {
            self.rx.extend(reply);
        }
        Ok(())
    }

    async fn drain_rx(&mut self) -> MeterResult<()> {
        self.rx.clear();
        self.drain_count += 1;
        Ok(())
    }

    async fn set_wake(&mut self, awake: bool) -> MeterResult<()> {
        self.awake = awake;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_released_on_flush() {
        let mut port = MockPort::new();
        port.push_reply(&[0x7E, 0x01, 0x02, 0x7E]);

        let mut buf = [0u8; 8];
        assert_eq!(port.read(&mut buf).await.unwrap(), 0);

        port.write_all(&[0xAA]).await.unwrap();
        assert_eq!(port.read(&mut buf).await.unwrap(), 0);

        port.flush().await.unwrap();
        let n = port.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x7E, 0x01, 0x02, 0x7E]);
        assert_eq!(port.sent(), &[vec![0xAA]]);
    }

    #[tokio::test]
    async fn test_silence_and_drain() {
        let mut port = MockPort::new();
        port.push_silence();
        port.push_reply(&[0x55]);

        port.write_all(&[0x01]).await.unwrap();
        port.flush().await.unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(port.read(&mut buf).await.unwrap(), 0);

        port.write_all(&[0x02]).await.unwrap();
        port.flush().await.unwrap();
        assert_eq!(port.read(&mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], 0x55);

        port.inject_rx(&[1, 2, 3]);
        port.drain_rx().await.unwrap();
        assert_eq!(port.read(&mut buf).await.unwrap(), 0);
        assert_eq!(port.drain_count(), 1);
    }
}
