//! Timed flag-hunting frame receiver
//!
//! Inbound bytes are polled off the port until a complete flag-delimited
//! frame is seen: leading noise is skipped up to the first 0x7E, then
//! bytes accumulate until a closing 0x7E with at least two bytes in
//! between (a flag arriving earlier restarts the frame). Checksums are
//! not validated here; the parser does that when the payload must be
//! trusted.

use crate::hdlc::frame::FLAG;
use log::trace;
use optimeter_core::hex::hex_string;
use optimeter_core::{MeterError, MeterResult};
use optimeter_transport::MeterPort;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Poll slack between empty reads; the meter feeds bytes at 9600 baud.
const POLL_SLACK: Duration = Duration::from_millis(1);

/// Smallest complete frame: two flags around at least two bytes.
const MIN_FRAME_LEN: usize = 4;

/// Receive one complete HDLC frame, flags included
///
/// Fails with [`MeterError::Timeout`] when no complete frame arrives
/// within `timeout`, and with [`MeterError::FrameFormat`] when a frame
/// exceeds `max_frame_size`.
pub async fn receive_frame<P: MeterPort + ?Sized>(
    port: &mut P,
    max_frame_size: usize,
    timeout: Duration,
) -> MeterResult<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut frame: Vec<u8> = Vec::with_capacity(max_frame_size);
    let mut started = false;
    let mut chunk = [0u8; 64];

    loop {
        if Instant::now() >= deadline {
            return Err(MeterError::Timeout);
        }

        let n = port.read(&mut chunk).await?;
        if n == 0 {
            sleep(POLL_SLACK).await;
            continue;
        }

        for &byte in &chunk[..n] {
            if !started {
                if byte == FLAG {
                    started = true;
                    frame.clear();
                    frame.push(byte);
                }
                continue;
            }

            if frame.len() == max_frame_size {
                return Err(MeterError::FrameFormat(format!(
                    "Frame exceeds {} bytes",
                    max_frame_size
                )));
            }
            frame.push(byte);

            if byte == FLAG {
                if frame.len() >= MIN_FRAME_LEN {
                    trace!("RX {}", hex_string(&frame));
                    return Ok(frame);
                }
                // Too little between the flags: treat this one as a new
                // opening flag.
                frame.clear();
                frame.push(FLAG);
            }
        }
    }
}
