//! Transport layer for the optimeter DLMS/COSEM client
//!
//! The session talks to the meter through the [`MeterPort`] capability;
//! the production implementation is a tokio-serial optical port, and a
//! scripted in-memory port backs the off-device tests.

pub mod mock;
pub mod port;
pub mod serial;

pub use mock::MockPort;
pub use port::MeterPort;
pub use serial::{OpticalSerialPort, SerialSettings};
