//! optimeter - DLMS/COSEM client for optical meter reading
//!
//! Reads energy metering data from a DLMS/COSEM-compliant electricity
//! meter over an optically-isolated serial link: HDLC link setup,
//! LLS-authenticated association, and OBIS attribute reads with
//! scaler/unit application.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `optimeter-core`: error taxonomy, OBIS registry, data values, record
//! - `optimeter-transport`: byte-port capability, serial and mock ports
//! - `optimeter-session`: HDLC framing, CRC-16/X.25, timed receiver
//! - `optimeter-application`: GET APDU codec, A-XDR decoding
//! - `optimeter-client`: session state machine and read orchestration
//!
//! # Usage
//!
//! ```no_run
//! use optimeter::{ClientConfig, DlmsSession, MeterRecord};
//! use optimeter::transport::{OpticalSerialPort, SerialSettings};
//!
//! # async fn run() -> optimeter::MeterResult<()> {
//! let port = OpticalSerialPort::open(&SerialSettings::default())?;
//! let mut session = DlmsSession::new(port, ClientConfig::default());
//!
//! session.connect().await?;
//! let mut record = MeterRecord::new();
//! session.read_all(&mut record).await?;
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use optimeter_core::{MeterError, MeterRecord, MeterResult, ObisCode};
pub use optimeter_core::datatypes::*;
pub use optimeter_core::registry;

// Re-export the client API
pub use optimeter_client::{ClientConfig, DlmsSession, LinkState};

// Re-export transport implementations
pub mod transport {
    pub use optimeter_transport::*;
}

// Re-export protocol layers for advanced use
pub mod application {
    pub use optimeter_application::*;
}

pub mod session {
    pub use optimeter_session::*;
}
