//! Optical serial port transport
//!
//! DLMS HHU optical heads run 9600 baud, 8 data bits, no parity, one stop
//! bit, no flow control. The DTR line doubles as the meter wake signal.

use crate::port::MeterPort;
use async_trait::async_trait;
use optimeter_core::{MeterError, MeterResult};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialStream};

const DEFAULT_BAUD: u32 = 9600;
const READ_POLL_SLACK: Duration = Duration::from_millis(1);

/// Serial port settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
}

impl SerialSettings {
    /// Settings for a standard optical head on the given port
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::new("/dev/ttyUSB0".to_string(), DEFAULT_BAUD)
    }
}

/// [`MeterPort`] over a tokio-serial stream
pub struct OpticalSerialPort {
    stream: SerialStream,
}

impl OpticalSerialPort {
    /// Open the serial port with the given settings
    pub fn open(settings: &SerialSettings) -> MeterResult<Self> {
        let builder = tokio_serial::new(&settings.port_name, settings.baud_rate)
            .data_bits(settings.data_bits)
            .stop_bits(settings.stop_bits)
            .parity(settings.parity)
            .flow_control(settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            MeterError::Io(format!(
                "Failed to open serial port {}: {}",
                settings.port_name, e
            ))
        })?;

        Ok(Self { stream })
    }
}

#[async_trait]
impl MeterPort for OpticalSerialPort {
    async fn read(&mut self, buf: &mut [u8]) -> MeterResult<usize> {
        // A short slack window turns "no byte yet" into Ok(0) so the
        // caller's deadline loop stays in control.
        match tokio::time::timeout(READ_POLL_SLACK, self.stream.read(buf)).await {
            Err(_) => Ok(0),
            Ok(result) => result.map_err(MeterError::from),
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> MeterResult<()> {
        self.stream.write_all(buf).await.map_err(MeterError::from)
    }

    async fn flush(&mut self) -> MeterResult<()> {
        self.stream.flush().await.map_err(MeterError::from)
    }

    async fn drain_rx(&mut self) -> MeterResult<()> {
        self.stream
            .clear(ClearBuffer::Input)
            .map_err(|e| MeterError::Io(format!("Failed to drain serial input: {}", e)))
    }

    async fn set_wake(&mut self, awake: bool) -> MeterResult<()> {
        // Asserted DTR pulls the wake line low, which keeps the meter's
        // optical interface powered.
        self.stream
            .write_data_terminal_ready(awake)
            .map_err(|e| MeterError::Io(format!("Failed to set DTR: {}", e)))
    }
}
