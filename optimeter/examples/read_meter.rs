//! Read a meter on a serial port and print the record as JSON
//!
//! ```sh
//! cargo run --example read_meter -- /dev/ttyUSB0
//! ```

use optimeter::transport::{OpticalSerialPort, SerialSettings};
use optimeter::{ClientConfig, DlmsSession, MeterRecord};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let port_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let config = ClientConfig::default();
    let settings = SerialSettings::new(port_name, config.baud);
    let port = OpticalSerialPort::open(&settings)?;
    let mut session = DlmsSession::new(port, config);

    session.connect().await?;
    let mut record = MeterRecord::new();
    session.read_all(&mut record).await?;
    session.disconnect().await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
