//! Client configuration

use serde::Deserialize;
use std::time::Duration;

/// Recognized session options
///
/// Every field has a working default for a standard Indian-market DLMS
/// meter on its optical port; deployments typically override only the
/// password.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 16-octet LLS password embedded in the AARQ
    pub dlms_password: String,
    /// HDLC client address (upper SAP)
    pub client_sap: u8,
    /// HDLC server address (management logical device)
    pub server_sap: u8,
    /// Inbound frame ceiling, flags included
    pub max_frame_size: usize,
    /// Per-receive deadline
    pub command_timeout_ms: u64,
    /// Settle time after asserting the DTR wake line
    pub dtr_wake_delay_ms: u64,
    /// Serial bit rate
    pub baud: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dlms_password: "1111111111111111".to_string(),
            client_sap: 0x41,
            server_sap: 0x03,
            max_frame_size: 256,
            command_timeout_ms: 2000,
            dtr_wake_delay_ms: 500,
            baud: 9600,
        }
    }
}

impl ClientConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn dtr_wake_delay(&self) -> Duration {
        Duration::from_millis(self.dtr_wake_delay_ms)
    }

    pub fn password_bytes(&self) -> &[u8] {
        self.dlms_password.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.dlms_password, "1111111111111111");
        assert_eq!(config.client_sap, 0x41);
        assert_eq!(config.server_sap, 0x03);
        assert_eq!(config.max_frame_size, 256);
        assert_eq!(config.command_timeout(), Duration::from_millis(2000));
        assert_eq!(config.dtr_wake_delay(), Duration::from_millis(500));
        assert_eq!(config.baud, 9600);
    }

    #[test]
    fn test_partial_deserialization() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"dlms_password": "ABCDEFGHIJKLMNOP", "baud": 19200}"#)
                .unwrap();
        assert_eq!(config.dlms_password, "ABCDEFGHIJKLMNOP");
        assert_eq!(config.baud, 19200);
        // Unspecified options keep their defaults
        assert_eq!(config.server_sap, 0x03);
        assert_eq!(config.command_timeout_ms, 2000);
    }
}
