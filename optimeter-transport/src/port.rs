//! Port capability the session reads the meter through

use async_trait::async_trait;
use optimeter_core::MeterResult;

/// Byte-stream access to a physical meter link
///
/// One port corresponds to one physical meter; the session owns the port
/// exclusively from connect to disconnect and strictly alternates writes
/// and reads. Implementations do not need to buffer frames, only bytes.
#[async_trait]
pub trait MeterPort: Send {
    /// Read whatever bytes are currently pending
    ///
    /// Returns the number of bytes placed into `buf`, or 0 when nothing
    /// is available right now. Callers poll; deadlines live above this
    /// trait, not in it.
    async fn read(&mut self, buf: &mut [u8]) -> MeterResult<usize>;

    /// Write the whole buffer
    async fn write_all(&mut self, buf: &[u8]) -> MeterResult<()>;

    /// Flush buffered output to the wire
    ///
    /// A send is not complete until flush returns; the session never
    /// starts a read before that.
    async fn flush(&mut self) -> MeterResult<()>;

    /// Discard any unread inbound bytes
    async fn drain_rx(&mut self) -> MeterResult<()>;

    /// Drive the meter wake line (DTR); `true` holds the meter awake
    async fn set_wake(&mut self, awake: bool) -> MeterResult<()>;
}
