//! HDLC session layer for the optimeter DLMS/COSEM client
//!
//! Implements type 3 HDLC framing per IEC 62056-46: flag-delimited frames
//! with HCS/FCS checksums (CRC-16/X.25), the canned link-setup frames, and
//! the timed flag-hunting receiver.

pub mod hdlc;

pub use hdlc::fcs;
pub use hdlc::frame::{self, FrameKind, ParsedFrame, FLAG, MAX_FRAME_SIZE};
pub use hdlc::receiver::receive_frame;
