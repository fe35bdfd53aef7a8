//! HDLC data-link layer

pub mod fcs;
pub mod frame;
pub mod receiver;
