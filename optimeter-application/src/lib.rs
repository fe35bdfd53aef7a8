//! COSEM application layer for the optimeter DLMS/COSEM client
//!
//! Encodes GET-Request-Normal APDUs, decodes GET-Response-Normal APDUs,
//! and decodes the A-XDR primitives meters return.

pub mod axdr;
pub mod get;

pub use axdr::decode_data;
pub use get::{decode_get_response, encode_get_request, value_as_date_time};
