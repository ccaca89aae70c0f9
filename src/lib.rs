//! BER-TLV codec for smart-card and payment-terminal protocols
//!
//! This crate decodes a byte buffer into a tree of typed TLV nodes and
//! re-encodes such a tree back into bytes, bit-exactly. It implements the
//! practical BER subset used by EMV and ZVT payment protocols: 1-4 byte
//! tags, short/long/indefinite length forms, and recursive constructed
//! values.
//!
//! Tag semantics (what a given tag *means*) belong to the protocol layer
//! on top of this crate; the only protocol-specific hook exposed here is
//! the constructed-tag predicate on [`TlvParser`].

pub mod error;
pub mod tlv;

pub use error::{TlvError, TlvResult};
pub use tlv::node::{Tlv, TlvValue};
pub use tlv::parser::{ParsedTag, TlvParser};
