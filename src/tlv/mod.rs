//! BER-TLV (Tag-Length-Value) encoder and decoder
//!
//! Every value on the wire is a TLV triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag encoding
//!
//! A tag is 1 byte unless the low 5 bits of the first byte are all set
//! (`0x1F`); in that case continuation bytes follow, each with bit 7 set
//! except the last. Tags are kept as their raw big-endian byte value
//! (`[0x9F, 0x70]` is tag `0x9F70`), at most 4 bytes.
//!
//! ## Length encoding
//!
//! - **Short form** (`0x00`-`0x7F`): the byte itself is the length.
//! - **Long form** (`0x81`-`0x84`): the low 7 bits give the number of
//!   following big-endian length octets, at most 4.
//! - **Indefinite form** (`0x80`): legal on constructed tags only; the
//!   value runs until a 2-byte end-of-contents marker (`0x00 0x00`).
//!
//! ## Value encoding
//!
//! - **Primitive tags**: raw bytes.
//! - **Constructed tags**: a sequence of nested TLV triplets.
//!
//! Whether a tag is constructed is normally decided by bit `0x20` of its
//! first byte. Some protocols (e.g. ZVT) carry nested TLVs under tags
//! without that bit, so the predicate is injectable per parser instance.

pub mod node;
pub mod number;
pub mod parser;
pub mod tag_list;

pub use node::{Tlv, TlvValue};
pub use parser::{ParsedTag, TlvParser};
