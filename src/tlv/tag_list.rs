//! Flat tag-list encoding, as used in tag-request lists
//!
//! A tag list is a contiguous run of bare tags in their minimal big-endian
//! form, with no length or value fields. The inverse operation is
//! [`TlvParser::parse_all_tags`](crate::tlv::parser::TlvParser::parse_all_tags).

use crate::tlv::number;

/// Encode the given tags contiguously, in input order, into a single
/// exactly-sized buffer.
pub fn encode_tags(tags: &[u32]) -> Vec<u8> {
    let total: usize = tags.iter().map(|&tag| number::tag_byte_length(tag)).sum();
    let mut buf = vec![0u8; total];

    let mut index = 0;
    for &tag in tags {
        let tag_length = number::tag_byte_length(tag);
        number::write_be(&mut buf[index..], u64::from(tag), tag_length);
        index += tag_length;
    }

    buf
}
