//! Recursive-descent BER-TLV decoder

use crate::error::{TlvError, TlvResult};
use crate::tlv::node::{Tlv, TlvValue};
use crate::tlv::number;
use log::trace;

/// Tag of the end-of-contents marker terminating an indefinite-length value
const END_OF_CONTENTS_TAG: u32 = 0x00;
/// Total encoded size of the end-of-contents marker (tag 0x00, length 0x00)
const END_OF_CONTENTS_LENGTH: usize = 2;

/// A tag read from the head of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTag {
    /// The tag as its raw big-endian byte value
    pub tag: u32,
    /// Number of bytes the tag occupies (1-4)
    pub byte_length: usize,
    /// Result of the parser's constructed-tag predicate for this tag
    pub constructed: bool,
}

/// Standard BER constructed-tag convention: bit `0x20` of the first tag
/// byte. Protocol-specific predicates usually delegate to this and add
/// their own tags on top.
pub fn ber_constructed(first_tag_byte: u8) -> bool {
    first_tag_byte & 0x20 == 0x20
}

/// BER-TLV parser.
///
/// The parser is purely functional over its input; the only configuration
/// it holds is the constructed-tag predicate, fixed at construction. Some
/// protocols carry nested TLVs under tags without the standard `0x20` bit
/// (ZVT marks tag 0x06 constructed, for instance), so the predicate is
/// supplied as a strategy rather than hardcoded:
///
/// ```rust
/// use zvt_tlv::tlv::parser::{ber_constructed, TlvParser};
///
/// let parser = TlvParser::with_constructed_predicate(|byte| {
///     ber_constructed(byte) || byte == 0x06
/// });
/// # let _ = parser;
/// ```
///
/// All parsed nodes own a copy of their value bytes; mutating the input
/// buffer after a parse call does not affect the returned tree. Malformed
/// input never yields a partial tree, the first violation aborts the whole
/// parse with an error.
pub struct TlvParser {
    is_constructed: Box<dyn Fn(u8) -> bool + Send + Sync>,
}

impl Default for TlvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TlvParser {
    /// Create a parser using the standard BER constructed-tag convention.
    pub fn new() -> Self {
        Self::with_constructed_predicate(ber_constructed)
    }

    /// Create a parser with a protocol-specific constructed-tag predicate.
    /// The predicate is applied to the first byte of each tag.
    pub fn with_constructed_predicate<F>(predicate: F) -> Self
    where
        F: Fn(u8) -> bool + Send + Sync + 'static,
    {
        Self {
            is_constructed: Box::new(predicate),
        }
    }

    /// Parse the first TLV in the buffer.
    ///
    /// Any data after the first TLV is ignored; the returned node's
    /// `original_length` tells how many bytes belong to it. The value is a
    /// copy of the input data, never a view into it.
    ///
    /// # Errors
    /// - `TlvError::OutOfRange` for a tag or length-of-length wider than 4
    ///   bytes
    /// - `TlvError::InvalidStructure` for an indefinite length on a tag the
    ///   predicate reports as primitive
    /// - `TlvError::InvalidData` for a truncated buffer
    pub fn parse(&self, buf: &[u8]) -> TlvResult<Tlv> {
        let tag = self.parse_tag(buf)?;
        let mut index = tag.byte_length;

        let first_length_byte = read_byte(buf, index)?;

        if first_length_byte == 0x80 {
            index += 1;

            if !tag.constructed {
                return Err(TlvError::InvalidStructure(
                    "only a constructed TLV can have an indefinite length".to_string(),
                ));
            }

            // Children run until the end-of-contents marker, which is
            // consumed but not kept as a child.
            let (children, consumed) = self.parse_children(&buf[index..], true)?;
            let original_length = index + consumed;

            trace!(
                "parsed indefinite-length TLV 0x{:X} ({} children, {} bytes)",
                tag.tag,
                children.len(),
                original_length
            );

            return Ok(Tlv::parsed(
                tag.tag,
                TlvValue::Constructed(children),
                true,
                original_length,
            ));
        }

        let length = if first_length_byte & 0x80 == 0x80 {
            let length_octets = (first_length_byte & 0x7F) as usize;
            index += 1;

            if length_octets > 4 {
                return Err(TlvError::OutOfRange(format!(
                    "length field declares {length_octets} octets (max 4 in this implementation)"
                )));
            }

            let octets = read_slice(buf, index, length_octets)?;
            index += length_octets;
            number::read_be(octets) as usize
        } else {
            index += 1;
            usize::from(first_length_byte)
        };

        let value_bytes = read_slice(buf, index, length)?;
        index += length;

        let value = if tag.constructed {
            // Definite length, so the children must fill the value range
            // exactly; parse_children errors out if a child overruns it.
            let (children, _) = self.parse_children(value_bytes, false)?;
            TlvValue::Constructed(children)
        } else {
            TlvValue::Primitive(value_bytes.to_vec())
        };

        trace!("parsed TLV 0x{:X} ({} bytes)", tag.tag, index);

        Ok(Tlv::parsed(tag.tag, value, false, index))
    }

    /// Parse the whole buffer as a sequence of TLVs.
    ///
    /// The cursor advances by each node's `original_length` until the
    /// buffer is exhausted; the buffer must contain nothing but valid TLVs.
    pub fn parse_all(&self, buf: &[u8]) -> TlvResult<Vec<Tlv>> {
        let (tlvs, _) = self.parse_children(buf, false)?;
        Ok(tlvs)
    }

    /// Parse consecutive TLVs and return them with the number of bytes
    /// consumed. With `stop_on_end_of_contents` the sequence ends at the
    /// 2-byte end-of-contents marker, which is consumed (and counted) but
    /// not returned.
    fn parse_children(
        &self,
        buf: &[u8],
        stop_on_end_of_contents: bool,
    ) -> TlvResult<(Vec<Tlv>, usize)> {
        let mut tlvs = Vec::new();
        let mut index = 0;

        while index < buf.len() {
            let tlv = self.parse(&buf[index..])?;
            let consumed = tlv.original_length().unwrap_or_else(|| tlv.byte_length());
            index += consumed;

            if stop_on_end_of_contents
                && tlv.tag() == END_OF_CONTENTS_TAG
                && consumed == END_OF_CONTENTS_LENGTH
            {
                return Ok((tlvs, index));
            }

            tlvs.push(tlv);
        }

        if stop_on_end_of_contents {
            return Err(TlvError::InvalidData(
                "indefinite-length value is missing its end-of-contents marker".to_string(),
            ));
        }

        Ok((tlvs, index))
    }

    /// Parse the first bytes of the buffer as a TLV tag.
    ///
    /// The first byte's low 5 bits all set (`0x1F`) start a multi-byte
    /// tag: continuation bytes are shifted in while the just-read byte has
    /// its high bit set. The constructed flag comes from the parser's
    /// predicate applied to the first byte.
    ///
    /// # Errors
    /// `TlvError::OutOfRange` if the tag would span more than 4 bytes.
    pub fn parse_tag(&self, buf: &[u8]) -> TlvResult<ParsedTag> {
        let first = read_byte(buf, 0)?;
        let constructed = (self.is_constructed)(first);

        let mut tag = u64::from(first);
        let mut byte_length = 1;

        if first & 0x1F == 0x1F {
            loop {
                if byte_length == 4 {
                    return Err(TlvError::OutOfRange(
                        "tag cannot be more than 4 bytes in this implementation".to_string(),
                    ));
                }

                let byte = read_byte(buf, byte_length)?;
                tag = (tag << 8) | u64::from(byte);
                byte_length += 1;

                if byte & 0x80 == 0 {
                    break;
                }
            }
        }

        Ok(ParsedTag {
            tag: tag as u32,
            byte_length,
            constructed,
        })
    }

    /// Parse the entire buffer as a flat sequence of bare tags (no length
    /// or value fields), as used in tag-request lists.
    pub fn parse_all_tags(&self, buf: &[u8]) -> TlvResult<Vec<u32>> {
        let mut tags = Vec::new();
        let mut index = 0;

        while index < buf.len() {
            let parsed = self.parse_tag(&buf[index..])?;
            index += parsed.byte_length;
            tags.push(parsed.tag);
        }

        Ok(tags)
    }
}

fn read_byte(buf: &[u8], index: usize) -> TlvResult<u8> {
    buf.get(index).copied().ok_or_else(|| {
        TlvError::InvalidData(format!("buffer exhausted at offset {index}"))
    })
}

fn read_slice(buf: &[u8], index: usize, count: usize) -> TlvResult<&[u8]> {
    buf.get(index..index + count).ok_or_else(|| {
        TlvError::InvalidData(format!(
            "buffer exhausted: need {} bytes at offset {}, have {}",
            count,
            index,
            buf.len().saturating_sub(index)
        ))
    })
}
