//! TLV node: the recursive Tag-Length-Value tree

use crate::error::{TlvError, TlvResult};
use crate::tlv::number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a TLV node.
///
/// A primitive node owns its raw value bytes; a constructed node owns an
/// ordered list of child nodes. The active variant determines whether the
/// node is constructed, there is no separate flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlvValue {
    /// Raw value bytes of a primitive node
    Primitive(#[serde(with = "serde_bytes")] Vec<u8>),
    /// Ordered child nodes of a constructed node
    Constructed(Vec<Tlv>),
}

/// A single TLV node.
///
/// Nodes are created either by [`TlvParser`](crate::tlv::parser::TlvParser)
/// (carrying `original_length`, the number of bytes consumed from the
/// source buffer) or programmatically for encoding. The tag and the
/// primitive/constructed shape are fixed at construction; the value bytes
/// of a primitive node can be rewritten in place via [`set_int_value`].
///
/// A parsed node always owns a copy of its value bytes. Mutating the
/// source buffer after parsing does not affect the node.
///
/// [`set_int_value`]: Tlv::set_int_value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tlv {
    tag: u32,
    value: TlvValue,
    indefinite_length: bool,
    original_length: Option<usize>,
}

impl Tlv {
    /// Create a primitive node owning the given value bytes.
    pub fn primitive(tag: u32, value: Vec<u8>) -> Self {
        Self {
            tag,
            value: TlvValue::Primitive(value),
            indefinite_length: false,
            original_length: None,
        }
    }

    /// Create a constructed node from an ordered list of children.
    pub fn constructed(tag: u32, children: Vec<Tlv>) -> Self {
        Self {
            tag,
            value: TlvValue::Constructed(children),
            indefinite_length: false,
            original_length: None,
        }
    }

    /// Create a constructed node that encodes with the indefinite-length
    /// form (`0x80` marker, value terminated by `0x00 0x00`).
    pub fn constructed_indefinite(tag: u32, children: Vec<Tlv>) -> Self {
        Self {
            tag,
            value: TlvValue::Constructed(children),
            indefinite_length: true,
            original_length: None,
        }
    }

    /// Constructor for nodes produced by the parser.
    pub(crate) fn parsed(
        tag: u32,
        value: TlvValue,
        indefinite_length: bool,
        original_length: usize,
    ) -> Self {
        Self {
            tag,
            value,
            indefinite_length,
            original_length: Some(original_length),
        }
    }

    /// Get the tag.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Get the value.
    pub fn value(&self) -> &TlvValue {
        &self.value
    }

    /// Check if this node is constructed (its value is a list of nodes).
    pub fn is_constructed(&self) -> bool {
        matches!(self.value, TlvValue::Constructed(_))
    }

    /// Check if this node was (or should be) encoded with the
    /// indefinite-length form.
    pub fn indefinite_length(&self) -> bool {
        self.indefinite_length
    }

    /// Total bytes this node consumed from the source buffer when it was
    /// parsed, including tag, length field, value and any end-of-contents
    /// marker. `None` for programmatically constructed nodes.
    pub fn original_length(&self) -> Option<usize> {
        self.original_length
    }

    /// Get the raw value bytes, or `None` for a constructed node.
    pub fn value_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            TlvValue::Primitive(bytes) => Some(bytes),
            TlvValue::Constructed(_) => None,
        }
    }

    /// Get the child nodes, or `None` for a primitive node.
    pub fn children(&self) -> Option<&[Tlv]> {
        match &self.value {
            TlvValue::Primitive(_) => None,
            TlvValue::Constructed(children) => Some(children),
        }
    }

    /// Total bytes this node would occupy if encoded now: tag length +
    /// length-field length + value length. Independent of
    /// [`original_length`](Tlv::original_length).
    pub fn byte_length(&self) -> usize {
        let value_length = self.value_byte_length();

        number::tag_byte_length(self.tag)
            + number::length_field_byte_length(value_length, self.indefinite_length)
            + value_length
    }

    /// Encoded byte length of the value: raw byte count for a primitive
    /// node, sum of the children's `byte_length()` for a constructed one.
    fn value_byte_length(&self) -> usize {
        match &self.value {
            TlvValue::Primitive(bytes) => bytes.len(),
            TlvValue::Constructed(children) => children.iter().map(Tlv::byte_length).sum(),
        }
    }

    /// Returns the first direct child with the given tag, in insertion
    /// order, or `None` if there is none (or this node is primitive).
    pub fn first_child(&self, tag: u32) -> Option<&Tlv> {
        self.children()?.iter().find(|child| child.tag == tag)
    }

    /// Returns all direct children with the given tag, insertion order
    /// preserved. Empty if there is none (or this node is primitive).
    pub fn children_with_tag(&self, tag: u32) -> Vec<&Tlv> {
        match &self.value {
            TlvValue::Primitive(_) => Vec::new(),
            TlvValue::Constructed(children) => {
                children.iter().filter(|child| child.tag == tag).collect()
            }
        }
    }

    /// Encode this node into a freshly allocated buffer sized exactly
    /// [`byte_length()`](Tlv::byte_length).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.byte_length()];
        self.write_into(&mut buf);
        buf
    }

    /// Encode this node into the given buffer.
    ///
    /// # Returns
    /// The number of bytes written, equal to `byte_length()`.
    ///
    /// # Errors
    /// Returns `TlvError::InvalidData` if `dest` is too small.
    pub fn encode_into(&self, dest: &mut [u8]) -> TlvResult<usize> {
        let needed = self.byte_length();

        if dest.len() < needed {
            return Err(TlvError::InvalidData(format!(
                "encode buffer too small: need {} bytes, have {}",
                needed,
                dest.len()
            )));
        }

        Ok(self.write_into(dest))
    }

    /// Write tag, length field and value. Caller guarantees capacity.
    fn write_into(&self, dest: &mut [u8]) -> usize {
        let tag_length = number::tag_byte_length(self.tag);
        let value_length = self.value_byte_length();
        let length_field = number::length_field_byte_length(value_length, self.indefinite_length);

        let mut index = 0;

        number::write_be(dest, u64::from(self.tag), tag_length);
        index += tag_length;

        if self.indefinite_length {
            dest[index] = 0x80;
            index += 1;
        } else if length_field == 1 {
            dest[index] = value_length as u8;
            index += 1;
        } else {
            let length_octets = length_field - 1;
            dest[index] = 0x80 | length_octets as u8;
            index += 1;
            number::write_be(&mut dest[index..], value_length as u64, length_octets);
            index += length_octets;
        }

        match &self.value {
            TlvValue::Primitive(bytes) => {
                dest[index..index + bytes.len()].copy_from_slice(bytes);
                index += bytes.len();
            }
            TlvValue::Constructed(children) => {
                for child in children {
                    index += child.write_into(&mut dest[index..]);
                }

                if self.indefinite_length {
                    dest[index] = 0x00;
                    dest[index + 1] = 0x00;
                    index += 2;
                }
            }
        }

        index
    }

    /// Interpret the primitive value as a big-endian unsigned integer.
    ///
    /// # Errors
    /// Returns `TlvError::OutOfRange` if the value is longer than 4 bytes
    /// and `TlvError::InvalidStructure` on a constructed node.
    pub fn uint_value(&self) -> TlvResult<u32> {
        let bytes = self.integer_bytes()?;
        Ok(number::read_be(bytes) as u32)
    }

    /// Interpret the primitive value as a big-endian signed integer,
    /// two's-complement sign-extended from the most significant bit of the
    /// first byte.
    ///
    /// # Errors
    /// Same conditions as [`uint_value`](Tlv::uint_value).
    pub fn int_value(&self) -> TlvResult<i32> {
        let bytes = self.integer_bytes()?;

        if bytes.is_empty() {
            return Ok(0);
        }

        let shift = 64 - bytes.len() * 8;
        Ok(((number::read_be(bytes) as i64) << shift >> shift) as i32)
    }

    /// Write `value` big-endian into the existing value buffer, truncated
    /// to the buffer's current length. Intended for fixed-width integer
    /// fields; the buffer is never resized.
    ///
    /// # Errors
    /// Returns `TlvError::OutOfRange` if the value buffer is longer than 4
    /// bytes and `TlvError::InvalidStructure` on a constructed node.
    pub fn set_int_value(&mut self, value: i64) -> TlvResult<()> {
        match &mut self.value {
            TlvValue::Primitive(bytes) => {
                let length = bytes.len();
                if length > 4 {
                    return Err(TlvError::OutOfRange(format!(
                        "integer value is {length} bytes (max 4)"
                    )));
                }
                number::write_be(bytes, value as u64, length);
                Ok(())
            }
            TlvValue::Constructed(_) => Err(TlvError::InvalidStructure(
                "cannot set an integer value on a constructed TLV".to_string(),
            )),
        }
    }

    /// Value bytes for the integer accessors, range-checked.
    fn integer_bytes(&self) -> TlvResult<&[u8]> {
        match &self.value {
            TlvValue::Primitive(bytes) => {
                if bytes.len() > 4 {
                    return Err(TlvError::OutOfRange(format!(
                        "integer value is {} bytes (max 4)",
                        bytes.len()
                    )));
                }
                Ok(bytes)
            }
            TlvValue::Constructed(_) => Err(TlvError::InvalidStructure(
                "cannot read an integer value from a constructed TLV".to_string(),
            )),
        }
    }
}

impl fmt::Display for Tlv {
    /// Debug rendering: the tag in hex and either an indented tree of
    /// children or the value bytes in hex. Not part of the wire contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TlvValue::Constructed(children) if !children.is_empty() => {
                write!(f, "TLV 0x{:X}", self.tag)?;

                for child in children {
                    for line in child.to_string().lines() {
                        write!(f, "\n\t{line}")?;
                    }
                }

                Ok(())
            }
            TlvValue::Constructed(_) => write!(f, "TLV 0x{:X} []", self.tag),
            TlvValue::Primitive(bytes) => {
                write!(f, "TLV 0x{:X} [", self.tag)?;

                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "0x{byte:02X}")?;
                }

                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_length_primitive_short_form() {
        let tlv = Tlv::primitive(0xC2, vec![0xAB; 0x7F]);
        assert_eq!(tlv.byte_length(), 129);
    }

    #[test]
    fn test_byte_length_two_byte_tag_empty_value() {
        let tlv = Tlv::primitive(0x9FC2, Vec::new());
        assert_eq!(tlv.byte_length(), 3);
    }

    #[test]
    fn test_byte_length_three_byte_tag_long_form() {
        let tlv = Tlv::primitive(0x9FC2C2, vec![0x00; 0x100]);
        assert_eq!(tlv.byte_length(), 0x106);
    }

    #[test]
    fn test_byte_length_four_byte_tag() {
        let tlv = Tlv::primitive(0x9FC2C222, vec![0x00; 0x80]);
        assert_eq!(tlv.byte_length(), 0x86);
    }

    #[test]
    fn test_byte_length_constructed() {
        let tlv = Tlv::constructed(
            0x3F12,
            vec![
                Tlv::primitive(0x9F70, vec![0x00; 0x80]),
                Tlv::primitive(0x82, vec![0x00]),
            ],
        );
        assert_eq!(tlv.byte_length(), 0x8B);
    }

    #[test]
    fn test_byte_length_constructed_indefinite_child() {
        let child1 = Tlv::constructed_indefinite(0x3F70, vec![Tlv::primitive(0x81, vec![0x00; 0x7E])]);
        let child2 = Tlv::primitive(0x82, vec![0x00]);
        let tlv = Tlv::constructed(0x3F12, vec![child1, child2]);

        // child1: 2 (tag) + 3 (0x80 marker + EOC) + 0x80 = 0x85
        assert_eq!(tlv.byte_length(), 0x8C);
    }

    #[test]
    fn test_encode_into_given_buffer() {
        let tlv = Tlv::primitive(0x80, vec![0xCA, 0xFE, 0xBA, 0xBE]);
        let mut buf = [0u8; 6];

        let written = tlv.encode_into(&mut buf).unwrap();
        assert_eq!(written, 6);
        assert_eq!(buf, [0x80, 0x04, 0xCA, 0xFE, 0xBA, 0xBE]);
    }

    #[test]
    fn test_encode_into_too_small() {
        let tlv = Tlv::primitive(0x80, vec![0xCA, 0xFE, 0xBA, 0xBE]);
        let mut buf = [0u8; 5];

        assert!(matches!(
            tlv.encode_into(&mut buf),
            Err(TlvError::InvalidData(_))
        ));
    }

    #[test]
    fn test_encode_primitive_boundary_length() {
        let tlv = Tlv::primitive(0x80, vec![0xAA; 0x7F]);
        let encoded = tlv.encode();

        assert_eq!(encoded.len(), 0x81);
        assert_eq!(&encoded[..2], &[0x80, 0x7F]);
        assert_eq!(&encoded[2..], &[0xAA; 0x7F]);
    }

    #[test]
    fn test_encode_constructed() {
        let tlv = Tlv::constructed(0xA0, vec![Tlv::primitive(0xCA, vec![0xBA, 0xBE])]);
        assert_eq!(tlv.encode(), [0xA0, 0x04, 0xCA, 0x02, 0xBA, 0xBE]);
    }

    #[test]
    fn test_encode_two_byte_tag() {
        let tlv = Tlv::primitive(0x9F70, vec![0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(tlv.encode(), [0x9F, 0x70, 0x04, 0xCA, 0xFE, 0xBA, 0xBE]);
    }

    #[test]
    fn test_encode_long_form_one_octet() {
        let tlv = Tlv::primitive(0x9F8120, vec![0x00; 0x80]);
        let encoded = tlv.encode();

        assert_eq!(&encoded[..5], &[0x9F, 0x81, 0x20, 0x81, 0x80]);
        assert_eq!(encoded.len(), 5 + 0x80);
    }

    #[test]
    fn test_encode_long_form_two_octets() {
        let tlv = Tlv::primitive(0xC0, vec![0x00; 0x100]);
        let encoded = tlv.encode();

        assert_eq!(&encoded[..4], &[0xC0, 0x82, 0x01, 0x00]);
        assert_eq!(encoded.len(), 4 + 0x100);
    }

    #[test]
    fn test_encode_indefinite_length() {
        let tlv = Tlv::constructed_indefinite(0xA0, vec![Tlv::primitive(0xCA, vec![0xBA, 0xBE])]);
        assert_eq!(
            tlv.encode(),
            [0xA0, 0x80, 0xCA, 0x02, 0xBA, 0xBE, 0x00, 0x00]
        );
    }

    #[test]
    fn test_first_child() {
        let parent = Tlv::constructed(
            0xE1,
            vec![
                Tlv::primitive(0x80, vec![0xFA, 0xFB]),
                Tlv::primitive(0x81, vec![0xAA, 0xAB]),
                Tlv::primitive(0x82, vec![0xDA, 0xDB]),
                Tlv::primitive(0x81, vec![0xFF, 0xFF]),
            ],
        );

        let child = parent.first_child(0x81).unwrap();
        assert_eq!(child.value_bytes(), Some(&[0xAA, 0xAB][..]));

        assert!(parent.first_child(0x84).is_none());
    }

    #[test]
    fn test_first_child_on_primitive() {
        let tlv = Tlv::primitive(0x80, vec![0x81, 0x00]);
        assert!(tlv.first_child(0x81).is_none());
    }

    #[test]
    fn test_children_with_tag() {
        let parent = Tlv::constructed(
            0xE1,
            vec![
                Tlv::primitive(0x80, vec![0xFA, 0xFB]),
                Tlv::primitive(0x81, vec![0xAA, 0xAB]),
                Tlv::primitive(0x81, vec![0xA1, 0xA2]),
                Tlv::primitive(0x82, vec![0xDA, 0xDB]),
                Tlv::primitive(0x81, vec![0xFF, 0xFF]),
            ],
        );

        let matches = parent.children_with_tag(0x81);
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].value_bytes(), Some(&[0xAA, 0xAB][..]));
        assert_eq!(matches[1].value_bytes(), Some(&[0xA1, 0xA2][..]));
        assert_eq!(matches[2].value_bytes(), Some(&[0xFF, 0xFF][..]));

        assert!(parent.children_with_tag(0x84).is_empty());
    }

    #[test]
    fn test_uint_value() {
        assert_eq!(Tlv::primitive(0x80, vec![0xFF]).uint_value().unwrap(), 255);
        assert_eq!(
            Tlv::primitive(0x80, vec![0xFF, 0xFF]).uint_value().unwrap(),
            65535
        );
        assert_eq!(
            Tlv::primitive(0x80, vec![0xFF, 0xFF, 0xFF, 0xFF])
                .uint_value()
                .unwrap(),
            4294967295
        );
        assert_eq!(
            Tlv::primitive(0x80, vec![0xDE, 0xAD, 0xBE, 0xEF])
                .uint_value()
                .unwrap(),
            3735928559
        );
    }

    #[test]
    fn test_int_value_sign_extension() {
        assert_eq!(Tlv::primitive(0x80, vec![0xFF]).int_value().unwrap(), -1);
        assert_eq!(Tlv::primitive(0x80, vec![0x7F]).int_value().unwrap(), 127);
        assert_eq!(
            Tlv::primitive(0x80, vec![0xFF, 0xFF]).int_value().unwrap(),
            -1
        );
        assert_eq!(
            Tlv::primitive(0x80, vec![0x7F, 0xFF, 0xFF]).int_value().unwrap(),
            8388607
        );
        assert_eq!(
            Tlv::primitive(0x80, vec![0xFF, 0xFF, 0xFF, 0xFF])
                .int_value()
                .unwrap(),
            -1
        );
        assert_eq!(
            Tlv::primitive(0x80, vec![0x5E, 0xAD, 0xBE, 0xEF])
                .int_value()
                .unwrap(),
            1588444911
        );
    }

    #[test]
    fn test_integer_value_longer_than_four_bytes() {
        let tlv = Tlv::primitive(0x80, vec![0x01, 0x02, 0x03, 0x04, 0x05]);

        assert!(matches!(tlv.uint_value(), Err(TlvError::OutOfRange(_))));
        assert!(matches!(tlv.int_value(), Err(TlvError::OutOfRange(_))));
    }

    #[test]
    fn test_integer_value_on_constructed() {
        let tlv = Tlv::constructed(0xE1, Vec::new());

        assert!(matches!(
            tlv.uint_value(),
            Err(TlvError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_set_int_value() {
        let mut tlv = Tlv::primitive(0x80, vec![0x00; 2]);

        tlv.set_int_value(65535).unwrap();
        assert_eq!(tlv.value_bytes(), Some(&[0xFF, 0xFF][..]));

        tlv.set_int_value(-1).unwrap();
        assert_eq!(tlv.value_bytes(), Some(&[0xFF, 0xFF][..]));

        tlv.set_int_value(32767).unwrap();
        assert_eq!(tlv.value_bytes(), Some(&[0x7F, 0xFF][..]));
    }

    #[test]
    fn test_set_int_value_truncates_to_buffer_width() {
        let mut tlv = Tlv::primitive(0x80, vec![0x00; 4]);

        tlv.set_int_value(4294967295).unwrap();
        assert_eq!(tlv.value_bytes(), Some(&[0xFF, 0xFF, 0xFF, 0xFF][..]));

        tlv.set_int_value(2147483647).unwrap();
        assert_eq!(tlv.value_bytes(), Some(&[0x7F, 0xFF, 0xFF, 0xFF][..]));
    }

    #[test]
    fn test_set_int_value_on_wide_buffer() {
        let mut tlv = Tlv::primitive(0x80, vec![0x00; 5]);

        assert!(matches!(
            tlv.set_int_value(1),
            Err(TlvError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_set_int_value_on_constructed() {
        let mut tlv = Tlv::constructed(0xE1, Vec::new());

        assert!(matches!(
            tlv.set_int_value(1),
            Err(TlvError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_display_primitive() {
        let tlv = Tlv::primitive(0x9F70, vec![0xCA, 0xFE]);
        assert_eq!(tlv.to_string(), "TLV 0x9F70 [0xCA 0xFE]");
    }

    #[test]
    fn test_display_constructed_tree() {
        let tlv = Tlv::constructed(
            0xE1,
            vec![Tlv::constructed(0xA0, vec![Tlv::primitive(0x82, vec![0x01])])],
        );
        assert_eq!(tlv.to_string(), "TLV 0xE1\n\tTLV 0xA0\n\t\tTLV 0x82 [0x01]");
    }
}
