//! Big-endian number arithmetic for tag and length fields

/// Returns the minimal number of bytes needed to encode the given tag.
///
/// The minimal form is the shortest big-endian representation with no
/// redundant leading zero byte, at least 1 byte and at most 4.
pub fn tag_byte_length(tag: u32) -> usize {
    let mut length = 4;

    while length > 1 && (tag >> ((length - 1) * 8)) & 0xFF == 0 {
        length -= 1;
    }

    length
}

/// Returns the number of bytes the length field of a TLV occupies.
///
/// For the indefinite form this is 3: the `0x80` marker plus the 2-byte
/// end-of-contents marker written after the value. For definite lengths it
/// is 1 for the short form, otherwise the "number of length octets" byte
/// plus up to 4 big-endian length octets.
pub fn length_field_byte_length(value_length: usize, indefinite_length: bool) -> usize {
    if indefinite_length {
        3
    } else if value_length > 0x00FF_FFFF {
        5
    } else if value_length > 0xFFFF {
        4
    } else if value_length > 0xFF {
        3
    } else if value_length > 0x7F {
        2
    } else {
        1
    }
}

/// Write the low `byte_count` bytes of `value` into `dest`, most
/// significant byte first, starting at offset 0.
///
/// The caller guarantees that `dest` holds at least `byte_count` bytes.
pub fn write_be(dest: &mut [u8], value: u64, byte_count: usize) {
    for i in 0..byte_count {
        dest[i] = (value >> ((byte_count - 1 - i) * 8)) as u8;
    }
}

/// Read `src` as a big-endian unsigned integer, most significant byte
/// first.
pub fn read_be(src: &[u8]) -> u64 {
    src.iter().fold(0u64, |value, &byte| (value << 8) | u64::from(byte))
}
