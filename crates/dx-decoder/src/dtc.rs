//! Trouble-code decoding (SAE J2012 two-byte layout).

use dx_protocol::DtcCategory;

/// Decode one raw DTC pair into its five-character code.
///
/// Byte 1 bits 7..6 pick the letter, bits 5..4 the first digit, and the low
/// nibble the second. Byte 2 supplies the last two hex digits. The all-zero
/// pair is padding and yields `None`.
pub fn decode_dtc(b1: u8, b2: u8) -> Option<String> {
    if b1 == 0x00 && b2 == 0x00 {
        return None;
    }

    let letter = DtcCategory::from_first_byte(b1).letter();
    let digit1 = (b1 >> 4) & 0x03;
    let digit2 = b1 & 0x0F;
    let digit3 = b2 >> 4;
    let digit4 = b2 & 0x0F;

    Some(format!("{letter}{digit1}{digit2:X}{digit3:X}{digit4:X}"))
}

/// Decode a mode 03/07/02 DTC block (bytes after the mode echo) in order.
///
/// A block whose length is zero or odd is not a sequence of pairs and
/// decodes to nothing.
pub fn decode_dtc_block(bytes: &[u8]) -> Vec<String> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(2)
        .filter_map(|pair| decode_dtc(pair[0], pair[1]))
        .collect()
}
