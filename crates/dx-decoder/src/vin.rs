//! Vehicle Identification Number (mode 09 PID 02).

/// Characters in a VIN.
pub const VIN_LEN: usize = 17;

/// Decode a VIN response payload.
///
/// CAN ECUs prefix the 17 characters with a data-item count byte; older
/// protocols pad with leading zeros. Both are stripped. Returns `None` unless
/// exactly 17 printable ASCII characters remain.
pub fn decode_vin(payload: &[u8]) -> Option<String> {
    let text = match payload.len() {
        n if n > VIN_LEN => &payload[n - VIN_LEN..],
        _ => payload,
    };
    if text.len() != VIN_LEN || !text.iter().all(|b| b.is_ascii_graphic()) {
        return None;
    }
    String::from_utf8(text.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIN: &[u8] = b"1HGCM82633A004352";

    #[test]
    fn plain_vin() {
        assert_eq!(decode_vin(VIN).as_deref(), Some("1HGCM82633A004352"));
    }

    #[test]
    fn count_byte_prefix_stripped() {
        let mut payload = vec![0x01];
        payload.extend_from_slice(VIN);
        assert_eq!(decode_vin(&payload).as_deref(), Some("1HGCM82633A004352"));
    }

    #[test]
    fn short_or_garbled_vin_rejected() {
        assert_eq!(decode_vin(&VIN[..16]), None);
        let mut garbled = VIN.to_vec();
        garbled[5] = 0x00;
        assert_eq!(decode_vin(&garbled), None);
    }
}
