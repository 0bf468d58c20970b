//! Signal extraction from raw PID payloads.

use std::collections::BTreeMap;

use dx_protocol::{SignalId, SignalValue};

use crate::error::{DecodeError, DecodeResult};
use crate::formula::{MAX_MASK_BITS, MAX_SIGNAL_BYTES, ParameterInfo, SignalFormula};

/// Extract one physical value from `payload` (bytes after the mode/PID echo).
///
/// Reads only `payload[byte_offset .. byte_offset + num_of_bytes]`. Shift
/// amounts past the field width decode to zero rather than failing.
pub fn extract(formula: &SignalFormula, payload: &[u8]) -> DecodeResult<SignalValue> {
    let invalid = |reason: String| DecodeError::InvalidSignal {
        signal_id: formula.signal_id,
        reason,
    };
    if formula.num_of_bytes == 0 || formula.num_of_bytes > MAX_SIGNAL_BYTES {
        return Err(invalid(format!(
            "num_of_bytes {} outside 1..={MAX_SIGNAL_BYTES}",
            formula.num_of_bytes
        )));
    }
    if formula.bit_mask_len == 0 || formula.bit_mask_len > MAX_MASK_BITS {
        return Err(invalid(format!(
            "bit_mask_len {} outside 1..={MAX_MASK_BITS}",
            formula.bit_mask_len
        )));
    }

    let needed = formula.end();
    let bytes = payload
        .get(formula.byte_offset..needed)
        .ok_or(DecodeError::InsufficientLength {
            needed,
            actual: payload.len(),
        })?;

    let raw = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    let shifted = raw.checked_shr(u32::from(formula.bit_shift)).unwrap_or(0);
    let mask = (1u64 << formula.effective_mask_len().min(u32::from(MAX_MASK_BITS))) - 1;

    Ok((shifted & mask) as f64 * formula.scaling + formula.offset)
}

/// Outcome of applying every formula of one PID to its response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedParameter {
    pub values: BTreeMap<SignalId, SignalValue>,
    /// Signals that could not be extracted, with the reason.
    pub failures: Vec<(SignalId, DecodeError)>,
}

impl DecodedParameter {
    /// At least one signal decoded.
    pub fn is_usable(&self) -> bool {
        !self.values.is_empty()
    }
}

/// Apply each formula of `info` independently; one failing signal never
/// hides the others.
pub fn decode_parameter(info: &ParameterInfo, payload: &[u8]) -> DecodedParameter {
    let mut decoded = DecodedParameter::default();
    for formula in &info.formulas {
        match extract(formula, payload) {
            Ok(value) => {
                decoded.values.insert(formula.signal_id, value);
            }
            Err(e) => {
                tracing::debug!(
                    pid = info.pid,
                    signal_id = formula.signal_id,
                    error = %e,
                    "signal dropped"
                );
                decoded.failures.push((formula.signal_id, e));
            }
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn engine_speed() {
        let rpm = SignalFormula::new(1, 0).bytes(2).scaled(0.25, 0.0);
        let value = extract(&rpm, &[0x1A, 0xF8]).unwrap();
        assert_eq!(value, 1726.0);
    }

    #[test]
    fn coolant_temperature_negative_offset() {
        let coolant = SignalFormula::new(1, 0).scaled(1.0, -40.0);
        assert_eq!(extract(&coolant, &[0x00]).unwrap(), -40.0);
        assert_eq!(extract(&coolant, &[0x73]).unwrap(), 75.0);
    }

    #[test]
    fn fractional_scaling_applied_exactly() {
        let maf = SignalFormula::new(1, 1).bytes(2).scaled(0.03125, 0.0);
        // B..C = 0x0140 = 320 -> 10 g/s
        assert_eq!(extract(&maf, &[0x03, 0x01, 0x40, 0x00, 0x00]).unwrap(), 10.0);
    }

    #[test]
    fn bit_field() {
        // Byte J = 0b0000_1100 -> bits 2..3 = 0b11
        let status = SignalFormula::new(1, 9).bits(2, 2);
        let mut payload = [0u8; 10];
        payload[9] = 0b0000_1100;
        assert_eq!(extract(&status, &payload).unwrap(), 3.0);
        payload[9] = 0b1111_0011;
        assert_eq!(extract(&status, &payload).unwrap(), 0.0);
    }

    #[test]
    fn full_32_bit_field() {
        let mask = SignalFormula::new(1, 0).bytes(4).bits(0, 32);
        let value = extract(&mask, &[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(value, u32::MAX as f64);
    }

    #[test]
    fn short_response_is_insufficient_length() {
        let rpm = SignalFormula::new(1, 0).bytes(2).scaled(0.25, 0.0);
        assert_eq!(
            extract(&rpm, &[0x1A]),
            Err(DecodeError::InsufficientLength { needed: 2, actual: 1 })
        );
        assert_eq!(
            extract(&SignalFormula::new(1, 3), &[]),
            Err(DecodeError::InsufficientLength { needed: 4, actual: 0 })
        );
    }

    #[test]
    fn oversized_formula_rejected_at_runtime() {
        let wide = SignalFormula::new(0x01_0C_00, 0).bytes(5);
        assert!(matches!(
            extract(&wide, &[0; 8]),
            Err(DecodeError::InvalidSignal { signal_id: 0x01_0C_00, .. })
        ));
        let no_mask = SignalFormula::new(42, 0).bits(0, 0);
        let err = extract(&no_mask, &[0; 8]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSignal { signal_id: 42, .. }));
        assert!(err.to_string().contains("signal 0x2A"));
    }

    #[test]
    fn shift_past_width_decodes_to_zero() {
        let f = SignalFormula::new(1, 0).bits(200, 4).scaled(1.0, 5.0);
        assert_eq!(extract(&f, &[0xFF]).unwrap(), 5.0);
    }

    #[test]
    fn decode_parameter_keeps_good_signals() {
        let info = ParameterInfo::new(
            0x14,
            2,
            vec![
                SignalFormula::new(10, 0).scaled(0.005, 0.0),
                SignalFormula::new(11, 1).scaled(100.0 / 128.0, -100.0),
            ],
        );
        // Truncated: only the voltage byte arrived.
        let decoded = decode_parameter(&info, &[0xC8]);
        assert!(decoded.is_usable());
        assert_eq!(decoded.values.get(&10), Some(&1.0));
        assert!(!decoded.values.contains_key(&11));
        assert_eq!(decoded.failures.len(), 1);
        assert_eq!(decoded.failures[0].0, 11);
    }

    proptest! {
        #[test]
        fn extraction_is_total_and_deterministic(
            payload in proptest::collection::vec(any::<u8>(), 0..16),
            byte_offset in 0usize..12,
            num_of_bytes in 1usize..=4,
            bit_shift in 0u8..40,
            bit_mask_len in 1u8..=32,
            scaling in -1000.0f64..1000.0,
            offset in -1000.0f64..1000.0,
        ) {
            let formula = SignalFormula::new(1, byte_offset)
                .bytes(num_of_bytes)
                .bits(bit_shift, bit_mask_len)
                .scaled(scaling, offset);
            let first = extract(&formula, &payload);
            let second = extract(&formula, &payload);
            prop_assert_eq!(&first, &second);

            if payload.len() >= byte_offset + num_of_bytes {
                let value = first.unwrap();
                prop_assert!(value.is_finite());
            } else {
                let is_short = matches!(first, Err(DecodeError::InsufficientLength { .. }));
                prop_assert!(is_short);
            }
        }
    }
}
