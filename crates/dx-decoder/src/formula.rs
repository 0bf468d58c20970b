//! Signal formulas and per-PID parameter descriptions.
//!
//! A formula locates one signal inside a PID response:
//!
//! ```text
//! raw      = big-endian(bytes[byte_offset .. byte_offset + num_of_bytes])
//! field    = (raw >> bit_shift) & ((1 << bit_mask_len) - 1)
//! physical = field * scaling + offset
//! ```
//!
//! Mass Air Flow Sensor A (PID 0x66, bytes B..C) is
//! `byte_offset = 1, num_of_bytes = 2, scaling = 0.03125`. Boost Pressure B
//! Control Status (PID 0x70, byte J, bits 2..3) is
//! `byte_offset = 9, bit_shift = 2, bit_mask_len = 2`.

use dx_protocol::{INVALID_PID, Pid, SignalId};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};

/// Widest raw integer a formula may combine.
pub const MAX_SIGNAL_BYTES: usize = 4;

/// Widest mask a formula may apply.
pub const MAX_MASK_BITS: u8 = 32;

/// Mask length that means "the whole byte" and, on a multi-byte signal,
/// "the whole field".
pub const FULL_BYTE_MASK: u8 = 8;

/// How to extract one signal from a PID response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFormula {
    pub signal_id: SignalId,
    #[serde(default = "default_scaling")]
    pub scaling: f64,
    #[serde(default)]
    pub offset: f64,
    /// First payload byte (0-based, after the mode/PID echo).
    #[serde(default)]
    pub byte_offset: usize,
    #[serde(default = "default_num_of_bytes")]
    pub num_of_bytes: usize,
    #[serde(default)]
    pub bit_shift: u8,
    #[serde(default = "default_bit_mask_len")]
    pub bit_mask_len: u8,
}

fn default_scaling() -> f64 {
    1.0
}

fn default_num_of_bytes() -> usize {
    1
}

fn default_bit_mask_len() -> u8 {
    FULL_BYTE_MASK
}

impl SignalFormula {
    /// Single unscaled byte at `byte_offset`.
    pub fn new(signal_id: SignalId, byte_offset: usize) -> Self {
        Self {
            signal_id,
            scaling: 1.0,
            offset: 0.0,
            byte_offset,
            num_of_bytes: 1,
            bit_shift: 0,
            bit_mask_len: FULL_BYTE_MASK,
        }
    }

    /// Combine `num_of_bytes` bytes big-endian.
    pub fn bytes(mut self, num_of_bytes: usize) -> Self {
        self.num_of_bytes = num_of_bytes;
        self
    }

    pub fn scaled(mut self, scaling: f64, offset: f64) -> Self {
        self.scaling = scaling;
        self.offset = offset;
        self
    }

    /// Keep `mask_len` bits starting `shift` bits above the LSB.
    pub fn bits(mut self, shift: u8, mask_len: u8) -> Self {
        self.bit_shift = shift;
        self.bit_mask_len = mask_len;
        self
    }

    /// One past the last payload byte this formula reads.
    pub fn end(&self) -> usize {
        self.byte_offset.saturating_add(self.num_of_bytes)
    }

    /// Bits in the combined raw integer.
    pub fn width_bits(&self) -> u32 {
        (self.num_of_bytes as u32).saturating_mul(8)
    }

    /// Number of low-order bits kept after shifting.
    ///
    /// The default mask (8) on a multi-byte signal keeps the whole field.
    pub fn effective_mask_len(&self) -> u32 {
        if self.num_of_bytes > 1 && self.bit_mask_len == FULL_BYTE_MASK {
            self.width_bits().saturating_sub(u32::from(self.bit_shift))
        } else {
            u32::from(self.bit_mask_len)
        }
    }

    /// Check width and mask bounds. Catalog loading calls this for every
    /// formula so decode never meets a misconfigured one.
    pub fn validate(&self, pid: Pid) -> DecodeResult<()> {
        let invalid = |reason: String| DecodeError::InvalidFormula { pid, reason };

        if self.num_of_bytes == 0 || self.num_of_bytes > MAX_SIGNAL_BYTES {
            return Err(invalid(format!(
                "signal {:#X}: num_of_bytes {} outside 1..={MAX_SIGNAL_BYTES}",
                self.signal_id, self.num_of_bytes
            )));
        }
        if self.bit_mask_len == 0 || self.bit_mask_len > MAX_MASK_BITS {
            return Err(invalid(format!(
                "signal {:#X}: bit_mask_len {} outside 1..={MAX_MASK_BITS}",
                self.signal_id, self.bit_mask_len
            )));
        }
        let width = self.width_bits();
        if u32::from(self.bit_shift) >= width {
            return Err(invalid(format!(
                "signal {:#X}: bit_shift {} leaves no bits of a {width}-bit field",
                self.signal_id, self.bit_shift
            )));
        }
        let available = width - u32::from(self.bit_shift);
        if self.effective_mask_len() > available {
            return Err(invalid(format!(
                "signal {:#X}: bit_mask_len {} exceeds the {available} bits left after shifting",
                self.signal_id, self.bit_mask_len
            )));
        }
        if !self.scaling.is_finite() || !self.offset.is_finite() {
            return Err(invalid(format!(
                "signal {:#X}: scaling and offset must be finite",
                self.signal_id
            )));
        }
        Ok(())
    }
}

/// One PID: its expected response length and the signals packed into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub pid: Pid,
    /// Expected payload length in bytes (mode/PID echo excluded).
    pub response_len: usize,
    /// Applied independently; order carries no meaning.
    #[serde(default)]
    pub formulas: Vec<SignalFormula>,
}

impl ParameterInfo {
    pub fn new(pid: Pid, response_len: usize, formulas: Vec<SignalFormula>) -> Self {
        Self {
            pid,
            response_len,
            formulas,
        }
    }

    /// Whether this PID carries at least one decodable signal.
    pub fn is_decodable(&self) -> bool {
        !self.formulas.is_empty()
    }

    pub fn validate(&self) -> DecodeResult<()> {
        if self.pid == INVALID_PID {
            return Err(DecodeError::InvalidFormula {
                pid: self.pid,
                reason: "PID 0xFF is reserved as the not-found sentinel".into(),
            });
        }
        for formula in &self.formulas {
            formula.validate(self.pid)?;
            if formula.end() > self.response_len {
                return Err(DecodeError::InvalidFormula {
                    pid: self.pid,
                    reason: format!(
                        "signal {:#X} reads bytes {}..{} of a {}-byte response",
                        formula.signal_id,
                        formula.byte_offset,
                        formula.end(),
                        self.response_len
                    ),
                });
            }
        }
        Ok(())
    }
}
