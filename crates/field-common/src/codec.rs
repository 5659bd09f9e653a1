//! Decoding of base64-encoded packed 32-bit float arrays.
//!
//! The backend ships large numeric arrays as base64 of little-endian `f32`
//! values. Values are rounded to a fixed number of decimals at decode time.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{FieldError, FieldResult};

/// Decimal places applied when the caller has no better choice.
pub const DEFAULT_DECODE_DECIMALS: u32 = 4;

/// Decode a base64 packed `f32` array into rounded `f64` values.
///
/// NaN entries are preserved as NaN.
pub fn decode_packed_f32(encoded: &str, decimals: u32) -> FieldResult<Vec<f64>> {
    let bytes = STANDARD.decode(encoded.trim())?;
    if bytes.len() % 4 != 0 {
        return Err(FieldError::Decode(format!(
            "packed array length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    let factor = 10f64.powi(decimals.min(15) as i32);
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            round_to(f64::from(raw), factor)
        })
        .collect())
}

/// Decode a packed array where NaN marks "no data".
pub fn decode_packed_values(encoded: &str, decimals: u32) -> FieldResult<Vec<Option<f64>>> {
    Ok(decode_packed_f32(encoded, decimals)?
        .into_iter()
        .map(|v| v.is_finite().then_some(v))
        .collect())
}

/// Encode values as a packed `f32` base64 string. Used by fixtures and exporters.
pub fn encode_packed_f32(values: &[f64]) -> String {
    let bytes: Vec<u8> = values
        .iter()
        .flat_map(|v| (*v as f32).to_le_bytes())
        .collect();
    STANDARD.encode(bytes)
}

#[inline]
fn round_to(value: f64, factor: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value * factor).round() / factor
}
