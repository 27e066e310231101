//! Binary and Gray-code codecs
//!
//! Integers and reals can be packed into an inclusive bit range
//! `start..=end` of a binary chromosome, most significant bit first.

use crate::error::ContractViolation;

fn check_range(bits: &[bool], start: usize, end: usize) -> Result<u32, ContractViolation> {
    let length = bits.len();
    if start > end || end >= length || end - start >= 64 {
        return Err(ContractViolation::BitRange { start, end, length });
    }
    Ok((end - start + 1) as u32)
}

fn max_value(width: u32) -> u64 {
    if width == 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn write_bits(bits: &mut [bool], start: usize, end: usize, value: u64) {
    let width = end - start + 1;
    for (k, bit) in bits[start..=end].iter_mut().enumerate() {
        *bit = (value >> (width - 1 - k)) & 1 == 1;
    }
}

fn read_bits(bits: &[bool], start: usize, end: usize) -> u64 {
    bits[start..=end]
        .iter()
        .fold(0u64, |acc, &b| (acc << 1) | u64::from(b))
}

/// Convert a binary number to its reflected Gray code
pub fn binary_to_gray(value: u64) -> u64 {
    value ^ (value >> 1)
}

/// Convert a reflected Gray code back to a binary number
pub fn gray_to_binary(gray: u64) -> u64 {
    let mut value = gray;
    let mut shift = 1;
    while shift < 64 {
        value ^= value >> shift;
        shift <<= 1;
    }
    value
}

/// Encode `value` as plain binary into `bits[start..=end]`
pub fn encode_int_as_binary(
    bits: &mut [bool],
    start: usize,
    end: usize,
    value: u64,
) -> Result<(), ContractViolation> {
    let width = check_range(bits, start, end)?;
    if value > max_value(width) {
        return Err(ContractViolation::Unencodable {
            value: value.to_string(),
            reason: format!("does not fit into {width} bits"),
        });
    }
    write_bits(bits, start, end, value);
    Ok(())
}

/// Decode the plain binary integer stored in `bits[start..=end]`
pub fn int_from_binary(bits: &[bool], start: usize, end: usize) -> Result<u64, ContractViolation> {
    check_range(bits, start, end)?;
    Ok(read_bits(bits, start, end))
}

/// Encode `value` as Gray code into `bits[start..=end]`
pub fn encode_int_as_gray_code(
    bits: &mut [bool],
    start: usize,
    end: usize,
    value: u64,
) -> Result<(), ContractViolation> {
    let width = check_range(bits, start, end)?;
    if value > max_value(width) {
        return Err(ContractViolation::Unencodable {
            value: value.to_string(),
            reason: format!("does not fit into {width} bits"),
        });
    }
    write_bits(bits, start, end, binary_to_gray(value));
    Ok(())
}

/// Decode the Gray-coded integer stored in `bits[start..=end]`
pub fn int_from_gray_code(
    bits: &[bool],
    start: usize,
    end: usize,
) -> Result<u64, ContractViolation> {
    check_range(bits, start, end)?;
    Ok(gray_to_binary(read_bits(bits, start, end)))
}

fn real_to_int(width: u32, low: f64, high: f64, value: f64) -> Result<u64, ContractViolation> {
    let interval_ok = low.is_finite() && high.is_finite() && low < high;
    if !interval_ok || !value.is_finite() || value < low || value > high {
        return Err(ContractViolation::Unencodable {
            value: value.to_string(),
            reason: format!("outside the interval [{low}, {high}]"),
        });
    }
    let steps = max_value(width) as f64;
    let scaled = ((value - low) / (high - low) * steps).round();
    Ok(scaled.clamp(0.0, steps) as u64)
}

fn int_to_real(width: u32, low: f64, high: f64, value: u64) -> f64 {
    low + value as f64 * (high - low) / max_value(width) as f64
}

/// Map `value` from `[low, high]` onto the bit range as plain binary
pub fn encode_real_as_binary(
    bits: &mut [bool],
    start: usize,
    end: usize,
    low: f64,
    high: f64,
    value: f64,
) -> Result<(), ContractViolation> {
    let width = check_range(bits, start, end)?;
    let encoded = real_to_int(width, low, high, value)?;
    write_bits(bits, start, end, encoded);
    Ok(())
}

/// Decode a plain binary bit range into `[low, high]`
pub fn real_from_binary(
    bits: &[bool],
    start: usize,
    end: usize,
    low: f64,
    high: f64,
) -> Result<f64, ContractViolation> {
    let width = check_range(bits, start, end)?;
    Ok(int_to_real(width, low, high, read_bits(bits, start, end)))
}

/// Map `value` from `[low, high]` onto the bit range as Gray code
pub fn encode_real_as_gray_code(
    bits: &mut [bool],
    start: usize,
    end: usize,
    low: f64,
    high: f64,
    value: f64,
) -> Result<(), ContractViolation> {
    let width = check_range(bits, start, end)?;
    let encoded = real_to_int(width, low, high, value)?;
    write_bits(bits, start, end, binary_to_gray(encoded));
    Ok(())
}

/// Decode a Gray-coded bit range into `[low, high]`
pub fn real_from_gray_code(
    bits: &[bool],
    start: usize,
    end: usize,
    low: f64,
    high: f64,
) -> Result<f64, ContractViolation> {
    let width = check_range(bits, start, end)?;
    let decoded = gray_to_binary(read_bits(bits, start, end));
    Ok(int_to_real(width, low, high, decoded))
}
