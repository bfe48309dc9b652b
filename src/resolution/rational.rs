//! Resolution values as TIFF RATIONALs.
//!
//! A RATIONAL is two unsigned 32-bit integers, numerator then denominator,
//! stored at an offset because 8 bytes never fit inline.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::InputError;
use crate::format::tiff::ByteOrder;

/// Exclusive upper bound for either component of a RATIONAL.
pub const MAX_COMPONENT: u64 = 1 << 32;

/// Factor the denominator grows by on each refinement step.
const SCALE_STEP: u64 = 10;

/// A positive fraction whose components both fit in 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rational {
    numerator: u32,
    denominator: u32,
}

impl Rational {
    /// Build a rational from components that must be in `1..2^32`.
    ///
    /// The fraction is kept as given; `Rational::new(600, 2)` stays `600/2`.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, InputError> {
        Ok(Self {
            numerator: component(numerator)?,
            denominator: component(denominator)?,
        })
    }

    #[inline]
    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    #[inline]
    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Value as a float, for display.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }

    /// Encode as the 8 bytes of a TIFF RATIONAL.
    pub fn to_bytes(&self, byte_order: ByteOrder) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&byte_order.u32_bytes(self.numerator));
        bytes[4..8].copy_from_slice(&byte_order.u32_bytes(self.denominator));
        bytes
    }

    /// Decode the 8 bytes of a TIFF RATIONAL.
    ///
    /// Returns `None` if the slice is short or either component is zero.
    pub fn from_bytes(bytes: &[u8], byte_order: ByteOrder) -> Option<Self> {
        if bytes.len() < 8 {
            return None;
        }
        let numerator = byte_order.read_u32(&bytes[0..4]);
        let denominator = byte_order.read_u32(&bytes[4..8]);
        (numerator != 0 && denominator != 0).then_some(Self {
            numerator,
            denominator,
        })
    }
}

fn component(value: u64) -> Result<u32, InputError> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(InputError::ComponentOutOfRange(value)),
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Rational {
    type Err = InputError;

    /// Parse `"300"`, `"72.5"` or `"300/1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (numerator, denominator) = approximate(s, MAX_COMPONENT)?;
        Self::new(numerator, denominator)
    }
}

/// Turn a density string into a `(numerator, denominator)` pair below `max`.
///
/// `"a/b"` is returned verbatim, without reduction. A decimal starts at
/// denominator 1 and scales the denominator by 10 until the fraction equals
/// the value exactly or another step would reach `max`. Exact results are
/// reduced by their GCD, so `"72.5"` gives `(145, 2)`.
///
/// Component range is not checked here; see [`Rational::new`].
pub fn approximate(input: &str, max: u64) -> Result<(u64, u64), InputError> {
    let input = input.trim();
    let invalid = || InputError::InvalidDensity(input.to_string());

    if let Some((numerator, denominator)) = input.split_once('/') {
        let numerator = numerator.trim().parse::<u64>().map_err(|_| invalid())?;
        let denominator = denominator.trim().parse::<u64>().map_err(|_| invalid())?;
        return Ok((numerator, denominator));
    }

    let value = input.parse::<f64>().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    if value >= max as f64 {
        return Err(InputError::DensityTooLarge { value, max });
    }

    let mut denominator: u64 = 1;
    let mut numerator = value.round() as u64;
    while numerator as f64 / denominator as f64 != value
        && denominator * SCALE_STEP < max
        && (denominator * SCALE_STEP) as f64 * value < max as f64
    {
        denominator *= SCALE_STEP;
        numerator = (denominator as f64 * value).round() as u64;
    }

    let divisor = gcd(numerator, denominator);
    if divisor > 1 {
        numerator /= divisor;
        denominator /= divisor;
    }
    Ok((numerator, denominator))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
