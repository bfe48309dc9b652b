use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::InputError;

/// Value of the ResolutionUnit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum ResolutionUnit {
    /// No absolute unit; X and Y only give the aspect ratio
    None = 1,

    /// Pixels per inch
    #[default]
    Inch = 2,

    /// Pixels per centimeter
    Centimeter = 3,
}

impl ResolutionUnit {
    /// Numeric value stored in the tag.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(ResolutionUnit::None),
            2 => Some(ResolutionUnit::Inch),
            3 => Some(ResolutionUnit::Centimeter),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ResolutionUnit::None => "none",
            ResolutionUnit::Inch => "inches",
            ResolutionUnit::Centimeter => "centimeters",
        }
    }

    /// Suffix for status lines, e.g. "300 DPI".
    pub const fn density_suffix(self) -> &'static str {
        match self {
            ResolutionUnit::None => "",
            ResolutionUnit::Inch => " DPI",
            ResolutionUnit::Centimeter => " pixels/cm",
        }
    }
}

impl fmt::Display for ResolutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResolutionUnit {
    type Err = InputError;

    /// Loose matching: anything mentioning "inch" or "dpi" is inches,
    /// anything mentioning "cm" or "centim" is centimeters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.contains("inch") || lower.contains("dpi") {
            Ok(ResolutionUnit::Inch)
        } else if lower.contains("cm") || lower.contains("centim") {
            Ok(ResolutionUnit::Centimeter)
        } else if lower == "none" {
            Ok(ResolutionUnit::None)
        } else {
            Err(InputError::UnrecognizedUnit(s.to_string()))
        }
    }
}
