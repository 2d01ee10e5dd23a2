// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between raw register words and numeric values
//!
//! A register holds a 16-bit integer that is interpreted either as
//! unsigned or as two's complement signed number. The number of decimals
//! moves the decimal point, i.e. the integer is divided by `10^decimals`.

use crate::{error::RangeError, frame::Word};

/// Interpretation of a single register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterFormat {
    pub signed: bool,
    pub decimals: u8,
}

impl RegisterFormat {
    /// Plain unsigned integer.
    pub const UNSIGNED: Self = Self::unsigned(0);

    /// Plain two's complement integer.
    pub const SIGNED: Self = Self::signed(0);

    #[must_use]
    pub const fn unsigned(decimals: u8) -> Self {
        Self {
            signed: false,
            decimals,
        }
    }

    #[must_use]
    pub const fn signed(decimals: u8) -> Self {
        Self {
            signed: true,
            decimals,
        }
    }

    const fn integer_range(self) -> (i32, i32) {
        if self.signed {
            (i16::MIN as i32, i16::MAX as i32)
        } else {
            (0, u16::MAX as i32)
        }
    }

    fn scale(self) -> f64 {
        10f64.powi(i32::from(self.decimals))
    }
}

/// Converts a raw register word into a value.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn decode(word: Word, format: RegisterFormat) -> f64 {
    let integer = if format.signed {
        f64::from(word as i16)
    } else {
        f64::from(word)
    };
    integer / format.scale()
}

/// Converts a value into a raw register word.
///
/// The scaled value is rounded to the nearest integer before it is
/// checked against the register range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode(value: f64, format: RegisterFormat) -> Result<Word, RangeError> {
    let scaled = (value * format.scale()).round();
    let (min, max) = format.integer_range();
    if !scaled.is_finite() || scaled < f64::from(min) || scaled > f64::from(max) {
        return Err(RangeError::Register {
            value: scaled,
            min,
            max,
        });
    }
    // Lossless: the range has been checked above.
    let integer = scaled as i32;
    Ok(if format.signed {
        integer as i16 as Word
    } else {
        integer as Word
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_unsigned() {
        assert_eq!(decode(0, RegisterFormat::UNSIGNED), 0.0);
        assert_eq!(decode(84, RegisterFormat::UNSIGNED), 84.0);
        assert_eq!(decode(0xFFFF, RegisterFormat::UNSIGNED), 65535.0);
    }

    #[test]
    fn decode_signed() {
        assert_eq!(decode(84, RegisterFormat::SIGNED), 84.0);
        assert_eq!(decode(0xFFF6, RegisterFormat::SIGNED), -10.0);
        assert_eq!(decode(0x8000, RegisterFormat::SIGNED), -32768.0);
        assert_eq!(decode(0x7FFF, RegisterFormat::SIGNED), 32767.0);
    }

    #[test]
    fn decode_decimals() {
        assert_eq!(decode(770, RegisterFormat::unsigned(1)), 77.0);
        assert_eq!(decode(775, RegisterFormat::unsigned(1)), 77.5);
        assert_eq!(decode(0xFFF6, RegisterFormat::signed(1)), -1.0);
        assert_eq!(decode(12345, RegisterFormat::unsigned(2)), 123.45);
    }

    #[test]
    fn encode_values() {
        assert_eq!(encode(84.0, RegisterFormat::UNSIGNED), Ok(84));
        assert_eq!(encode(-10.0, RegisterFormat::SIGNED), Ok(0xFFF6));
        assert_eq!(encode(77.5, RegisterFormat::unsigned(1)), Ok(775));
        assert_eq!(encode(0.29, RegisterFormat::unsigned(2)), Ok(29));
        assert_eq!(encode(-1.0, RegisterFormat::signed(1)), Ok(0xFFF6));
    }

    #[test]
    fn encode_out_of_range() {
        assert!(encode(-1.0, RegisterFormat::UNSIGNED).is_err());
        assert!(encode(65536.0, RegisterFormat::UNSIGNED).is_err());
        assert!(encode(32768.0, RegisterFormat::SIGNED).is_err());
        assert!(encode(-32769.0, RegisterFormat::SIGNED).is_err());
        assert!(encode(6553.6, RegisterFormat::unsigned(1)).is_err());
        assert!(encode(f64::NAN, RegisterFormat::UNSIGNED).is_err());
        assert!(encode(f64::INFINITY, RegisterFormat::SIGNED).is_err());
        assert_eq!(
            encode(70000.0, RegisterFormat::UNSIGNED),
            Err(RangeError::Register {
                value: 70000.0,
                min: 0,
                max: 65535
            })
        );
    }

    #[test]
    fn unsigned_words_survive_a_round_trip() {
        for word in 0..=u16::MAX {
            let value = decode(word, RegisterFormat::UNSIGNED);
            assert_eq!(encode(value, RegisterFormat::UNSIGNED), Ok(word));
        }
    }

    #[test]
    fn signed_words_survive_a_round_trip() {
        for integer in i16::MIN..=i16::MAX {
            let word = integer as Word;
            let value = decode(word, RegisterFormat::SIGNED);
            assert_eq!(value, f64::from(integer));
            assert_eq!(encode(value, RegisterFormat::SIGNED), Ok(word));
        }
    }

    #[test]
    fn scaled_words_survive_a_round_trip() {
        for word in (0..=u16::MAX).step_by(7) {
            let format = RegisterFormat::unsigned(2);
            assert_eq!(encode(decode(word, format), format), Ok(word));
        }
    }
}
