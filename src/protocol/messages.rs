// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Line commands accepted over the serial link.
//!
//! | Line | Effect |
//! | ---- | ------ |
//! | `R:<deg>` | Set the position reference |
//! | `G:<kp>,<ki>,<kd>` | Set the PID gains, in that order |
//! | `S` | Stop the motor |
//! | `Z` | Re-zero the encoder and the reference |

use crate::control::Gains;

pub const PREFIX_REFERENCE: &str = "R:";
pub const PREFIX_GAINS: &str = "G:";
pub const CMD_STOP: &str = "S";
pub const CMD_ZERO: &str = "Z";

/// Gain fields are separated by this character.
pub const GAIN_SEPARATOR: char = ',';

/// Decoded command.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    SetReference(f32),
    SetGains(Gains),
    Stop,
    Zero,
}

/// Why a line was not accepted as a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Blank line.
    Empty,
    /// No known command prefix.
    Unknown,
    /// A numeric field did not parse as a finite float.
    InvalidNumber,
    /// `G:` without all three comma-separated fields.
    MissingSeparator,
    /// A `G:` field did not parse as a finite float.
    InvalidGain,
    /// Line longer than the receive buffer.
    Overflow,
    /// Line bytes are not UTF-8.
    InvalidUtf8,
}

impl Command {
    /// Parse one line (terminator already removed). Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();

        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        if let Some(rest) = line.strip_prefix(PREFIX_REFERENCE) {
            return parse_number(rest).map(Command::SetReference);
        }

        if let Some(rest) = line.strip_prefix(PREFIX_GAINS) {
            let mut fields = rest.splitn(3, GAIN_SEPARATOR);
            let kp = fields.next().ok_or(ParseError::MissingSeparator)?;
            let ki = fields.next().ok_or(ParseError::MissingSeparator)?;
            let kd = fields.next().ok_or(ParseError::MissingSeparator)?;
            if kp.trim().is_empty() {
                return Err(ParseError::MissingSeparator);
            }
            let gain = |field: &str| parse_number(field).map_err(|_| ParseError::InvalidGain);
            let gains = Gains::new(gain(kp)?, gain(ki)?, gain(kd)?);
            return Ok(Command::SetGains(gains));
        }

        match line {
            CMD_STOP => Ok(Command::Stop),
            CMD_ZERO => Ok(Command::Zero),
            _ => Err(ParseError::Unknown),
        }
    }
}

fn parse_number(field: &str) -> Result<f32, ParseError> {
    match field.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference() {
        assert_eq!(Command::parse("R:200"), Ok(Command::SetReference(200.0)));
        assert_eq!(Command::parse("R:-12.5\r"), Ok(Command::SetReference(-12.5)));
        assert_eq!(Command::parse("R:"), Err(ParseError::InvalidNumber));
        assert_eq!(Command::parse("R:abc"), Err(ParseError::InvalidNumber));
        assert_eq!(Command::parse("R:inf"), Err(ParseError::InvalidNumber));
    }

    #[test]
    fn gains_positional() {
        assert_eq!(
            Command::parse("G:10.5,5.2,2.1"),
            Ok(Command::SetGains(Gains::new(10.5, 5.2, 2.1)))
        );
        assert_eq!(
            Command::parse("G: 1, 0 ,0.5 "),
            Ok(Command::SetGains(Gains::new(1.0, 0.0, 0.5)))
        );
    }

    #[test]
    fn malformed_gains_rejected() {
        assert_eq!(Command::parse("G:1,2"), Err(ParseError::MissingSeparator));
        assert_eq!(Command::parse("G:1"), Err(ParseError::MissingSeparator));
        assert_eq!(Command::parse("G:,2,3"), Err(ParseError::MissingSeparator));
        assert_eq!(Command::parse("G:1,x,3"), Err(ParseError::InvalidGain));
        // a fourth field lands in kd and makes it unparsable
        assert_eq!(Command::parse("G:1,2,3,4"), Err(ParseError::InvalidGain));
    }

    #[test]
    fn single_letter_commands() {
        assert_eq!(Command::parse("S"), Ok(Command::Stop));
        assert_eq!(Command::parse(" Z \r"), Ok(Command::Zero));
        assert_eq!(Command::parse("s"), Err(ParseError::Unknown));
        assert_eq!(Command::parse("STOP"), Err(ParseError::Unknown));
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
    }
}
