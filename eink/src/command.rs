//! Command vocabulary understood by the panel daemon.
//!
//! Every command travels as a short ASCII token followed by a newline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::refresh::RefreshMode;

/// Highest level accepted by the LED brightness commands.
pub const MAX_BRIGHTNESS: u32 = 2200;

/// A single command for the panel daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Full-panel clear (`r`).
    ForceClear,
    /// Push the pending bitmap to the panel (`cm`).
    CommitBitmap,
    /// Refresh speed preset (`c`, `b`, `s`, `p`).
    RefreshSpeed(RefreshMode),
    /// Static always-on-display composite value (`stl<N>`).
    StaticLockscreen(i32),
    /// Reader overlay on or off (`wov0`, `wov1`).
    ReaderMode(bool),
    /// Yellow (warm) LED level (`sb1<N>`).
    YellowBrightness(u32),
    /// White (cool) LED level (`sb2<N>`).
    WhiteBrightness(u32),
    /// White LED level on the alternate channel, bypassing the lock (`sa2<N>`).
    AltWhiteBrightness(u32),
    /// Let the system drive the white LED again (`un`).
    UnlockWhite,
    /// Lock the white LED channel against system updates (`bl`).
    LockWhite,
    BlackThreshold(u32),
    WhiteThreshold(u32),
    Contrast(u32),
}

impl Command {
    pub fn yellow(level: u32) -> Self {
        Self::YellowBrightness(level.min(MAX_BRIGHTNESS))
    }

    pub fn white(level: u32) -> Self {
        Self::WhiteBrightness(level.min(MAX_BRIGHTNESS))
    }

    pub fn alt_white(level: u32) -> Self {
        Self::AltWhiteBrightness(level.min(MAX_BRIGHTNESS))
    }

    /// Parse a wire token such as `sb1400` or `c`.
    pub fn parse(wire: &str) -> Result<Self, CommandParseError> {
        let wire = wire.trim();
        if wire.is_empty() {
            return Err(CommandParseError::Empty);
        }

        match wire {
            "r" => return Ok(Self::ForceClear),
            "cm" => return Ok(Self::CommitBitmap),
            "un" => return Ok(Self::UnlockWhite),
            "bl" => return Ok(Self::LockWhite),
            _ => {}
        }
        if let Some(mode) = RefreshMode::from_wire(wire) {
            return Ok(Self::RefreshSpeed(mode));
        }

        let (Some(prefix), Some(value)) = (wire.get(..3), wire.get(3..)) else {
            return Err(CommandParseError::Unknown(wire.to_string()));
        };
        match prefix {
            "stl" => Ok(Self::StaticLockscreen(parse_number(prefix, value)?)),
            "wov" => match value {
                "0" => Ok(Self::ReaderMode(false)),
                "1" => Ok(Self::ReaderMode(true)),
                _ => Err(CommandParseError::InvalidValue {
                    prefix: prefix.to_string(),
                    value: value.to_string(),
                }),
            },
            "sb1" => Ok(Self::YellowBrightness(parse_level(prefix, value)?)),
            "sb2" => Ok(Self::WhiteBrightness(parse_level(prefix, value)?)),
            "sa2" => Ok(Self::AltWhiteBrightness(parse_level(prefix, value)?)),
            "stb" => Ok(Self::BlackThreshold(parse_number(prefix, value)?)),
            "stw" => Ok(Self::WhiteThreshold(parse_number(prefix, value)?)),
            "sco" => Ok(Self::Contrast(parse_number(prefix, value)?)),
            _ => Err(CommandParseError::Unknown(wire.to_string())),
        }
    }
}

fn parse_number<T: FromStr>(prefix: &str, value: &str) -> Result<T, CommandParseError> {
    value.parse().map_err(|_| CommandParseError::InvalidValue {
        prefix: prefix.to_string(),
        value: value.to_string(),
    })
}

fn parse_level(prefix: &str, value: &str) -> Result<u32, CommandParseError> {
    let level: u32 = parse_number(prefix, value)?;
    if level > MAX_BRIGHTNESS {
        return Err(CommandParseError::OutOfRange {
            prefix: prefix.to_string(),
            value: level,
        });
    }
    Ok(level)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForceClear => write!(f, "r"),
            Self::CommitBitmap => write!(f, "cm"),
            Self::RefreshSpeed(mode) => write!(f, "{}", mode.wire()),
            Self::StaticLockscreen(value) => write!(f, "stl{}", value),
            Self::ReaderMode(on) => write!(f, "wov{}", u8::from(*on)),
            Self::YellowBrightness(level) => write!(f, "sb1{}", level.min(&MAX_BRIGHTNESS)),
            Self::WhiteBrightness(level) => write!(f, "sb2{}", level.min(&MAX_BRIGHTNESS)),
            Self::AltWhiteBrightness(level) => write!(f, "sa2{}", level.min(&MAX_BRIGHTNESS)),
            Self::UnlockWhite => write!(f, "un"),
            Self::LockWhite => write!(f, "bl"),
            Self::BlackThreshold(value) => write!(f, "stb{}", value),
            Self::WhiteThreshold(value) => write!(f, "stw{}", value),
            Self::Contrast(value) => write!(f, "sco{}", value),
        }
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Invalid value for {prefix}: {value:?}")]
    InvalidValue { prefix: String, value: String },
    #[error("Value for {prefix} out of range: {value} (max {MAX_BRIGHTNESS})")]
    OutOfRange { prefix: String, value: u32 },
}
