//! Hardware wire protocol
//! Taggers send short ASCII datagrams; the server echoes decimal codes back.

use std::fmt;
use std::str::FromStr;

/// Largest accepted datagram payload
pub const MAX_PAYLOAD_BYTES: usize = 1024;

/// Target code for the red team's base
pub const RED_BASE: u32 = 53;
/// Target code for the green team's base
pub const GREEN_BASE: u32 = 43;
/// Broadcast when a match starts
pub const MATCH_START: u32 = 202;
/// Broadcast (three times) when a match ends
pub const MATCH_END: u32 = 221;

/// Codes that can never be bound to a tagger
pub const RESERVED_CODES: [u32; 4] = [RED_BASE, GREEN_BASE, MATCH_START, MATCH_END];

pub fn is_reserved(code: u32) -> bool {
    RESERVED_CODES.contains(&code)
}

/// A parsed inbound datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMessage {
    /// `"<transmitter>:<target>"`: a tagger hit a player or a base
    Hit { transmitter: u32, target: u32 },
    /// `"<code>"`: a bare code with no attacker context
    Code(u32),
}

impl HitMessage {
    /// Parse a raw datagram payload
    pub fn from_bytes(payload: &[u8]) -> Result<Self, ParseError> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(ParseError::TooLong(payload.len()));
        }
        let text = std::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8)?;
        text.parse()
    }
}

impl FromStr for HitMessage {
    type Err = ParseError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        match trimmed.split_once(':') {
            Some((transmitter, target)) => {
                if target.contains(':') {
                    return Err(ParseError::MalformedPair(trimmed.to_string()));
                }
                Ok(HitMessage::Hit {
                    transmitter: parse_code(transmitter)?,
                    target: parse_code(target)?,
                })
            }
            None => Ok(HitMessage::Code(parse_code(trimmed)?)),
        }
    }
}

impl fmt::Display for HitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitMessage::Hit {
                transmitter,
                target,
            } => write!(f, "{}:{}", transmitter, target),
            HitMessage::Code(code) => write!(f, "{}", code),
        }
    }
}

/// Digits only: `u32::from_str` would also accept a leading `+`
fn parse_code(part: &str) -> Result<u32, ParseError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidNumber(part.to_string()));
    }
    part.parse()
        .map_err(|_| ParseError::InvalidNumber(part.to_string()))
}

/// Encode an outbound echo code
pub fn encode_code(code: u32) -> Vec<u8> {
    code.to_string().into_bytes()
}

/// Reasons a datagram was discarded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty payload")]
    Empty,

    #[error("payload of {0} bytes exceeds limit")]
    TooLong(usize),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("expected exactly one ':' separator in {0:?}")]
    MalformedPair(String),

    #[error("not a non-negative integer: {0:?}")]
    InvalidNumber(String),
}
