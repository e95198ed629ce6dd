//! Error types for the wire codec
//!
//! Decoding and encoding failures are kept apart: a `DecodeError` means the
//! datagram we received cannot be understood and is dropped, an `EncodeError`
//! means the response we are building cannot be serialized and nothing is sent.

use std::fmt;

use derive_more::{Display, Error, From};

/// Failure while reading a message from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Ran past the end of the received bytes
    EndOfBuffer,
    InvalidOpCode(u8),
    InvalidResponseCode(u8),
    UnrecognizedType(u16),
    UnrecognizedClass(u16),
    /// A message-compression pointer was found at the given offset
    CompressionPointer(usize),
    /// Label type bits `01` or `10`
    ReservedLabelType(u8),
    /// Encoded length of a decoded name
    NameTooLong(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::EndOfBuffer => write!(f, "unexpected end of buffer"),
            DecodeError::InvalidOpCode(x) => write!(f, "invalid opcode {}", x),
            DecodeError::InvalidResponseCode(x) => write!(f, "invalid response code {}", x),
            DecodeError::UnrecognizedType(x) => write!(f, "unrecognized type code: {}", x),
            DecodeError::UnrecognizedClass(x) => {
                write!(f, "unsupported/unrecognized class code: {}", x)
            }
            DecodeError::CompressionPointer(pos) => {
                write!(f, "compression pointer at offset {} is not supported", pos)
            }
            DecodeError::ReservedLabelType(x) => write!(f, "reserved label type 0x{:02x}", x),
            DecodeError::NameTooLong(len) => {
                write!(f, "domain name of {} octets exceeds 255", len)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Failure while writing a message to the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    BufferTooSmall { needed: usize, remaining: usize },
    /// Encoded length of the offending name
    NameTooLong(usize),
    LabelTooLong(usize),
    EmptyLabel,
    /// A `\` escape at the given offset of the name text is malformed
    InvalidEscape(usize),
    ValueTooLong(usize),
    /// A character-string longer than 255 octets
    StringTooLong(usize),
    /// More entries in one section than a 16-bit count can describe
    TooManyRecords(usize),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::BufferTooSmall { needed, remaining } => write!(
                f,
                "buffer too small: {} octets needed, {} remaining",
                needed, remaining
            ),
            EncodeError::NameTooLong(len) => {
                write!(f, "domain name cannot be longer than 255 octets (got {})", len)
            }
            EncodeError::LabelTooLong(len) => {
                write!(f, "label cannot be longer than 63 octets (got {})", len)
            }
            EncodeError::EmptyLabel => write!(f, "domain name contains an empty label"),
            EncodeError::InvalidEscape(pos) => {
                write!(f, "malformed escape at offset {} of domain name", pos)
            }
            EncodeError::ValueTooLong(len) => {
                write!(f, "record value of {} octets exceeds 65535", len)
            }
            EncodeError::StringTooLong(len) => {
                write!(f, "character string of {} octets exceeds 255", len)
            }
            EncodeError::TooManyRecords(count) => {
                write!(f, "{} entries do not fit in a section count", count)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Either side of the codec, for code paths that both read and write
#[derive(Debug, Display, From, Error)]
pub enum ProtocolError {
    Decode(DecodeError),
    Encode(EncodeError),
}
