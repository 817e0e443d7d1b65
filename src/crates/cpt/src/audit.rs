//! Audit trail message transit encoding
//!
//! The engine stores long audit messages with a one character scheme tag:
//! `U` followed by base64 of a serialized string, or `C` followed by base64
//! of the zlib-compressed serialized string. Anything else is plain text.
//! The serialized form carries a fixed 7 byte header before the UTF-8 text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Length of the serialization header preceding the message text
pub const HEADER_LEN: usize = 7;

/// Stream magic, version and string type code of a serialized string
const HEADER_PREFIX: [u8; 5] = [0xAC, 0xED, 0x00, 0x05, 0x74];

/// Errors raised while reversing the transit encoding
#[derive(Debug, Error)]
pub enum AuditDecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid compressed payload: {0}")]
    Inflate(#[from] std::io::Error),

    #[error("payload of {0} bytes is shorter than the 7 byte header")]
    TruncatedHeader(usize),
}

/// Transit scheme of a stored message, selected by its first character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitScheme {
    Plain,
    /// `U`: base64 only
    Uncompressed,
    /// `C`: base64 over zlib
    Compressed,
}

impl TransitScheme {
    /// Scheme a stored message was written with
    pub fn of(message: &str) -> Self {
        match message.as_bytes().first() {
            Some(b'U') => Self::Uncompressed,
            Some(b'C') => Self::Compressed,
            _ => Self::Plain,
        }
    }

    pub fn tag(&self) -> Option<char> {
        match self {
            Self::Plain => None,
            Self::Uncompressed => Some('U'),
            Self::Compressed => Some('C'),
        }
    }
}

/// Decode a stored audit message into its text
pub fn decode_message(message: &str) -> Result<String, AuditDecodeError> {
    let scheme = TransitScheme::of(message);
    if scheme == TransitScheme::Plain {
        return Ok(message.to_string());
    }

    let payload: String = message[1..]
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();
    let mut bytes = STANDARD.decode(payload)?;

    if scheme == TransitScheme::Compressed {
        let mut inflated = Vec::new();
        ZlibDecoder::new(bytes.as_slice()).read_to_end(&mut inflated)?;
        bytes = inflated;
    }

    let text = bytes
        .get(HEADER_LEN..)
        .ok_or(AuditDecodeError::TruncatedHeader(bytes.len()))?;
    Ok(String::from_utf8_lossy(text).into_owned())
}

/// Encode `text` with `scheme`, writing the serialization header first
pub fn encode_message(text: &str, scheme: TransitScheme) -> Result<String, AuditDecodeError> {
    let tag = match scheme.tag() {
        Some(tag) => tag,
        None => return Ok(text.to_string()),
    };

    let length = u16::try_from(text.len()).unwrap_or(u16::MAX);
    let mut serialized = Vec::with_capacity(HEADER_LEN + text.len());
    serialized.extend_from_slice(&HEADER_PREFIX);
    serialized.extend_from_slice(&length.to_be_bytes());
    serialized.extend_from_slice(text.as_bytes());

    if scheme == TransitScheme::Compressed {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&serialized)?;
        serialized = encoder.finish()?;
    }

    Ok(format!("{}{}", tag, STANDARD.encode(serialized)))
}
