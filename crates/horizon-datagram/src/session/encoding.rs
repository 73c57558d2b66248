//! Text encodings for string payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Replacement for characters a narrow encoding cannot represent.
const UNMAPPABLE: u8 = b'?';

/// The text encoding used to turn messages into datagram payloads.
///
/// This is a plain value, so a session's copy can never change underneath
/// it after assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextEncoding {
    /// UTF-8.
    #[default]
    Utf8,
    /// UTF-16, little-endian, without a byte order mark.
    Utf16Le,
    /// UTF-16, big-endian, without a byte order mark.
    Utf16Be,
    /// ISO-8859-1.
    Latin1,
    /// 7-bit US-ASCII.
    Ascii,
}

impl TextEncoding {
    /// The canonical label of this encoding.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Latin1 => "iso-8859-1",
            Self::Ascii => "us-ascii",
        }
    }

    /// Encode a message into bytes.
    ///
    /// Characters outside the range of `Latin1` or `Ascii` are written as `?`.
    pub fn encode(&self, message: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => message.as_bytes().to_vec(),
            Self::Utf16Le => message.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16Be => message.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Latin1 => message
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(UNMAPPABLE))
                .collect(),
            Self::Ascii => message
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { UNMAPPABLE })
                .collect(),
        }
    }

    /// Decode bytes into a string. Malformed input is replaced, never rejected.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
                .collect(),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = bytes.chunks_exact(2);
    let dangling = !chunks.remainder().is_empty();
    let mut text: String = char::decode_utf16(chunks.map(|pair| unit([pair[0], pair[1]])))
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if dangling {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16le" | "utf-16" | "utf16le" | "unicode" => Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Self::Utf16Be),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            other => Err(SessionError::InvalidArgument(format!(
                "unknown text encoding '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TextEncoding> for String {
    fn from(encoding: TextEncoding) -> Self {
        encoding.label().to_string()
    }
}
