//! Self-describing payloads
//!
//! Every persisted payload is a [`DataBlob`]: opaque bytes plus the name of
//! the encoding they were written with. The encoding name lives in a sibling
//! column so payload formats can evolve without schema changes.
//!
//! ## Encodings
//!
//! | Name | Codec |
//! |------|-------|
//! | `Json` | serde_json |
//! | `MsgPack` | rmp-serde |
//! | `Proto3` | opaque to this layer |
//! | `Unspecified` | empty or unknown payload |

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload encoding, stored by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingType {
    /// Encoding not recorded
    #[default]
    Unspecified,
    /// JSON via serde_json
    Json,
    /// MessagePack via rmp-serde
    MsgPack,
    /// Protocol buffers, opaque here
    Proto3,
    /// Any other name found on disk
    Other(String),
}

impl EncodingType {
    /// Stable name written to encoding columns
    pub fn as_str(&self) -> &str {
        match self {
            EncodingType::Unspecified => "Unspecified",
            EncodingType::Json => "Json",
            EncodingType::MsgPack => "MsgPack",
            EncodingType::Proto3 => "Proto3",
            EncodingType::Other(name) => name,
        }
    }

    /// Parse a stored encoding name; unknown names are kept verbatim
    pub fn from_name(name: &str) -> Self {
        match name {
            "Unspecified" | "" => EncodingType::Unspecified,
            "Json" => EncodingType::Json,
            "MsgPack" => EncodingType::MsgPack,
            "Proto3" => EncodingType::Proto3,
            other => EncodingType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes plus the encoding they were written with
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataBlob {
    /// Encoded payload
    pub data: Vec<u8>,
    /// Encoding of `data`
    pub encoding: EncodingType,
}

impl DataBlob {
    /// Create a blob
    pub fn new(data: impl Into<Vec<u8>>, encoding: EncodingType) -> Self {
        Self {
            data: data.into(),
            encoding,
        }
    }

    /// Create a blob from bytes and a stored encoding name
    pub fn from_stored(data: impl Into<Vec<u8>>, encoding_name: &str) -> Self {
        Self::new(data, EncodingType::from_name(encoding_name))
    }

    /// Encode a value with the given encoding
    ///
    /// # Errors
    ///
    /// `Serialization` if the encoding has no codec here or encoding fails.
    pub fn encode<T: Serialize>(value: &T, encoding: EncodingType) -> Result<Self> {
        let data = match &encoding {
            EncodingType::Json => {
                serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?
            }
            EncodingType::MsgPack => {
                rmp_serde::to_vec_named(value).map_err(|e| Error::Serialization(e.to_string()))?
            }
            other => {
                return Err(Error::Serialization(format!(
                    "no codec for encoding {}",
                    other
                )))
            }
        };
        Ok(Self::new(data, encoding))
    }

    /// Decode the payload into a value
    ///
    /// # Errors
    ///
    /// `Serialization` if the encoding has no codec here or the bytes do not
    /// decode.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.encoding {
            EncodingType::Json => {
                serde_json::from_slice(&self.data).map_err(|e| Error::Serialization(e.to_string()))
            }
            EncodingType::MsgPack => {
                rmp_serde::from_slice(&self.data).map_err(|e| Error::Serialization(e.to_string()))
            }
            other => Err(Error::Serialization(format!(
                "no codec for encoding {}",
                other
            ))),
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
