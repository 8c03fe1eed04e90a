//! Codec - Binary document decoding
//!
//! The document printer only needs "bytes in, ordered fields out". The
//! `codec` feature provides a BSON implementation; without it documents
//! are summarized by size only.

#[cfg(feature = "codec")]
pub mod bson_codec;

#[cfg(feature = "codec")]
pub use bson_codec::BsonCodec;

use thiserror::Error;

/// Decode errors (always reported inline, never propagated to the caller
/// of a render)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{0}")]
    Malformed(String),
}

/// A decoded document, fields in stored order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    /// (field name, formatted value)
    pub fields: Vec<(String, String)>,
    /// The whole document as one line of text
    pub text: String,
}

/// Turns raw document bytes into displayable fields
pub trait DocumentCodec {
    fn name(&self) -> &str;

    fn decode(&self, bytes: &[u8]) -> Result<DecodedDocument, CodecError>;
}

/// The codec compiled into this build, if any
#[cfg(feature = "codec")]
pub fn default_codec() -> Option<Box<dyn DocumentCodec>> {
    Some(Box::new(BsonCodec::new()))
}

#[cfg(not(feature = "codec"))]
pub fn default_codec() -> Option<Box<dyn DocumentCodec>> {
    log::info!("Built without the codec feature; documents will not be decoded");
    None
}
