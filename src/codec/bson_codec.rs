//! BSON codec backed by the `bson` crate

use super::{CodecError, DecodedDocument, DocumentCodec};
use bson::{Bson, Document};

/// Decodes BSON documents, keeping field order
#[derive(Debug, Default, Clone, Copy)]
pub struct BsonCodec;

impl BsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for BsonCodec {
    fn name(&self) -> &str {
        "bson"
    }

    fn decode(&self, bytes: &[u8]) -> Result<DecodedDocument, CodecError> {
        let mut reader = bytes;
        let document = Document::from_reader(&mut reader)
            .map_err(|e| CodecError::Malformed(e.to_string()))?;

        let fields = document
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();
        let text = Bson::Document(document).into_relaxed_extjson().to_string();

        Ok(DecodedDocument { fields, text })
    }
}
