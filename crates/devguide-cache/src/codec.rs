//! Encoding and decoding of document bytes

use devguide_types::{CacheFormat, Document, DocumentName, GuidelineError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::warn;

/// One encoding of a document, tagged with the digest of the text it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Format actually served (plain when compression fell back)
    pub format: CacheFormat,
    pub bytes: Arc<[u8]>,
    pub digest: String,
}

impl Encoded {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    name: DocumentName,
    title: &'a str,
    version: &'a str,
    char_count: usize,
    content: &'a str,
}

#[derive(Deserialize)]
struct Envelope {
    content: String,
}

/// Encode a document. Compression failures fall back to the plain form.
pub fn encode(document: &Document, format: CacheFormat, version: &str) -> Encoded {
    encode_with(document, format, version, gzip)
}

fn encode_with(
    document: &Document,
    format: CacheFormat,
    version: &str,
    compress: impl Fn(&[u8]) -> std::io::Result<Vec<u8>>,
) -> Encoded {
    let compressed = match format {
        CacheFormat::Plain => None,
        CacheFormat::CompressedText => Some(compress(document.content.as_bytes())),
        CacheFormat::CompressedSerialized => Some(
            serde_json::to_vec(&EnvelopeRef {
                name: document.name,
                title: &document.title,
                version,
                char_count: document.char_count,
                content: &document.content,
            })
            .map_err(std::io::Error::other)
            .and_then(|json| compress(&json)),
        ),
    };

    let (format, bytes): (CacheFormat, Arc<[u8]>) = match compressed {
        None => (CacheFormat::Plain, Arc::from(document.content.as_bytes())),
        Some(Ok(bytes)) => (format, Arc::from(bytes)),
        Some(Err(e)) => {
            warn!(
                "Compressing {} as {} failed, serving plain text: {}",
                document.name, format, e
            );
            (CacheFormat::Plain, Arc::from(document.content.as_bytes()))
        }
    };

    Encoded {
        format,
        bytes,
        digest: document.digest.clone(),
    }
}

/// Recover the document text from any encoding
pub fn decode(encoded: &Encoded) -> Result<String> {
    match encoded.format {
        CacheFormat::Plain => String::from_utf8(encoded.bytes.to_vec())
            .map_err(|e| GuidelineError::Corrupt(e.to_string())),
        CacheFormat::CompressedText => {
            let bytes = gunzip(&encoded.bytes)?;
            String::from_utf8(bytes).map_err(|e| GuidelineError::Corrupt(e.to_string()))
        }
        CacheFormat::CompressedSerialized => {
            let bytes = gunzip(&encoded.bytes)?;
            let envelope: Envelope = serde_json::from_slice(&bytes)?;
            Ok(envelope.content)
        }
    }
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| GuidelineError::Corrupt(e.to_string()))?;
    Ok(out)
}
