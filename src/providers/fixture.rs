use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::provider::{
    GenerateRequest, Payload, Provider, ProviderError, ProviderLimits, require_file,
};

/// Deterministic provider backed by a local JSON payload file.
///
/// Payload shape:
///
/// ```json
/// {
///   "transcript": "used for unchunked runs and chunks without an entry",
///   "max_audio_seconds": 120,
///   "chunks": [
///     { "index": 0, "transcript": "first" },
///     { "index": 1, "error": "simulated provider rejection" }
///   ],
///   "confidence": 0.9
/// }
/// ```
///
/// Unknown top-level fields are returned to the caller as payload extras.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    payload_file: PathBuf,
    transcript: Option<String>,
    limits: ProviderLimits,
    chunks: BTreeMap<usize, ChunkResponse>,
    extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
enum ChunkResponse {
    Transcript(String),
    Error(String),
}

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    transcript: Option<String>,
    max_audio_seconds: Option<u64>,
    #[serde(default)]
    chunks: Vec<FixtureChunk>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureChunk {
    index: usize,
    transcript: Option<String>,
    error: Option<String>,
}

impl FixtureProvider {
    /// Read and validate a payload file.
    ///
    /// The per-chunk schema is checked here so a bad fixture fails before any chunk runs.
    pub fn load(payload_file: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let payload_file = payload_file.as_ref();
        require_file("provider payload file", payload_file)?;

        let text = std::fs::read_to_string(payload_file)?;
        let doc: FixtureDocument = serde_json::from_str(&text)?;

        if doc.max_audio_seconds == Some(0) {
            return Err(ProviderError::MalformedResponse(
                "max_audio_seconds must be a positive integer".to_owned(),
            ));
        }

        let mut chunks = BTreeMap::new();
        for entry in doc.chunks {
            let response = match (entry.transcript, entry.error) {
                (Some(transcript), None) => ChunkResponse::Transcript(transcript),
                (None, Some(error)) => ChunkResponse::Error(error),
                _ => {
                    return Err(ProviderError::MalformedResponse(format!(
                        "chunk entry {} must have exactly one of 'transcript' or 'error'",
                        entry.index
                    )));
                }
            };
            if chunks.insert(entry.index, response).is_some() {
                return Err(ProviderError::MalformedResponse(format!(
                    "chunk index {} appears more than once",
                    entry.index
                )));
            }
        }

        Ok(Self {
            payload_file: payload_file.to_path_buf(),
            transcript: doc.transcript,
            limits: ProviderLimits {
                max_audio_seconds: doc.max_audio_seconds,
            },
            chunks,
            extra: doc.extra,
        })
    }

    /// Replace the limit read from the payload file, when `max_audio_seconds` is set.
    pub fn with_limit_override(mut self, max_audio_seconds: Option<u64>) -> Self {
        if max_audio_seconds.is_some() {
            self.limits.max_audio_seconds = max_audio_seconds;
        }
        self
    }

    /// Path of the backing payload file.
    pub fn payload_file(&self) -> &Path {
        &self.payload_file
    }
}

impl Provider for FixtureProvider {
    fn limits(&self) -> ProviderLimits {
        self.limits
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Payload, ProviderError> {
        require_file("audio", request.audio)?;

        let mut extra = self.extra.clone();
        let chunk_response = request
            .chunk
            .and_then(|chunk| self.chunks.get(&chunk.index).map(|r| (chunk, r)));

        let transcript = match chunk_response {
            Some((chunk, ChunkResponse::Error(message))) => {
                debug!(chunk_index = chunk.index, "fixture chunk configured to fail");
                return Err(ProviderError::Rejected {
                    message: message.clone(),
                });
            }
            Some((chunk, ChunkResponse::Transcript(text))) => {
                extra.insert("chunk_index".to_owned(), Value::from(chunk.index));
                text.clone()
            }
            None => self
                .transcript
                .clone()
                .ok_or(ProviderError::MissingTranscript)?,
        };

        Ok(Payload { transcript, extra })
    }
}
