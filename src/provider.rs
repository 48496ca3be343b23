use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::chunk::ChunkDescriptor;

/// Limits a provider advertises. Used only for preflight validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderLimits {
    /// Longest audio the provider accepts in a single request, if it has a limit.
    pub max_audio_seconds: Option<u64>,
}

/// One `generate` call: the whole input (`chunk == None`) or one planned chunk of it.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub image: &'a Path,
    pub audio: &'a Path,
    pub chunk: Option<ChunkDescriptor>,
    /// Provider-specific parameters, forwarded verbatim.
    pub params: &'a Map<String, Value>,
}

/// A transcript fragment plus whatever else the provider chose to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub transcript: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            extra: Map::new(),
        }
    }
}

/// Why a single provider call failed.
///
/// This crosses the chunk boundary as data: the execution engine records it per chunk and
/// callers match on the variant rather than inspecting strings.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{what} not found: {}", .path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("provider response missing 'transcript'")]
    MissingTranscript,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider rejected the request: {message}")]
    Rejected { message: String },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pluggable transcription provider.
///
/// Implementations must treat `generate` as a plain request/response call: every call either
/// returns a [`Payload`] or a [`ProviderError`]. The pipeline never special-cases a concrete
/// provider.
pub trait Provider {
    /// Static limits for this provider.
    fn limits(&self) -> ProviderLimits;

    /// Transcribe the whole input or one chunk of it.
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Payload, ProviderError>;
}

impl<P: Provider + ?Sized> Provider for &P {
    fn limits(&self) -> ProviderLimits {
        (**self).limits()
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Payload, ProviderError> {
        (**self).generate(request)
    }
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn limits(&self) -> ProviderLimits {
        (**self).limits()
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Payload, ProviderError> {
        (**self).generate(request)
    }
}

pub(crate) fn require_file(what: &'static str, path: &Path) -> Result<(), ProviderError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ProviderError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_keeps_extra_fields() -> anyhow::Result<()> {
        let payload: Payload =
            serde_json::from_value(json!({ "transcript": "hello world", "confidence": 0.9 }))?;
        assert_eq!(payload.transcript, "hello world");
        assert_eq!(payload.extra["confidence"], 0.9);

        let back = serde_json::to_value(&payload)?;
        assert_eq!(back["confidence"], 0.9);
        Ok(())
    }

    #[test]
    fn missing_input_names_the_path() {
        let err = require_file("audio", Path::new("definitely/not/here.wav")).unwrap_err();
        assert_eq!(err.to_string(), "audio not found: definitely/not/here.wav");
    }
}
