use serde_json::{Map, Value};
use tracing::debug;

use crate::provider::{
    GenerateRequest, Payload, Provider, ProviderError, ProviderLimits, require_file,
};
use crate::redact::redact_params;

/// Provider that forwards parameters untouched and echoes the request back.
///
/// Default parameters are merged with per-request parameters (request wins), and a
/// `request_id` is generated when the caller did not supply one. The returned transcript is a
/// deterministic marker naming the audio file and the second range it covers, which keeps the
/// full pipeline observable without a live service behind it.
#[derive(Debug, Clone, Default)]
pub struct PassthroughProvider {
    limits: ProviderLimits,
    default_params: Map<String, Value>,
}

impl PassthroughProvider {
    pub fn new(limits: ProviderLimits, default_params: Map<String, Value>) -> Self {
        Self {
            limits,
            default_params,
        }
    }

    fn merged_params(&self, request: &Map<String, Value>) -> Map<String, Value> {
        let mut merged = self.default_params.clone();
        merged.extend(request.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

impl Provider for PassthroughProvider {
    fn limits(&self) -> ProviderLimits {
        self.limits
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Payload, ProviderError> {
        require_file("image", request.image)?;
        require_file("audio", request.audio)?;

        let mut params = self.merged_params(request.params);
        let request_id = match params.remove("request_id") {
            Some(Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let logged_params = Value::Object(redact_params(&params));
        debug!(
            request_id = %request_id,
            image = %request.image.display(),
            audio = %request.audio.display(),
            chunk_index = request.chunk.map(|c| c.index),
            params = %logged_params,
            "passthrough generate"
        );

        let stem = request
            .audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let transcript = match request.chunk {
            Some(chunk) => format!("[{stem} {}s-{}s]", chunk.start_second, chunk.end_second),
            None => format!("[{stem}]"),
        };

        let mut extra = Map::new();
        extra.insert("request_id".to_owned(), Value::String(request_id));
        extra.insert("params".to_owned(), Value::Object(params));
        if let Some(chunk) = request.chunk {
            extra.insert("chunk".to_owned(), serde_json::to_value(chunk)?);
        }

        Ok(Payload { transcript, extra })
    }
}
