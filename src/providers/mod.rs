/// Deterministic provider backed by a JSON payload file.
pub mod fixture;

/// Provider that forwards parameters and echoes the request.
pub mod passthrough;

use serde_json::Map;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::Error;
use crate::provider::{GenerateRequest, Payload, Provider, ProviderError, ProviderLimits};

pub use fixture::FixtureProvider;
pub use passthrough::PassthroughProvider;

/// The provider selected by configuration.
///
/// Variants are independent implementations of [`Provider`]; this enum only dispatches.
#[derive(Debug, Clone)]
pub enum ConfiguredProvider {
    Fixture(FixtureProvider),
    Passthrough(PassthroughProvider),
}

impl ConfiguredProvider {
    /// Build the provider named by `config.kind`.
    pub fn from_config(config: &ProviderConfig) -> crate::Result<Self> {
        match config.kind {
            ProviderKind::Fixture => {
                let payload = config.payload.as_deref().ok_or_else(|| {
                    Error::config(
                        "missing required config key: provider.payload.",
                        "provider payload path is needed for fixture transcription",
                        "add provider.payload: <json-file> to your config or use provider.kind: passthrough",
                    )
                })?;
                let provider =
                    FixtureProvider::load(payload)?.with_limit_override(config.max_audio_seconds);
                Ok(Self::Fixture(provider))
            }
            // `config.params` reaches the provider through each request, not as defaults.
            ProviderKind::Passthrough => Ok(Self::Passthrough(PassthroughProvider::new(
                ProviderLimits {
                    max_audio_seconds: config.max_audio_seconds,
                },
                Map::new(),
            ))),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Fixture(_) => ProviderKind::Fixture,
            Self::Passthrough(_) => ProviderKind::Passthrough,
        }
    }
}

impl Provider for ConfiguredProvider {
    fn limits(&self) -> ProviderLimits {
        match self {
            Self::Fixture(p) => p.limits(),
            Self::Passthrough(p) => p.limits(),
        }
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Payload, ProviderError> {
        match self {
            Self::Fixture(p) => p.generate(request),
            Self::Passthrough(p) => p.generate(request),
        }
    }
}
