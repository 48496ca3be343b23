//! Run configuration: a YAML file merged with command-line overrides.
//!
//! This is library-level configuration. Frontends map their own inputs into [`ConfigOverrides`]
//! so the library stays reusable outside the CLI.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::Result;
use crate::error::Error;
use crate::execution::FailurePolicy;
use crate::output::validate_output_filename;
use crate::redact::secret_paths;
use crate::template::{self, TemplateValues};

/// Placeholders a chunk output template may reference.
pub const CHUNK_TEMPLATE_PLACEHOLDERS: &[&str] = &[
    "audio_basename",
    "chunk_end",
    "chunk_start",
    "end",
    "ext",
    "index",
    "start",
    "stem",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub audio: AudioConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic responses read from a JSON payload file.
    #[serde(alias = "mock")]
    Fixture,

    /// Forwards parameters and echoes the request back.
    #[default]
    #[serde(alias = "omni")]
    Passthrough,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fixture => "fixture",
            Self::Passthrough => "passthrough",
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// JSON payload file for the fixture provider.
    pub payload: Option<PathBuf>,
    /// Overrides the limit the provider reports.
    pub max_audio_seconds: Option<u64>,
    /// Forwarded verbatim to the provider on every request.
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AudioConfig {
    /// Chunk width in seconds; `None` submits the whole input in one request.
    pub chunk_seconds: Option<i64>,
    pub on_chunk_failure: FailurePolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    /// Overall transcript file. Per-chunk files are written next to it.
    pub path: Option<PathBuf>,
    pub chunk_template: Option<String>,
}

/// Values that take precedence over the config file. `None` leaves the file's value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output: Option<PathBuf>,
    pub chunk_seconds: Option<i64>,
    pub on_chunk_failure: Option<FailurePolicy>,
    pub chunk_template: Option<String>,
}

impl Config {
    /// Read a YAML config file. An empty document is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::config(
                format!("config file not found: {}", path.display()),
                "--config must point to a readable YAML file",
                "create the config file and provide its path to --config",
            ));
        }
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::config(
                format!("config file is unreadable: {}", path.display()),
                err.to_string(),
                "check the file permissions and encoding (UTF-8)",
            )
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let invalid = |err: serde_yaml::Error| {
            Error::config(
                "config content is invalid.",
                err.to_string(),
                "fix or remove the reported key; see the provider, audio, and output sections",
            )
        };

        let doc: serde_yaml::Value = serde_yaml::from_str(text).map_err(invalid)?;
        match doc {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Mapping(_) => serde_yaml::from_value(doc).map_err(invalid),
            _ => Err(Error::config(
                "config content must be a mapping.",
                "synccraft requires named options under top-level keys",
                "use YAML object format, for example: output: {path: transcript.txt}",
            )),
        }
    }

    /// Apply overrides on top of this config.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(output) = overrides.output {
            self.output.path = Some(output);
        }
        if let Some(chunk_seconds) = overrides.chunk_seconds {
            self.audio.chunk_seconds = Some(chunk_seconds);
        }
        if let Some(policy) = overrides.on_chunk_failure {
            self.audio.on_chunk_failure = policy;
        }
        if let Some(template) = overrides.chunk_template {
            self.output.chunk_template = Some(template);
        }
        self
    }

    /// The transcript output path, required at execution time.
    pub fn output_path(&self) -> Result<&Path> {
        self.output.path.as_deref().ok_or_else(|| {
            Error::config(
                "missing required config key: output.path.",
                "synccraft needs an output destination for transcript text",
                "add output: {path: <transcript-file>} to your config or pass --output",
            )
        })
    }

    /// Chunk width when chunking is enabled.
    pub fn chunk_seconds(&self) -> Option<i64> {
        self.audio.chunk_seconds.filter(|n| *n > 0)
    }

    /// Check everything that can be checked before touching the provider.
    pub fn validate(&self) -> Result<()> {
        let output_path = self.output_path()?;

        if let Some(n) = self.audio.chunk_seconds.filter(|n| *n <= 0) {
            return Err(Error::config(
                format!("audio.chunk_seconds must be positive (got {n})."),
                "zero or negative chunk sizes create invalid ranges",
                "set audio.chunk_seconds to a positive integer or remove it to disable chunking",
            ));
        }

        if self.provider.max_audio_seconds == Some(0) {
            return Err(Error::config(
                "provider.max_audio_seconds must be positive.",
                "a zero limit would reject every input",
                "remove provider.max_audio_seconds or set it to a positive integer",
            ));
        }

        if self.provider.kind == ProviderKind::Fixture {
            match &self.provider.payload {
                None => {
                    return Err(Error::config(
                        "missing required config key: provider.payload.",
                        "provider payload path is needed for fixture transcription",
                        "add provider.payload: <json-file> to your config or use provider.kind: passthrough",
                    ));
                }
                Some(payload) if !payload.is_file() => {
                    return Err(Error::config(
                        format!("provider.payload not found: {}", payload.display()),
                        "the provided path does not exist",
                        "provide an existing file path for provider.payload",
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(template) = &self.output.chunk_template {
            validate_chunk_template(template, output_path)?;
        }
        Ok(())
    }

    /// One sanitized warning per secret-looking key stored in the config file.
    ///
    /// Values are never included. Callers decide how to surface them.
    #[must_use]
    pub fn secret_warnings(&self) -> Vec<String> {
        secret_paths("provider.params", &self.provider.params)
            .into_iter()
            .map(|path| {
                format!(
                    "{path} looks like a secret stored in the config file (value redacted); \
                     prefer supplying it through the environment"
                )
            })
            .collect()
    }
}

/// Placeholder values derived from the output path (`stem`, `ext`).
pub fn output_template_values(output_path: &Path) -> TemplateValues {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = output_path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    TemplateValues::new().with("stem", stem).with("ext", ext)
}

fn validate_chunk_template(template: &str, output_path: &Path) -> Result<()> {
    let example = "'{audio_basename}_{index}_{start}_{end}.txt'";

    if template.trim().is_empty() {
        return Err(Error::config(
            "output.chunk_template must be a non-empty string.",
            "chunk output file naming requires a valid template",
            format!("set output.chunk_template to a string like {example}"),
        ));
    }

    let invalid = |why: String| {
        Error::config(
            "output.chunk_template is invalid.",
            why,
            format!(
                "use only known tokens: {}; example {example}",
                CHUNK_TEMPLATE_PLACEHOLDERS.join(", ")
            ),
        )
    };

    let names = template::placeholders(template).map_err(|err| invalid(err.to_string()))?;
    if let Some(name) = names
        .iter()
        .find(|name| !CHUNK_TEMPLATE_PLACEHOLDERS.contains(&name.as_str()))
    {
        return Err(Error::config(
            format!("output.chunk_template uses unsupported placeholder '{name}'."),
            "chunk output rendering supports only deterministic placeholder values",
            format!("replace it with one of: {}", CHUNK_TEMPLATE_PLACEHOLDERS.join(", ")),
        ));
    }

    let mut sample = output_template_values(output_path).with("audio_basename", "audio");
    sample.extend(
        crate::chunk::ChunkDescriptor {
            index: 0,
            start_second: 0,
            end_second: 1,
        }
        .template_values(),
    );
    let rendered = template::render(template, &sample).map_err(|err| invalid(err.to_string()))?;
    validate_output_filename(&rendered).map_err(|err| invalid(err.to_string()))
}
