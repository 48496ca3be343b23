use std::fmt;

use thiserror::Error;

use crate::provider::ProviderError;
use crate::template::TemplateError;

/// Synccraft's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A user-facing failure description: what failed, why, and how to fix it.
///
/// Rendered as `what: ...; why: ...; how-to-fix: ...` so every fatal error reads the same way
/// on the terminal regardless of where it originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub what: String,
    pub why: String,
    pub how_to_fix: String,
}

impl UserMessage {
    pub fn new(
        what: impl Into<String>,
        why: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self {
            what: what.into(),
            why: why.into(),
            how_to_fix: how_to_fix.into(),
        }
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "what: {}; why: {}; how-to-fix: {}",
            self.what, self.why, self.how_to_fix
        )
    }
}

/// Process exit codes, one per error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    Internal = 1,
    Config = 2,
    Validation = 3,
    Provider = 4,
    Processing = 5,
}

impl From<ExitCode> for u8 {
    fn from(code: ExitCode) -> Self {
        code as u8
    }
}

/// Synccraft's crate-wide error type.
///
/// Each variant is one failure category. Library callers match on the variant; the CLI only
/// needs [`Error::exit_code`] and the `Display` rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad chunk size, duration, or policy value. Always caller-fixable.
    #[error("{0}")]
    InvalidInput(UserMessage),

    #[error("{0}")]
    Config(UserMessage),

    /// Invalid media inputs or a preflight check that rejected the job.
    #[error("{0}")]
    Validation(UserMessage),

    #[error(transparent)]
    Templating(#[from] TemplateError),

    /// A rendered filename would escape the output directory.
    #[error("{0}")]
    UnsafePath(UserMessage),

    /// Unchunked provider call failed. Chunked runs record these per chunk instead.
    #[error("what: provider call failed; why: {0}; how-to-fix: check the provider configuration and payload")]
    Provider(#[from] ProviderError),

    /// Raised above the engine when the execution outcome is not acceptable.
    #[error("{0}")]
    Processing(UserMessage),

    #[error("{message}")]
    Io {
        message: UserMessage,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn invalid_input(
        what: impl Into<String>,
        why: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self::InvalidInput(UserMessage::new(what, why, how_to_fix))
    }

    pub(crate) fn config(
        what: impl Into<String>,
        why: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self::Config(UserMessage::new(what, why, how_to_fix))
    }

    pub(crate) fn validation(
        what: impl Into<String>,
        why: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self::Validation(UserMessage::new(what, why, how_to_fix))
    }

    pub(crate) fn processing(
        what: impl Into<String>,
        why: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self::Processing(UserMessage::new(what, why, how_to_fix))
    }

    pub(crate) fn io(what: impl Into<String>, source: std::io::Error) -> Self {
        let why = source.to_string();
        Self::Io {
            message: UserMessage::new(
                what,
                why,
                "check that the path is writable and the disk is not full",
            ),
            source,
        }
    }

    /// The exit code the CLI should terminate with for this error.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::Templating(_) | Self::UnsafePath(_) => ExitCode::Config,
            Self::InvalidInput(_) | Self::Validation(_) => ExitCode::Validation,
            Self::Provider(_) => ExitCode::Provider,
            Self::Processing(_) => ExitCode::Processing,
            Self::Io { .. } => ExitCode::Internal,
        }
    }
}
