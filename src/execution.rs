//! Sequential chunk execution under a stop/continue failure policy.
//!
//! The engine never raises on a per-chunk failure. It records the failure and lets the policy
//! decide whether to keep going. Turning "some chunk failed" into a fatal outcome is the
//! caller's decision, made after inspecting the returned [`ExecutionOutcome`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkDescriptor;
use crate::error::Error;
use crate::provider::{Payload, ProviderError};

/// What to do when a chunk fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum FailurePolicy {
    /// Halt on the first failed chunk.
    #[default]
    Stop,

    /// Attempt every planned chunk and collect all failures.
    Continue,
}

impl FailurePolicy {
    pub const ALL: [FailurePolicy; 2] = [FailurePolicy::Continue, FailurePolicy::Stop];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Continue => "continue",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == s)
            .ok_or_else(|| {
                let options = Self::ALL.map(FailurePolicy::as_str).join(", ");
                Error::invalid_input(
                    format!("on_chunk_failure must be one of: {options}."),
                    format!("unsupported chunk failure handling policy '{s}' was provided"),
                    format!("choose one of {options}"),
                )
            })
    }
}

impl TryFrom<String> for FailurePolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A chunk whose transcription failed, with the reason.
#[derive(Debug)]
pub struct ChunkFailure<E = ProviderError> {
    pub chunk: ChunkDescriptor,
    pub error: E,
}

/// Everything one execution pass produced, in chunk order.
#[derive(Debug)]
pub struct ExecutionOutcome<T = Payload, E = ProviderError> {
    pub successes: Vec<(ChunkDescriptor, T)>,
    pub failures: Vec<ChunkFailure<E>>,
    /// `true` when the `stop` policy halted the run before every chunk was attempted
    /// (or the failing chunk was the last one).
    pub aborted_early: bool,
}

impl<T, E> Default for ExecutionOutcome<T, E> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
            aborted_early: false,
        }
    }
}

impl<T, E> ExecutionOutcome<T, E> {
    pub fn first_failure(&self) -> Option<&ChunkFailure<E>> {
        self.failures.first()
    }

    pub fn attempted(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// Progress notifications emitted while executing.
#[derive(Debug)]
pub enum ChunkEvent<'a, E> {
    Started(&'a ChunkDescriptor),
    Succeeded(&'a ChunkDescriptor),
    Failed(&'a ChunkDescriptor, &'a E),
    /// The `stop` policy halted the run; `skipped` chunks were never attempted.
    Aborted { skipped: usize },
}

/// Run `transcribe` over `chunks` in ascending index order.
pub fn execute_chunks<T, E, F>(
    chunks: &[ChunkDescriptor],
    policy: FailurePolicy,
    transcribe: F,
) -> ExecutionOutcome<T, E>
where
    F: FnMut(&ChunkDescriptor) -> Result<T, E>,
{
    execute_chunks_with_progress(chunks, policy, transcribe, |_| {})
}

/// Like [`execute_chunks`], reporting each step to `progress`.
///
/// `transcribe` is invoked at most once per chunk, one chunk at a time.
pub fn execute_chunks_with_progress<T, E, F, P>(
    chunks: &[ChunkDescriptor],
    policy: FailurePolicy,
    mut transcribe: F,
    mut progress: P,
) -> ExecutionOutcome<T, E>
where
    F: FnMut(&ChunkDescriptor) -> Result<T, E>,
    P: FnMut(ChunkEvent<'_, E>),
{
    let mut ordered: Vec<&ChunkDescriptor> = chunks.iter().collect();
    ordered.sort_by_key(|chunk| chunk.index);

    let mut outcome = ExecutionOutcome::default();

    for (position, chunk) in ordered.iter().copied().enumerate() {
        progress(ChunkEvent::Started(chunk));

        match transcribe(chunk) {
            Ok(payload) => {
                progress(ChunkEvent::Succeeded(chunk));
                outcome.successes.push((*chunk, payload));
            }
            Err(error) => {
                progress(ChunkEvent::Failed(chunk, &error));
                outcome.failures.push(ChunkFailure {
                    chunk: *chunk,
                    error,
                });

                if policy == FailurePolicy::Stop {
                    progress(ChunkEvent::Aborted {
                        skipped: ordered.len() - position - 1,
                    });
                    outcome.aborted_early = true;
                    return outcome;
                }
            }
        }
    }

    outcome
}
