//! High-level API for running a transcription job.
//!
//! [`Pipeline`] owns a provider and a duration source and wires up:
//! validation → preflight → (chunk planning → execution → assembly) → output files.
//!
//! The lower-level pieces stay usable and testable on their own in their modules.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::Map;
use tracing::{debug, info, warn};

use crate::Result;
use crate::assemble::assemble_transcript;
use crate::chunk::{ChunkDescriptor, plan_chunks};
use crate::config::{Config, output_template_values};
use crate::error::Error;
use crate::execution::{
    ChunkEvent, ChunkFailure, ExecutionOutcome, FailurePolicy, execute_chunks_with_progress,
};
use crate::media::{DurationSource, WavDurationSource, validate_audio_path, validate_image_path};
use crate::output::{render_chunk_outputs, write_rendered_chunk_outputs, write_transcript};
use crate::preflight::check_duration_limit;
use crate::provider::{GenerateRequest, Payload, Provider, ProviderError};

/// Inputs for one run.
#[derive(Debug, Clone, Copy)]
pub struct Job<'a> {
    pub image: &'a Path,
    pub audio: &'a Path,
    pub config: &'a Config,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunReport {
    pub transcript: String,
    pub output_path: PathBuf,
    /// Chunks planned; `None` for an unchunked run.
    pub chunks_planned: Option<usize>,
    /// Chunk failures tolerated under the `continue` policy.
    pub failures: Vec<ChunkFailure>,
    /// Per-chunk transcript files, in chunk order.
    pub chunk_files: Vec<PathBuf>,
}

/// Runs transcription jobs against a provider.
///
/// Construct once and call [`Pipeline::run`] for as many jobs as needed.
pub struct Pipeline<P: Provider, D: DurationSource = WavDurationSource> {
    provider: P,
    durations: D,
}

impl<P: Provider> Pipeline<P> {
    /// Pipeline that reads durations from WAV headers.
    pub fn new(provider: P) -> Self {
        Self::with_duration_source(provider, WavDurationSource)
    }
}

impl<P: Provider, D: DurationSource> Pipeline<P, D> {
    pub fn with_duration_source(provider: P, durations: D) -> Self {
        Self {
            provider,
            durations,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Validate media paths and configuration without calling the provider.
    pub fn validate(&self, job: &Job<'_>) -> Result<()> {
        validate_job(job)
    }

    /// Run `job` end to end and write its output files.
    pub fn run(&self, job: &Job<'_>) -> Result<RunReport> {
        let started = Instant::now();
        self.validate(job)?;

        let config = job.config;
        let output_path = config.output_path()?.to_path_buf();
        let chunk_seconds = config.chunk_seconds();

        // Duration is read at most once; it is needed for the preflight and for planning.
        let mut duration = None;
        if let Some(limit) = self.provider.limits().max_audio_seconds {
            let seconds = self.durations.duration_seconds(job.audio)?;
            check_duration_limit(seconds, Some(limit), chunk_seconds)?;
            duration = Some(seconds);
        }

        let report = match chunk_seconds {
            None => self.run_unchunked(job, output_path)?,
            Some(width) => {
                let total = match duration {
                    Some(seconds) => seconds,
                    None => self.durations.duration_seconds(job.audio)?,
                };
                self.run_chunked(job, output_path, total, width)?
            }
        };

        info!(
            phase = "total",
            elapsed_ms = started.elapsed().as_millis() as u64,
            output = %report.output_path.display(),
            "transcription finished"
        );
        Ok(report)
    }

    fn run_unchunked(&self, job: &Job<'_>, output_path: PathBuf) -> Result<RunReport> {
        let started = Instant::now();
        let payload = self.provider.generate(&request(job, None, &job.config.provider.params))?;
        write_transcript(&output_path, &payload.transcript)?;

        info!(
            phase = "processing",
            elapsed_ms = started.elapsed().as_millis() as u64,
            "unchunked transcription written"
        );
        Ok(RunReport {
            transcript: payload.transcript,
            output_path,
            chunks_planned: None,
            failures: Vec::new(),
            chunk_files: Vec::new(),
        })
    }

    fn run_chunked(
        &self,
        job: &Job<'_>,
        output_path: PathBuf,
        total_seconds: u64,
        chunk_seconds: i64,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let config = job.config;
        let policy = config.audio.on_chunk_failure;

        let total = i64::try_from(total_seconds).map_err(|_| {
            Error::invalid_input(
                format!("audio duration of {total_seconds}s is out of range."),
                "duration does not fit in a signed 64-bit second count",
                "split the input into smaller files",
            )
        })?;
        let chunks = plan_chunks(total, Some(chunk_seconds))?;
        info!(
            total_seconds,
            chunk_seconds,
            chunks = chunks.len(),
            policy = %policy,
            "planned chunks"
        );

        let params = &config.provider.params;
        let outcome = execute_chunks_with_progress(
            &chunks,
            policy,
            |chunk| self.provider.generate(&request(job, Some(*chunk), params)),
            log_chunk_event,
        );

        check_outcome(&outcome, policy, chunks.len())?;

        // Chunk filenames depend on the audio name, so they are rendered and checked again here,
        // before anything is written.
        let rendered = match &config.output.chunk_template {
            Some(template) => {
                let audio_basename = job
                    .audio
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let base_values =
                    output_template_values(&output_path).with("audio_basename", audio_basename);
                Some(render_chunk_outputs(template, &outcome.successes, &base_values)?)
            }
            None => None,
        };

        let transcript = assemble_transcript(&outcome.successes);
        write_transcript(&output_path, &transcript)?;

        let chunk_files = match rendered {
            Some(rendered) => {
                let output_dir = match output_path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                write_rendered_chunk_outputs(rendered, &output_dir)?
            }
            None => Vec::new(),
        };

        if !outcome.failures.is_empty() {
            warn!(
                failed = outcome.failures.len(),
                succeeded = outcome.successes.len(),
                "transcript assembled without failed chunks"
            );
        }
        info!(
            phase = "processing",
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chunked transcription written"
        );

        Ok(RunReport {
            transcript,
            output_path,
            chunks_planned: Some(chunks.len()),
            failures: outcome.failures,
            chunk_files,
        })
    }
}

/// Check media paths and configuration for `job`. No provider is involved.
pub fn validate_job(job: &Job<'_>) -> Result<()> {
    validate_image_path(job.image)?;
    validate_audio_path(job.audio)?;
    job.config.validate()
}

fn request<'a>(
    job: &Job<'a>,
    chunk: Option<ChunkDescriptor>,
    params: &'a Map<String, serde_json::Value>,
) -> GenerateRequest<'a> {
    GenerateRequest {
        image: job.image,
        audio: job.audio,
        chunk,
        params,
    }
}

fn log_chunk_event(event: ChunkEvent<'_, ProviderError>) {
    match event {
        ChunkEvent::Started(chunk) => {
            debug!(
                index = chunk.index,
                start = chunk.start_second,
                end = chunk.end_second,
                duration = chunk.duration_seconds(),
                "chunk metadata"
            );
            info!(
                index = chunk.index,
                start = chunk.start_second,
                end = chunk.end_second,
                "transcribing chunk"
            );
        }
        ChunkEvent::Succeeded(chunk) => debug!(index = chunk.index, "chunk transcribed"),
        ChunkEvent::Failed(chunk, error) => {
            warn!(index = chunk.index, error = %error, "chunk failed");
        }
        ChunkEvent::Aborted { skipped } => {
            warn!(skipped, "stopping after chunk failure");
        }
    }
}

/// Turn an unacceptable execution outcome into a fatal error.
///
/// - `stop` with any failure fails, naming the first failed chunk.
/// - Zero successes fails under either policy.
pub fn check_outcome(
    outcome: &ExecutionOutcome<Payload, ProviderError>,
    policy: FailurePolicy,
    planned: usize,
) -> Result<()> {
    let stop_failure = match policy {
        FailurePolicy::Stop => outcome.first_failure(),
        FailurePolicy::Continue => None,
    };
    if let Some(failure) = stop_failure {
        return Err(Error::processing(
            format!(
                "chunked transcription failed at chunk index {}.",
                failure.chunk.index
            ),
            format!(
                "on_chunk_failure was set to stop and the provider returned an error: {}",
                failure.error
            ),
            "fix the provider/chunking issue or set on_chunk_failure: continue",
        ));
    }

    if outcome.successes.is_empty() {
        let why = if planned == 0 {
            "the audio is shorter than one second, so no chunks were planned".to_owned()
        } else {
            format!("all {planned} chunk requests failed")
        };
        return Err(Error::processing(
            "chunked transcription produced no successful chunks.",
            why,
            "check the provider payload, the audio input, and chunk settings",
        ));
    }
    Ok(())
}
