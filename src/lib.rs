//! `synccraft`: long-form audio transcription through a pluggable provider.
//!
//! This crate provides:
//! - Chunk planning over a media duration
//! - Sequential chunk execution under a stop/continue failure policy
//! - Transcript assembly from partial results
//! - Collision-safe per-chunk output files named from a template
//!
//! The actual transcription is delegated to a [`Provider`]. The library is used by the
//! `synccraft` CLI but has no dependency on it.

// High-level API (most consumers should start here).
pub mod config;
pub mod pipeline;

// Crate-wide error type.
pub mod error;

// Chunk planning, execution, and assembly.
pub mod assemble;
pub mod chunk;
pub mod execution;

// Provider contract and built-in providers.
pub mod provider;
pub mod providers;

// Media inputs and preflight checks.
pub mod media;
pub mod preflight;

// Output files and filename templating.
pub mod output;
pub mod template;

// Secret-safe logging helpers.
pub mod redact;

#[cfg(feature = "logging")]
pub mod logging;

pub use assemble::assemble_transcript;
pub use chunk::{ChunkDescriptor, plan_chunks};
pub use config::{Config, ConfigOverrides};
pub use error::{Error, ExitCode, Result, UserMessage};
pub use execution::{
    ChunkEvent, ChunkFailure, ExecutionOutcome, FailurePolicy, execute_chunks,
    execute_chunks_with_progress,
};
pub use pipeline::{Job, Pipeline, RunReport, validate_job};
pub use provider::{GenerateRequest, Payload, Provider, ProviderError, ProviderLimits};
pub use providers::ConfiguredProvider;
