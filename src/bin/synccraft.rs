use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use synccraft::config::{Config, ConfigOverrides};
use synccraft::logging;
use synccraft::{ConfiguredProvider, FailurePolicy, Job, Pipeline, UserMessage, validate_job};

#[derive(Parser, Debug)]
#[command(name = "synccraft", version)]
#[command(about = "Transcribe long audio (paired with a still image) through a provider")]
struct Params {
    /// Path to the source image file.
    image: PathBuf,

    /// Path to the source audio file (.wav).
    audio: PathBuf,

    /// Path to the YAML config file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Transcript output path (overrides output.path).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Chunk width in seconds (overrides audio.chunk_seconds).
    #[arg(long = "chunk-seconds", allow_hyphen_values = true)]
    chunk_seconds: Option<String>,

    /// What to do when a chunk fails: stop or continue (overrides audio.on_chunk_failure).
    #[arg(long = "on-chunk-failure")]
    on_chunk_failure: Option<String>,

    /// Per-chunk output filename template (overrides output.chunk_template).
    #[arg(long = "chunk-template")]
    chunk_template: Option<String>,

    /// Enable INFO logging.
    #[arg(long = "verbose", default_value_t = false)]
    verbose: bool,

    /// Enable DEBUG logging.
    #[arg(long = "debug", default_value_t = false)]
    debug: bool,

    /// Emit logs as JSON.
    #[arg(long = "log-json", default_value_t = false)]
    log_json: bool,

    /// Validate inputs and print the execution summary without calling the provider.
    #[arg(long = "dry-run", default_value_t = false)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let params = Params::parse();
    logging::init(logging::level_for(params.verbose, params.debug), params.log_json);

    match run(&params) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Library errors carry their own category; anything else is internal.
            let code = match err.downcast_ref::<synccraft::Error>() {
                Some(e) => {
                    eprintln!("{e}");
                    e.exit_code()
                }
                None => {
                    let message = UserMessage::new(
                        "unexpected runtime failure.",
                        format!("{err:#}"),
                        "re-run with --debug and report the log if the problem persists",
                    );
                    eprintln!("{message}");
                    synccraft::ExitCode::Internal
                }
            };
            ExitCode::from(u8::from(code))
        }
    }
}

fn run(params: &Params) -> Result<()> {
    let started = Instant::now();
    // Flag values are parsed here rather than by clap so bad values get the same
    // what/why/how-to-fix report as every other error.
    let chunk_seconds = params
        .chunk_seconds
        .as_deref()
        .map(parse_chunk_seconds)
        .transpose()?;
    let on_chunk_failure = params
        .on_chunk_failure
        .as_deref()
        .map(str::parse::<FailurePolicy>)
        .transpose()?;

    let config = Config::load(&params.config)?.with_overrides(ConfigOverrides {
        output: params.output.clone(),
        chunk_seconds,
        on_chunk_failure,
        chunk_template: params.chunk_template.clone(),
    });
    for warning in config.secret_warnings() {
        warn!("{warning}");
    }

    let job = Job {
        image: &params.image,
        audio: &params.audio,
        config: &config,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    validate_job(&job)?;
    print_summary(&mut out, params, &config)?;
    writeln!(out, "progress: loaded - inputs and configuration validated")?;
    info!(phase = "loaded", elapsed_ms = started.elapsed().as_millis() as u64);

    if params.dry_run {
        info!("dry-run mode enabled; skipping provider calls");
        return Ok(());
    }

    writeln!(out, "progress: processing - starting transcription")?;
    out.flush()?;
    let provider = ConfiguredProvider::from_config(&config.provider)?;
    let report = Pipeline::new(provider).run(&job)?;

    if !report.failures.is_empty() {
        writeln!(
            out,
            "progress: warning - {} chunk(s) failed and were left out of the transcript",
            report.failures.len()
        )?;
    }
    for path in &report.chunk_files {
        writeln!(out, "progress: chunk - wrote {}", path.display())?;
    }
    writeln!(
        out,
        "progress: saved - transcript saved to {}",
        report.output_path.display()
    )?;
    Ok(())
}

fn parse_chunk_seconds(value: &str) -> synccraft::Result<i64> {
    value.trim().parse().map_err(|_| {
        synccraft::Error::InvalidInput(UserMessage::new(
            format!("--chunk-seconds must be an integer (got '{value}')."),
            "chunk width is a whole number of seconds",
            "pass a positive integer such as --chunk-seconds 30",
        ))
    })
}

fn print_summary(out: &mut impl Write, params: &Params, config: &Config) -> io::Result<()> {
    writeln!(out, "SyncCraft execution summary")?;
    writeln!(out, "  image: {}", params.image.display())?;
    writeln!(out, "  audio: {}", params.audio.display())?;
    writeln!(out, "  config: {}", params.config.display())?;
    writeln!(out, "  provider: {}", config.provider.kind)?;
    if let Some(payload) = &config.provider.payload {
        writeln!(out, "  provider_payload: {}", payload.display())?;
    }
    if let Some(chunk_seconds) = config.chunk_seconds() {
        writeln!(
            out,
            "  chunking: {chunk_seconds}s (on_chunk_failure: {})",
            config.audio.on_chunk_failure
        )?;
    }
    if let Some(path) = &config.output.path {
        writeln!(out, "  output: {}", path.display())?;
    }
    Ok(())
}
