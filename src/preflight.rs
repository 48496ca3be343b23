use crate::Result;
use crate::error::Error;

const CHUNKING_SNIPPET: &str = "audio:\n  chunk_seconds: 30\n  on_chunk_failure: stop";

/// Reject audio longer than the provider accepts when chunking is not configured.
///
/// Passes when the provider has no limit, the audio fits, or a positive `chunk_seconds` is set.
pub fn check_duration_limit(
    audio_seconds: u64,
    provider_limit: Option<u64>,
    chunk_seconds: Option<i64>,
) -> Result<()> {
    let Some(limit) = provider_limit else {
        return Ok(());
    };
    if audio_seconds <= limit || chunk_seconds.is_some_and(|n| n > 0) {
        return Ok(());
    }

    Err(Error::validation(
        format!(
            "audio duration exceeds provider limit with no chunking configured \
             (duration={audio_seconds}s, provider_limit={limit}s)."
        ),
        "provider rejects long-form audio unless chunking is enabled",
        format!("configure chunking in YAML, for example:\n{CHUNKING_SNIPPET}"),
    ))
}
