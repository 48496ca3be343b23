use crate::chunk::ChunkDescriptor;
use crate::provider::Payload;

/// Join successful chunk transcripts into one transcript.
///
/// Fragments are joined with a single space in the order given, then the result is trimmed.
/// Callers pass successes already sorted by chunk index (the execution engine never reorders);
/// this function does not re-sort. An empty slice yields an empty string, which production
/// callers should treat as a failure before getting here.
pub fn assemble_transcript(successes: &[(ChunkDescriptor, Payload)]) -> String {
    successes
        .iter()
        .map(|(_, payload)| payload.transcript.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_owned()
}
