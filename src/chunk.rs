//! Chunk planning: splitting a duration into contiguous, indexed second intervals.

use serde::Serialize;

use crate::Result;
use crate::error::Error;
use crate::template::TemplateValues;

/// One half-open interval `[start_second, end_second)` of the source audio.
///
/// Descriptors are created by [`plan_chunks`] and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkDescriptor {
    pub index: usize,
    pub start_second: u64,
    pub end_second: u64,
}

impl ChunkDescriptor {
    /// Width of the interval in seconds. Always positive for planned chunks.
    pub fn duration_seconds(&self) -> u64 {
        self.end_second - self.start_second
    }

    /// Placeholder values this chunk contributes to output filename templates.
    ///
    /// `start`/`end` and `chunk_start`/`chunk_end` are aliases of each other.
    pub fn template_values(&self) -> TemplateValues {
        let mut values = TemplateValues::new();
        values.insert("index", self.index as u64);
        values.insert("start", self.start_second);
        values.insert("end", self.end_second);
        values.insert("chunk_start", self.start_second);
        values.insert("chunk_end", self.end_second);
        values
    }
}

/// Split `total_seconds` into consecutive windows of `chunk_seconds`.
///
/// - `total_seconds == 0` yields no chunks.
/// - `chunk_seconds == None` disables chunking and yields one chunk spanning everything.
/// - The final window holds the remainder and may be shorter than `chunk_seconds`.
///
/// Negative durations and non-positive chunk sizes are rejected with
/// [`Error::InvalidInput`]; no partial plan is ever returned.
pub fn plan_chunks(total_seconds: i64, chunk_seconds: Option<i64>) -> Result<Vec<ChunkDescriptor>> {
    if total_seconds < 0 {
        return Err(Error::invalid_input(
            "total_seconds cannot be negative.",
            "duration must represent elapsed seconds",
            "set total_seconds to 0 or a positive integer",
        ));
    }
    let total = total_seconds as u64;

    if total == 0 {
        return Ok(Vec::new());
    }

    let Some(chunk_seconds) = chunk_seconds else {
        return Ok(vec![ChunkDescriptor {
            index: 0,
            start_second: 0,
            end_second: total,
        }]);
    };

    if chunk_seconds <= 0 {
        return Err(Error::invalid_input(
            "chunk_seconds must be positive.",
            "zero or negative chunk sizes create invalid ranges",
            "provide a chunk size greater than 0",
        ));
    }
    let width = chunk_seconds as u64;

    let mut chunks = Vec::with_capacity(total.div_ceil(width) as usize);
    let mut start = 0;
    while start < total {
        let end = start.saturating_add(width).min(total);
        chunks.push(ChunkDescriptor {
            index: chunks.len(),
            start_second: start,
            end_second: end,
        });
        start = end;
    }

    Ok(chunks)
}
