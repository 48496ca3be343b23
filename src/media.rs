use std::path::Path;

use hound::WavReader;

use crate::Result;
use crate::error::Error;

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];
const AUDIO_EXTENSIONS: &[&str] = &["wav"];

/// Supplies the length of a media input in whole seconds.
pub trait DurationSource {
    /// Duration rounded down to whole seconds.
    ///
    /// Unreadable or malformed media is an error, never a sentinel value.
    fn duration_seconds(&self, path: &Path) -> Result<u64>;
}

/// [`DurationSource`] for PCM WAV files, read from the header via `hound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDurationSource;

impl DurationSource for WavDurationSource {
    fn duration_seconds(&self, path: &Path) -> Result<u64> {
        let reader = WavReader::open(path).map_err(|err| {
            Error::validation(
                format!("unsupported or invalid WAV file: {}", path.display()),
                err.to_string(),
                "provide a valid .wav file containing fmt and data chunks",
            )
        })?;

        let sample_rate = reader.spec().sample_rate;
        if sample_rate == 0 {
            return Err(Error::validation(
                format!("unsupported WAV file with non-positive frame rate: {}", path.display()),
                "duration calculation requires a positive frame rate",
                "re-encode the audio as a valid PCM WAV file",
            ));
        }

        // `duration` counts frames (samples per channel).
        Ok(u64::from(reader.duration()) / u64::from(sample_rate))
    }
}

/// Check that `path` exists, is a file, and has one of `allowed` extensions (case-insensitive).
pub fn validate_media_path(path: &Path, field_name: &str, allowed: &[&str]) -> Result<()> {
    if !path.exists() {
        return Err(Error::validation(
            format!("{field_name} not found: {}", path.display()),
            "the provided path does not exist",
            format!("provide an existing file path for {field_name}"),
        ));
    }
    if !path.is_file() {
        return Err(Error::validation(
            format!("{field_name} must reference a file: {}", path.display()),
            "directories cannot be processed as media inputs",
            format!("point {field_name} to a media file"),
        ));
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !allowed.contains(&extension.as_str()) {
        let shown = if extension.is_empty() {
            "<none>".to_owned()
        } else {
            format!(".{extension}")
        };
        let options = allowed
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::validation(
            format!("unsupported {field_name} format '{shown}'."),
            "synccraft validates media formats before execution",
            format!("use one of the supported extensions: {options}"),
        ));
    }
    Ok(())
}

pub fn validate_image_path(path: &Path) -> Result<()> {
    validate_media_path(path, "image", IMAGE_EXTENSIONS)
}

pub fn validate_audio_path(path: &Path) -> Result<()> {
    validate_media_path(path, "audio", AUDIO_EXTENSIONS)
}

/// Write a silent 16-bit mono WAV of `seconds` length. Shared by tests across the crate.
#[cfg(test)]
pub(crate) fn write_silent_wav(path: &Path, seconds: u32, sample_rate: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..seconds * sample_rate {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_duration_rounds_down_to_whole_seconds() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 1000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        // 2.5 seconds of stereo frames.
        for _ in 0..2500 {
            writer.write_sample(0i16)?;
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;

        assert_eq!(WavDurationSource.duration_seconds(&path)?, 2);
        Ok(())
    }

    #[test]
    fn silent_wav_helper_matches_requested_length() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("silence.wav");
        write_silent_wav(&path, 61, 100)?;
        assert_eq!(WavDurationSource.duration_seconds(&path)?, 61);
        Ok(())
    }

    #[test]
    fn malformed_wav_is_a_validation_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fake.wav");
        std::fs::write(&path, b"fake")?;

        let err = WavDurationSource.duration_seconds(&path).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("unsupported or invalid WAV file"));
        Ok(())
    }

    #[test]
    fn media_paths_are_checked_for_existence_and_extension() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let png = dir.path().join("cover.PNG");
        let txt = dir.path().join("cover.txt");
        std::fs::write(&png, b"png")?;
        std::fs::write(&txt, b"txt")?;

        validate_image_path(&png)?;

        let err = validate_image_path(&txt).unwrap_err();
        assert!(err.to_string().contains("unsupported image format '.txt'"));

        let err = validate_audio_path(&dir.path().join("missing.wav")).unwrap_err();
        assert!(err.to_string().starts_with("what: audio not found"));

        let err = validate_audio_path(dir.path()).unwrap_err();
        assert!(err.to_string().contains("must reference a file"));
        Ok(())
    }
}
