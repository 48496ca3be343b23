//! Transcript files on disk: the overall transcript and optional per-chunk files.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::Result;
use crate::chunk::ChunkDescriptor;
use crate::error::{Error, UserMessage};
use crate::provider::Payload;
use crate::template::{self, TemplateValues};

/// Write `transcript` plus a trailing newline to `path`, creating parent directories.
///
/// The file is written to a temporary sibling and moved into place, so readers never observe a
/// half-written transcript.
pub fn write_transcript(path: &Path, transcript: &str) -> Result<()> {
    let file = staged_file(path, transcript)?;
    file.persist(path)
        .map_err(|err| Error::io(format!("failed to write transcript {}", path.display()), err.error))?;
    Ok(())
}

fn write_transcript_noclobber(path: &Path, transcript: &str) -> Result<()> {
    let file = staged_file(path, transcript)?;
    file.persist_noclobber(path)
        .map_err(|err| Error::io(format!("failed to write chunk output {}", path.display()), err.error))?;
    Ok(())
}

fn staged_file(path: &Path, transcript: &str) -> Result<NamedTempFile> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)
        .map_err(|err| Error::io(format!("failed to create directory {}", dir.display()), err))?;

    let mut file = NamedTempFile::new_in(dir)
        .map_err(|err| Error::io(format!("failed to stage output in {}", dir.display()), err))?;
    writeln!(file, "{transcript}")
        .and_then(|()| file.flush())
        .map_err(|err| Error::io(format!("failed to write {}", path.display()), err))?;
    Ok(file)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Reject anything but a single plain filename.
///
/// Absolute paths, separators, and the `""`, `"."`, `".."` segments would let a rendered name
/// escape the output directory.
pub fn validate_output_filename(filename: &str) -> Result<()> {
    let path = Path::new(filename);
    let mut components = path.components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    let unsafe_name = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || path.is_absolute()
        || !single_normal;

    if unsafe_name {
        return Err(Error::UnsafePath(UserMessage::new(
            format!("chunk output filename '{filename}' is an unsafe path."),
            "chunk output files must be plain filenames under the output directory",
            "remove path separators and traversal segments from the chunk template",
        )));
    }
    Ok(())
}

/// Per-run table of allocated output names, used to pick collision-free filenames.
///
/// The first request for a name gets it unchanged. Later requests, or names already present on
/// disk, get the stem suffixed with `__1`, `__2`, ... and the original extension.
#[derive(Debug, Default)]
pub struct NameAllocator {
    allocated: HashMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a name derived from `base` that is unused this run and absent from `dir`.
    pub fn allocate(&mut self, base: &str, dir: &Path) -> String {
        let base_path = Path::new(base);
        // A trailing '.' is not an extension: `clip.` becomes `clip.__1`.
        let (stem, suffix) = match (base_path.file_stem(), base_path.extension()) {
            (Some(stem), Some(ext)) if !ext.is_empty() => (
                stem.to_string_lossy().into_owned(),
                format!(".{}", ext.to_string_lossy()),
            ),
            _ => (base.to_owned(), String::new()),
        };

        let mut counter = self.allocated.get(base).copied().unwrap_or(0);
        loop {
            let candidate = if counter == 0 {
                base.to_owned()
            } else {
                format!("{stem}__{counter}{suffix}")
            };

            if !self.allocated.contains_key(&candidate) && !dir.join(&candidate).exists() {
                self.allocated.insert(candidate.clone(), 1);
                self.allocated.insert(base.to_owned(), counter + 1);
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Chunk output filenames rendered and validated, ready to be written.
#[derive(Debug)]
pub struct RenderedChunkOutputs<'a> {
    files: Vec<(String, &'a Payload)>,
}

impl RenderedChunkOutputs<'_> {
    /// Rendered base names in chunk order, before collision resolution.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Render and validate a filename for every successful chunk without touching the disk.
///
/// `base_values` supplies the non-chunk placeholders (such as `audio_basename`).
pub fn render_chunk_outputs<'a>(
    template: &str,
    successes: &'a [(ChunkDescriptor, Payload)],
    base_values: &TemplateValues,
) -> Result<RenderedChunkOutputs<'a>> {
    let mut ordered: Vec<&(ChunkDescriptor, Payload)> = successes.iter().collect();
    ordered.sort_by_key(|(chunk, _)| chunk.index);

    let mut files = Vec::with_capacity(ordered.len());
    for (chunk, payload) in ordered {
        let mut values = base_values.clone();
        values.extend(chunk.template_values());
        let filename = template::render(template, &values)?;
        validate_output_filename(&filename)?;
        files.push((filename, payload));
    }
    Ok(RenderedChunkOutputs { files })
}

/// Write previously rendered chunk outputs into `output_dir`, resolving name collisions.
///
/// Returns the written paths in chunk order.
pub fn write_rendered_chunk_outputs(
    rendered: RenderedChunkOutputs<'_>,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).map_err(|err| {
        Error::io(format!("failed to create directory {}", output_dir.display()), err)
    })?;

    let mut names = NameAllocator::new();
    let mut written = Vec::with_capacity(rendered.len());
    for (filename, payload) in rendered.files {
        let resolved = names.allocate(&filename, output_dir);
        let path = output_dir.join(&resolved);
        debug!(base = %filename, resolved = %resolved, "writing chunk output");
        write_transcript_noclobber(&path, &payload.transcript)?;
        written.push(path);
    }

    Ok(written)
}

/// Write one file per successful chunk into `output_dir`.
///
/// Every filename is rendered and validated before anything is written, so a bad template or an
/// unsafe name leaves the directory untouched.
pub fn write_chunk_outputs(
    template: &str,
    successes: &[(ChunkDescriptor, Payload)],
    output_dir: &Path,
    base_values: &TemplateValues,
) -> Result<Vec<PathBuf>> {
    let rendered = render_chunk_outputs(template, successes, base_values)?;
    write_rendered_chunk_outputs(rendered, output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(index: usize, text: &str) -> (ChunkDescriptor, Payload) {
        let chunk = ChunkDescriptor {
            index,
            start_second: index as u64 * 30,
            end_second: index as u64 * 30 + 30,
        };
        (chunk, Payload::new(text))
    }

    fn basename(name: &str) -> TemplateValues {
        TemplateValues::new().with("audio_basename", name)
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn write_transcript_creates_parent_and_newline() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("nested").join("file.txt");

        write_transcript(&output, "hello")?;

        assert_eq!(std::fs::read_to_string(&output)?, "hello\n");
        Ok(())
    }

    #[test]
    fn write_transcript_replaces_existing_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("file.txt");
        std::fs::write(&output, "old\n")?;

        write_transcript(&output, "new")?;

        assert_eq!(std::fs::read_to_string(&output)?, "new\n");
        Ok(())
    }

    #[test]
    fn unsafe_filenames_are_rejected() {
        for name in ["", ".", "..", "a/b.txt", "../x.txt", "/abs.txt", "dir/", "a\\b.txt"] {
            let err = validate_output_filename(name).unwrap_err();
            assert!(matches!(err, Error::UnsafePath(_)), "{name:?} should be unsafe");
        }
        assert!(validate_output_filename("clip_0_0_30.txt").is_ok());
        assert!(validate_output_filename(".hidden").is_ok());
    }

    #[test]
    fn repeated_names_get_numbered_suffixes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let successes = vec![success(0, "zero"), success(1, "one"), success(2, "two")];

        let written = write_chunk_outputs("clip.txt", &successes, dir.path(), &basename("clip"))?;

        let names: Vec<String> = written.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["clip.txt", "clip__1.txt", "clip__2.txt"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("clip.txt"))?, "zero\n");
        assert_eq!(std::fs::read_to_string(dir.path().join("clip__1.txt"))?, "one\n");
        assert_eq!(std::fs::read_to_string(dir.path().join("clip__2.txt"))?, "two\n");
        Ok(())
    }

    #[test]
    fn existing_files_are_never_clobbered() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("clip.txt"), "previous run\n")?;
        std::fs::write(dir.path().join("clip__1.txt"), "previous run\n")?;

        let successes = vec![success(0, "zero"), success(1, "one")];
        let written = write_chunk_outputs("clip.txt", &successes, dir.path(), &basename("clip"))?;

        let names: Vec<String> = written.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["clip__2.txt", "clip__3.txt"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("clip.txt"))?, "previous run\n");
        Ok(())
    }

    #[test]
    fn allocator_does_not_hand_out_a_name_taken_by_a_suffixed_base() {
        let dir = Path::new("/nonexistent-synccraft-dir");
        let mut names = NameAllocator::new();

        assert_eq!(names.allocate("a.txt", dir), "a.txt");
        assert_eq!(names.allocate("a__1.txt", dir), "a__1.txt");
        // a__1.txt is already taken by a different base, so skip to a__2.txt.
        assert_eq!(names.allocate("a.txt", dir), "a__2.txt");
        assert_eq!(names.allocate("a__1.txt", dir), "a__1__1.txt");
    }

    #[test]
    fn names_without_extension_keep_no_suffix() {
        let dir = Path::new("/nonexistent-synccraft-dir");
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("clip", dir), "clip");
        assert_eq!(names.allocate("clip", dir), "clip__1");
    }

    #[test]
    fn trailing_dot_is_not_treated_as_an_extension() {
        let dir = Path::new("/nonexistent-synccraft-dir");
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("clip.", dir), "clip.");
        assert_eq!(names.allocate("clip.", dir), "clip.__1");
        assert_eq!(names.allocate("a.b.txt", dir), "a.b.txt");
        assert_eq!(names.allocate("a.b.txt", dir), "a.b__1.txt");
    }

    #[test]
    fn rendered_names_use_chunk_metadata_in_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let successes = vec![success(2, "two"), success(0, "zero")];

        let written = write_chunk_outputs(
            "{audio_basename}_{index:02}_{start}_{end}.txt",
            &successes,
            dir.path(),
            &basename("clip"),
        )?;

        let names: Vec<String> = written.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["clip_00_0_30.txt", "clip_02_60_90.txt"]);
        Ok(())
    }

    #[test]
    fn unsafe_rendering_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("chunks");
        let successes = vec![success(0, "zero"), success(1, "one")];

        let err = write_chunk_outputs("{audio_basename}/{index}.txt", &successes, &out, &basename("clip"))
            .unwrap_err();

        assert!(matches!(err, Error::UnsafePath(_)));
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn rendering_is_separate_from_writing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("chunks");
        let successes = vec![success(1, "one"), success(0, "zero")];

        let rendered = render_chunk_outputs("{audio_basename}_{index}.txt", &successes, &basename("clip"))?;
        assert_eq!(
            rendered.filenames().collect::<Vec<_>>(),
            vec!["clip_0.txt", "clip_1.txt"]
        );
        assert!(!out.exists());

        let written = write_rendered_chunk_outputs(rendered, &out)?;
        assert_eq!(written, vec![out.join("clip_0.txt"), out.join("clip_1.txt")]);
        assert_eq!(std::fs::read_to_string(out.join("clip_1.txt"))?, "one\n");
        Ok(())
    }

    #[test]
    fn missing_placeholder_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("chunks");
        let successes = vec![success(0, "zero")];

        let err = write_chunk_outputs("{speaker}_{index}.txt", &successes, &out, &basename("clip"))
            .unwrap_err();

        assert!(matches!(err, Error::Templating(_)));
        assert!(err.to_string().contains("'speaker'"));
        assert!(!out.exists());
        Ok(())
    }
}
