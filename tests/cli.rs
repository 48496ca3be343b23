use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Scratch directory with an image, a silent WAV of the requested length, and room for configs.
struct Scene {
    dir: TempDir,
    image: PathBuf,
    audio: PathBuf,
}

impl Scene {
    fn new(audio_seconds: u32) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("cover.png");
        let audio = dir.path().join("episode.wav");
        std::fs::write(&image, b"not really a png")?;
        write_wav(&audio, audio_seconds)?;
        Ok(Self { dir, image, audio })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn payload(&self, doc: Value) -> anyhow::Result<PathBuf> {
        let path = self.path("payload.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&doc)?)?;
        Ok(path)
    }

    fn config(&self, yaml: &str) -> anyhow::Result<PathBuf> {
        let path = self.path("config.yaml");
        std::fs::write(&path, yaml)?;
        Ok(path)
    }

    fn fixture_config(&self, payload: &Path, extra: &str) -> anyhow::Result<PathBuf> {
        let yaml = format!(
            "provider:\n  kind: fixture\n  payload: {}\noutput:\n  path: {}\n{extra}",
            payload.display(),
            self.path("transcript.txt").display(),
        );
        self.config(&yaml)
    }

    fn cmd(&self, config: &Path) -> anyhow::Result<Command> {
        let mut cmd = Command::cargo_bin("synccraft")?;
        cmd.arg(&self.image)
            .arg(&self.audio)
            .arg("--config")
            .arg(config)
            .env_remove("SYNCCRAFT_LOG");
        Ok(cmd)
    }
}

fn write_wav(path: &Path, seconds: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..seconds * spec.sample_rate {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn writes_fixture_transcript() -> anyhow::Result<()> {
    let scene = Scene::new(5)?;
    let payload = scene.payload(json!({ "transcript": "hello from the fixture" }))?;
    let config = scene.fixture_config(&payload, "")?;

    scene
        .cmd(&config)?
        .assert()
        .success()
        .stdout(predicate::str::contains("SyncCraft execution summary"))
        .stdout(predicate::str::contains("provider: fixture"))
        .stdout(predicate::str::contains("progress: loaded"))
        .stdout(predicate::str::contains("progress: saved - transcript saved to"));

    assert_eq!(
        std::fs::read_to_string(scene.path("transcript.txt"))?,
        "hello from the fixture\n"
    );
    Ok(())
}

#[test]
fn output_flag_overrides_config() -> anyhow::Result<()> {
    let scene = Scene::new(5)?;
    let payload = scene.payload(json!({ "transcript": "overridden" }))?;
    let config = scene.fixture_config(&payload, "")?;
    let target = scene.path("elsewhere").join("t.txt");

    scene
        .cmd(&config)?
        .arg("--output")
        .arg(&target)
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(&target)?, "overridden\n");
    assert!(!scene.path("transcript.txt").exists());
    Ok(())
}

#[test]
fn stop_policy_exits_with_processing_code() -> anyhow::Result<()> {
    let scene = Scene::new(90)?;
    let payload = scene.payload(json!({
        "chunks": [
            { "index": 0, "transcript": "first" },
            { "index": 1, "error": "simulated outage" },
            { "index": 2, "transcript": "third" }
        ]
    }))?;
    let config = scene.fixture_config(&payload, "audio:\n  chunk_seconds: 30\n")?;

    scene
        .cmd(&config)?
        .assert()
        .code(5)
        .stderr(predicate::str::contains("failed at chunk index 1"))
        .stderr(predicate::str::contains("how-to-fix:"));

    assert!(!scene.path("transcript.txt").exists());
    Ok(())
}

#[test]
fn continue_policy_writes_partial_transcript_and_chunk_files() -> anyhow::Result<()> {
    let scene = Scene::new(90)?;
    let payload = scene.payload(json!({
        "chunks": [
            { "index": 0, "transcript": "first" },
            { "index": 1, "error": "simulated outage" },
            { "index": 2, "transcript": "third" }
        ]
    }))?;
    let config = scene.fixture_config(
        &payload,
        "audio:\n  chunk_seconds: 30\n  on_chunk_failure: continue\n",
    )?;

    scene
        .cmd(&config)?
        .arg("--chunk-template")
        .arg("{audio_basename}_{index:03d}.txt")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 chunk(s) failed"));

    assert_eq!(
        std::fs::read_to_string(scene.path("transcript.txt"))?,
        "first third\n"
    );
    assert_eq!(
        std::fs::read_to_string(scene.path("episode_000.txt"))?,
        "first\n"
    );
    assert_eq!(
        std::fs::read_to_string(scene.path("episode_002.txt"))?,
        "third\n"
    );
    assert!(!scene.path("episode_001.txt").exists());
    Ok(())
}

#[test]
fn on_chunk_failure_flag_overrides_config() -> anyhow::Result<()> {
    let scene = Scene::new(60)?;
    let payload = scene.payload(json!({
        "chunks": [
            { "index": 0, "error": "nope" },
            { "index": 1, "transcript": "second" }
        ]
    }))?;
    let config = scene.fixture_config(&payload, "audio:\n  chunk_seconds: 30\n")?;

    scene
        .cmd(&config)?
        .args(["--on-chunk-failure", "continue"])
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(scene.path("transcript.txt"))?,
        "second\n"
    );
    Ok(())
}

#[test]
fn bad_flag_values_get_a_three_part_report() -> anyhow::Result<()> {
    let scene = Scene::new(60)?;
    let payload = scene.payload(json!({ "transcript": "unused" }))?;
    let config = scene.fixture_config(&payload, "")?;

    scene
        .cmd(&config)?
        .args(["--on-chunk-failure", "explode"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains(
            "what: on_chunk_failure must be one of: continue, stop.",
        ))
        .stderr(predicate::str::contains("how-to-fix:"));

    scene
        .cmd(&config)?
        .args(["--chunk-seconds", "thirty"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("what: --chunk-seconds must be an integer"));

    scene
        .cmd(&config)?
        .args(["--chunk-seconds", "-5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("audio.chunk_seconds must be positive"));

    assert!(!scene.path("transcript.txt").exists());
    Ok(())
}

#[test]
fn missing_config_exits_with_config_code() -> anyhow::Result<()> {
    let scene = Scene::new(1)?;

    scene
        .cmd(&scene.path("absent.yaml"))?
        .assert()
        .code(2)
        .stderr(predicate::str::contains("what: config file not found"));
    Ok(())
}

#[test]
fn unknown_config_key_exits_with_config_code() -> anyhow::Result<()> {
    let scene = Scene::new(1)?;
    let config = scene.config("output:\n  path: out.txt\n  colour: blue\n")?;

    scene.cmd(&config)?.assert().code(2);
    Ok(())
}

#[test]
fn missing_audio_exits_with_validation_code() -> anyhow::Result<()> {
    let scene = Scene::new(1)?;
    let payload = scene.payload(json!({ "transcript": "unused" }))?;
    let config = scene.fixture_config(&payload, "")?;
    std::fs::remove_file(&scene.audio)?;

    scene
        .cmd(&config)?
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn long_audio_without_chunking_fails_preflight() -> anyhow::Result<()> {
    let scene = Scene::new(61)?;
    let payload = scene.payload(json!({ "transcript": "unused", "max_audio_seconds": 60 }))?;
    let config = scene.fixture_config(&payload, "")?;

    scene
        .cmd(&config)?
        .assert()
        .code(3)
        .stderr(predicate::str::contains("exceeds provider limit"))
        .stderr(predicate::str::contains("chunk_seconds"));

    assert!(!scene.path("transcript.txt").exists());
    Ok(())
}

#[test]
fn unsafe_chunk_template_is_rejected_before_processing() -> anyhow::Result<()> {
    let scene = Scene::new(60)?;
    let payload = scene.payload(json!({ "transcript": "unused" }))?;
    let config = scene.fixture_config(&payload, "audio:\n  chunk_seconds: 30\n")?;

    scene
        .cmd(&config)?
        .args(["--chunk-template", "../{index}.txt"])
        .assert()
        .code(2);

    assert!(!scene.path("transcript.txt").exists());
    Ok(())
}

#[test]
fn dry_run_validates_without_writing() -> anyhow::Result<()> {
    let scene = Scene::new(5)?;
    let payload = scene.payload(json!({ "transcript": "unused" }))?;
    let config = scene.fixture_config(&payload, "")?;

    scene
        .cmd(&config)?
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("provider_payload:"))
        .stdout(predicate::str::contains("progress: loaded"))
        .stdout(predicate::str::contains("progress: saved").not());

    assert!(!scene.path("transcript.txt").exists());
    Ok(())
}

#[test]
fn passthrough_provider_labels_chunks_and_redacts_secrets() -> anyhow::Result<()> {
    let scene = Scene::new(45)?;
    let config = scene.config(&format!(
        "provider:\n  kind: passthrough\n  params:\n    api_key: hunter2\n    request_id: req-cli-7\naudio:\n  chunk_seconds: 30\noutput:\n  path: {}\n",
        scene.path("transcript.txt").display()
    ))?;

    scene
        .cmd(&config)?
        .arg("--debug")
        .assert()
        .success()
        .stderr(predicate::str::contains("hunter2").not())
        .stderr(predicate::str::contains("***REDACTED***"))
        .stderr(predicate::str::contains("req-cli-7"))
        .stderr(predicate::str::contains(
            "provider.params.api_key looks like a secret",
        ));

    assert_eq!(
        std::fs::read_to_string(scene.path("transcript.txt"))?,
        "[episode 0s-30s] [episode 30s-45s]\n"
    );
    Ok(())
}

#[test]
fn prints_version() -> anyhow::Result<()> {
    Command::cargo_bin("synccraft")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}
