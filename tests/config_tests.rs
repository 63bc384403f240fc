// Unit tests for file configuration loading

use anyhow::Result;
use voice_live::Config;

#[test]
fn test_load_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("voice-live.toml");
    std::fs::write(
        &path,
        r#"
[service]
model = "gemini-test-model"
api_key = "file-key"

[audio]
capture_sample_rate = 16000
playback_sample_rate = 24000
frame_samples = 2048

[live]
voice = "Puck"
system_instruction = "be brief"
transcribe_input = true
transcribe_output = false
"#,
    )?;

    let cfg = Config::load(path.to_str().unwrap())?;
    let session = cfg.session_config();

    assert_eq!(session.model, "gemini-test-model");
    assert_eq!(session.api_key, "file-key");
    assert_eq!(session.frame_samples, 2048);
    assert_eq!(session.live.voice, "Puck");
    assert_eq!(session.live.system_instruction, "be brief");
    assert!(!session.live.transcribe_output);

    Ok(())
}

#[test]
fn test_missing_file_falls_back_to_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("does-not-exist");

    let cfg = Config::load(path.to_str().unwrap())?;
    let session = cfg.session_config();

    assert_eq!(session.capture_sample_rate, 16000);
    assert_eq!(session.playback_sample_rate, 24000);
    assert_eq!(session.frame_samples, 4096);
    assert_eq!(session.live.voice, "Kore");

    Ok(())
}

#[test]
fn test_partial_file_keeps_section_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("voice-live.toml");
    std::fs::write(&path, "[service]\nmodel = \"other-model\"\n")?;

    let cfg = Config::load(path.to_str().unwrap())?;
    let session = cfg.session_config();

    assert_eq!(session.model, "other-model");
    assert_eq!(session.frame_samples, 4096, "absent audio section uses defaults");

    Ok(())
}

#[test]
fn test_session_ids_are_unique() {
    let cfg = Config::load("no-such-config").unwrap();
    let a = cfg.session_config();
    let b = cfg.session_config();
    assert_ne!(a.session_id, b.session_id);
}
