/*!
 * Tests for the controller file pipelines
 */

use anyhow::Result;
use std::fs;
use std::sync::atomic::Ordering;

use quill_captions::app_config::Config;
use quill_captions::app_controller::{Controller, describe_frame, load_pages, pages_from_srt_file};
use quill_captions::errors::CaptionError;
use quill_captions::file_utils::FileManager;
use quill_captions::pages::{Page, PageOptions};

use crate::common::{self, MockTranscriber};

fn controller() -> Result<Controller> {
    Controller::with_config(Config::default())
}

#[test]
fn test_withConfig_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.engine.timeout_secs = 0;
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_processSubtitleFile_shouldWritePagesJson() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let out_dir = temp_dir.path().join("out");

    let written = controller()?.process_subtitle_file(&input, &out_dir, false)?;

    let path = written.expect("output written");
    assert_eq!(path, out_dir.join("talk.pages.json"));
    let pages: Vec<Page> = serde_json::from_value(FileManager::read_json(&path)?)?;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].text(), "hello world");
    Ok(())
}

#[test]
fn test_processSubtitleFile_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let input = common::create_test_subtitle(dir, "talk.srt")?;
    let existing = common::create_test_file(dir, "talk.pages.json", "[]")?;
    let controller = controller()?;

    assert_eq!(controller.process_subtitle_file(&input, dir, false)?, None);
    assert_eq!(fs::read_to_string(&existing)?, "[]");

    assert_eq!(controller.process_subtitle_file(&input, dir, true)?, Some(existing.clone()));
    assert_ne!(fs::read_to_string(&existing)?, "[]");
    Ok(())
}

#[test]
fn test_processSubtitleFile_withUnorderedDocument_shouldReportCaptionError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "bad.srt",
        "1\n00:00:05,000 --> 00:00:06,000\nlate\n\n2\n00:00:01,000 --> 00:00:02,000\nearly\n",
    )?;

    let err = controller()?
        .process_subtitle_file(&input, temp_dir.path(), false)
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CaptionError>(),
        Some(CaptionError::UnorderedInput { index: 2, .. })
    ));
    Ok(())
}

#[test]
fn test_processTranscriptionFile_shouldWriteSrtAndPages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let input = dir.join("talk.json");
    FileManager::write_json(&input, &common::whisper_output())?;

    let srt_file = controller()?
        .process_transcription_file(&input, dir, false)?
        .expect("output written");

    let srt = fs::read_to_string(&srt_file)?;
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:00,600\nhello\n"));
    let pages = load_pages(dir.join("talk.pages.json"))?;
    assert_eq!(pages.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_transcribeMedia_withMockEngine_shouldCheckReadinessAndWrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let media = common::create_test_file(dir, "talk.wav", "RIFF")?;
    let engine = MockTranscriber::new(common::whisper_output());

    let srt_file = controller()?
        .transcribe_media(&engine, &media, dir, false)
        .await?
        .expect("output written");

    assert_eq!(srt_file, dir.join("talk.srt"));
    assert!(dir.join("talk.pages.json").exists());
    assert_eq!(engine.ready_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.transcribe_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_transcribeMedia_withSilentOutput_shouldFailEmpty() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let media = common::create_test_file(temp_dir.path(), "quiet.wav", "RIFF")?;
    let engine = MockTranscriber::new(serde_json::json!({ "transcription": [] }));

    let err = controller()?
        .transcribe_media(&engine, &media, temp_dir.path(), false)
        .await
        .unwrap_err();

    assert_eq!(err.downcast_ref::<CaptionError>(), Some(&CaptionError::EmptyTranscription));
    assert!(!temp_dir.path().join("quiet.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_runFolder_shouldProcessSubtitlesAndTranscriptions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let nested = dir.join("season1");
    FileManager::ensure_dir(&nested)?;
    common::create_test_subtitle(dir, "a.srt")?;
    common::create_test_subtitle(&nested, "b.srt")?;
    FileManager::write_json(nested.join("c.json"), &common::whisper_output())?;
    common::create_test_file(dir, "broken.srt", "1\nnot a timing line\ntext\n")?;

    let controller = controller()?;
    let processed = controller.run_folder(dir.to_path_buf(), false).await?;

    assert_eq!(processed, 3);
    assert!(dir.join("a.pages.json").exists());
    assert!(nested.join("b.pages.json").exists());
    assert!(nested.join("c.srt").exists());
    assert!(!dir.join("broken.pages.json").exists());

    // Written page files are not picked up as inputs on a second pass
    assert_eq!(controller.run_folder(dir.to_path_buf(), false).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withPageFile_shouldRefuse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "x.pages.json", "[]")?;

    let result = controller()?
        .run(input, temp_dir.path().to_path_buf(), false)
        .await;

    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_loadPages_withOverlappingPages_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "overlap.pages.json",
        r#"[
            {"tokens":[{"text":"a","fromMs":0,"toMs":500}],"startMs":0,"durationMs":500},
            {"tokens":[{"text":"b","fromMs":400,"toMs":900}],"startMs":400,"durationMs":500}
        ]"#,
    )?;

    let err = load_pages(&path).unwrap_err();
    assert!(err.to_string().contains("overlap"));
    Ok(())
}

#[test]
fn test_loadPages_withInconsistentPages_shouldNamePageInsteadOfPanicking() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let good = r#"{"tokens":[{"text":"ok","fromMs":0,"toMs":100}],"startMs":0,"durationMs":100}"#;
    let cases = [
        ("no tokens", r#"{"tokens":[],"startMs":200,"durationMs":100}"#),
        ("inverted token", r#"{"tokens":[{"text":"hi","fromMs":500,"toMs":100}],"startMs":500,"durationMs":0}"#),
        ("start mismatch", r#"{"tokens":[{"text":"hi","fromMs":500,"toMs":600}],"startMs":200,"durationMs":400}"#),
        ("end mismatch", r#"{"tokens":[{"text":"hi","fromMs":500,"toMs":600}],"startMs":500,"durationMs":1000}"#),
        ("overlapping tokens", r#"{"tokens":[{"text":"a","fromMs":500,"toMs":700},{"text":"b","fromMs":600,"toMs":800}],"startMs":500,"durationMs":300}"#),
        ("overflowing duration", r#"{"tokens":[{"text":"hi","fromMs":500,"toMs":600}],"startMs":500,"durationMs":18446744073709551615}"#),
    ];

    for (name, bad) in cases {
        let path = common::create_test_file(temp_dir.path(), "bad.pages.json", &format!("[{},{}]", good, bad))?;

        let err = load_pages(&path).expect_err(name);
        assert!(err.to_string().contains("Page 2"), "{}: {}", name, err);
    }
    Ok(())
}

#[test]
fn test_loadPages_withSynthesizedPages_shouldAccept() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let written = controller()?
        .process_subtitle_file(&input, temp_dir.path(), false)?
        .expect("output written");

    assert_eq!(load_pages(&written)?.len(), 2);
    Ok(())
}

#[test]
fn test_folderInputs_shouldSkipIgnoredConfigFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let config_path = dir.join("quill.json");
    Config::default().save(&config_path)?;
    let srt = common::create_test_subtitle(dir, "a.srt")?;
    let transcription = dir.join("b.json");
    FileManager::write_json(&transcription, &common::whisper_output())?;

    let plain = controller()?;
    assert!(plain.folder_inputs(dir)?.contains(&config_path));

    let controller = controller()?.ignoring(&config_path);
    let inputs = controller.folder_inputs(dir)?;
    assert_eq!(inputs.len(), 2);
    assert!(inputs.contains(&srt));
    assert!(inputs.contains(&transcription));
    assert!(!inputs.contains(&config_path));
    Ok(())
}

#[tokio::test]
async fn test_runFolder_withIgnoredConfig_shouldLeaveItUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let config_path = dir.join("quill.json");
    Config::default().save(&config_path)?;
    common::create_test_subtitle(dir, "a.srt")?;

    let processed = controller()?.ignoring(&config_path).run_folder(dir.to_path_buf(), false).await?;

    assert_eq!(processed, 1);
    assert!(!dir.join("quill.srt").exists());
    assert!(!dir.join("quill.pages.json").exists());
    Ok(())
}

#[test]
fn test_describeFrame_shouldShowPageAndProgress() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let pages = pages_from_srt_file(&input, &PageOptions::default())?;

    let shown = describe_frame(&pages, 900);
    assert!(shown.starts_with("00:00:00,900: page 1 of 2"));
    assert!(shown.contains("hello (100%)"));
    assert!(shown.contains("world (50%)"));

    assert_eq!(describe_frame(&pages, 1300), "00:00:01,300: no active page");
    Ok(())
}
