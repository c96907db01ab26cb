mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use std::fs;

const EPS: f64 = 1e-6;

#[test]
fn test_timeline_reports_each_slide() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;

    let output = utils::run_slidecast_command(&env, &["--output", "json", "timeline", "deck.toml"])?;
    assert_eq!(output.exit_code, 0, "timeline failed: {}", output.stderr);

    let events = output.json_events();
    let slides: Vec<&serde_json::Value> = events
        .iter()
        .filter(|event| event["code"] == "narration.timeline.slide")
        .collect();
    assert_eq!(slides.len(), 3);

    let totals: Vec<f64> = slides
        .iter()
        .map(|event| event["data"]["total_duration"].as_f64().unwrap())
        .collect();
    assert!((totals[0] - 4.5).abs() < EPS);
    assert!((totals[1] - 2.5).abs() < EPS);
    assert!((totals[2] - 3.0).abs() < EPS);
    assert_eq!(slides[1]["data"]["fallback"], true);

    // Fallback and silence warnings go to stderr
    assert!(output.stderr.contains("narration.timeline.audio_fallback"));
    assert!(output.stderr.contains("narration.timeline.no_audio"));
    Ok(())
}

#[test]
fn test_translated_language_switches_timing() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;

    let output = utils::run_slidecast_command(
        &env,
        &["--output", "json", "timeline", "deck.toml", "--language", "translated"],
    )?;
    assert_eq!(output.exit_code, 0, "timeline failed: {}", output.stderr);

    let events = output.json_events();
    let first = events
        .iter()
        .find(|event| event["code"] == "narration.timeline.slide")
        .unwrap();
    // Slide 1 only has primary audio, so it falls back to it
    assert_eq!(first["data"]["fallback"], true);
    assert!((first["data"]["total_duration"].as_f64().unwrap() - 4.5).abs() < EPS);
    Ok(())
}

#[test]
fn test_subtitles_are_written_and_pass_check() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;

    let output = utils::run_slidecast_command(&env, &["subtitles", "deck.toml"])?;
    assert_eq!(output.exit_code, 0, "subtitles failed: {}", output.stderr);

    let srt = fs::read_to_string(env.path().join("deck.srt"))?;
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:04,500\nBem-vindo ao curso."));
    assert!(srt.contains("3\n00:00:07,000 --> 00:00:10,000\nA silent slide.\n"));

    let output = utils::run_slidecast_command(&env, &["check", "deck.srt", "--line-width", "60"])?;
    assert_eq!(output.exit_code, 0, "check failed: {}", output.stderr);
    assert!(output.stdout.contains("is valid: 3 cues"));

    // Existing output needs --force
    let output = utils::run_slidecast_command(&env, &["subtitles", "deck.toml"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("--force"));

    let output = utils::run_slidecast_command(
        &env,
        &["subtitles", "deck.toml", "--text", "original", "--force"],
    )?;
    assert_eq!(output.exit_code, 0, "subtitles failed: {}", output.stderr);
    let srt = fs::read_to_string(env.path().join("deck.srt"))?;
    assert!(srt.contains("Welcome to the course."));
    Ok(())
}

#[test]
fn test_failed_forced_run_keeps_existing_output() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_file("deck.srt", "1\n00:00:00,000 --> 00:00:01,000\nOld cue\n")?;
    env.write_file("deck.frames.json", "{}")?;
    env.write_file(
        "deck.toml",
        r#"
[[slides]]
index = 0
text = "Slide numbers start at one."
"#,
    )?;

    let output = utils::run_slidecast_command(&env, &["subtitles", "deck.toml", "--force"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("slide index 0"));
    assert_eq!(
        fs::read_to_string(env.path().join("deck.srt"))?,
        "1\n00:00:00,000 --> 00:00:01,000\nOld cue\n"
    );

    let output = utils::run_slidecast_command(&env, &["frames", "deck.toml", "--force"])?;
    assert_eq!(output.exit_code, 1);
    assert_eq!(fs::read_to_string(env.path().join("deck.frames.json"))?, "{}");
    Ok(())
}

#[test]
fn test_ass_karaoke_track() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;

    let output = utils::run_slidecast_command(
        &env,
        &["subtitles", "deck.toml", "--format", "ass", "-o", "out/deck.ass"],
    )?;
    assert_eq!(output.exit_code, 0, "subtitles failed: {}", output.stderr);

    let ass = fs::read_to_string(env.path().join("out/deck.ass"))?;
    assert!(ass.contains("[Script Info]"));
    assert!(ass.contains("PlayResX: 1920"));
    assert!(ass.contains("[Events]"));
    assert!(ass.matches("Dialogue:").count() >= 3);
    Ok(())
}

#[test]
fn test_frame_plan_conserves_slide_durations() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;

    let output = utils::run_slidecast_command(&env, &["frames", "deck.toml"])?;
    assert_eq!(output.exit_code, 0, "frames failed: {}", output.stderr);

    let plan: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.path().join("deck.frames.json"))?)?;
    assert_eq!(plan["mode"], "karaoke");
    assert!((plan["total_duration"].as_f64().unwrap() - 10.0).abs() < EPS);

    let slides = plan["slides"].as_array().unwrap();
    assert_eq!(slides.len(), 3);
    for (slide, expected) in slides.iter().zip([4.5, 2.5, 3.0]) {
        let frames = slide["frames"].as_array().unwrap();
        let sum: f64 = frames
            .iter()
            .map(|frame| frame["duration"].as_f64().unwrap())
            .sum();
        assert!((sum - expected).abs() < EPS);
        assert!(frames.iter().skip(1).all(|frame| frame.get("audio").is_none()));
    }
    assert!(slides[0]["frames"][0]["audio"].as_str().unwrap().ends_with("slide_1.mp3"));
    assert!(slides[2]["frames"][0].get("audio").is_none());
    assert!(
        slides[0]["frames"][0]["content"]["slide_image"]
            .as_str()
            .unwrap()
            .ends_with("slides/slide_1.png")
    );
    Ok(())
}

#[test]
fn test_plain_mode_has_one_frame_per_slide() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;

    let output = utils::run_slidecast_command(
        &env,
        &["frames", "deck.toml", "--mode", "plain", "-o", "plain.json"],
    )?;
    assert_eq!(output.exit_code, 0, "frames failed: {}", output.stderr);

    let plan: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.path().join("plain.json"))?)?;
    assert_eq!(plan["mode"], "plain");
    for slide in plan["slides"].as_array().unwrap() {
        let frames = slide["frames"].as_array().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0]["content"].get("caption").is_none());
    }
    Ok(())
}

#[test]
fn test_presentation_export_times_words_to_audio() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;

    let output = utils::run_slidecast_command(&env, &["export", "deck.toml"])?;
    assert_eq!(output.exit_code, 0, "export failed: {}", output.stderr);

    let presentation: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.path().join("deck.presentation.json"))?)?;
    assert_eq!(presentation["title"], "deck");
    assert!((presentation["total_duration"].as_f64().unwrap() - 10.0).abs() < EPS);

    let slides = presentation["slides"].as_array().unwrap();
    assert_eq!(slides.len(), 3);
    assert!((slides[2]["start"].as_f64().unwrap() - 7.0).abs() < EPS);
    assert!(slides[0]["image"].as_str().unwrap().ends_with("slides/slide_1.png"));
    assert!(slides[0]["audio"]["original"].as_str().unwrap().ends_with("slide_1.mp3"));
    assert!(slides[1]["audio"]["translated"].as_str().unwrap().ends_with("slide_2_en.mp3"));

    // Words follow the recorded 4s, not the speaking-rate estimate
    let words = slides[0]["words"].as_array().unwrap();
    assert_eq!(words.len(), 13);
    assert!((words[12]["end"].as_f64().unwrap() - 4.0).abs() < EPS);
    assert!((slides[0]["estimated_duration"].as_f64().unwrap() - 5.2).abs() < EPS);

    let output = utils::run_slidecast_command(&env, &["export", "deck.toml", "--text", "translated"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("--force"));
    Ok(())
}

#[test]
fn test_check_rejects_overlapping_track() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_file(
        "broken.srt",
        "1\n00:00:00,000 --> 00:00:03,000\nOne\n\n2\n00:00:02,000 --> 00:00:01,000\nTwo\n",
    )?;

    let output = utils::run_slidecast_command(&env, &["check", "broken.srt"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("ends before it starts"));
    assert!(output.stderr.contains("before the previous cue ends"));
    Ok(())
}

#[test]
fn test_config_init_show_and_path() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_slidecast_command(&env, &["config", "path"])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("narration.toml"));

    let output = utils::run_slidecast_command(&env, &["config", "init"])?;
    assert_eq!(output.exit_code, 0, "init failed: {}", output.stderr);
    assert!(env.config_path().exists());

    let output = utils::run_slidecast_command(&env, &["config", "init"])?;
    assert_eq!(output.exit_code, 1);

    let output = utils::run_slidecast_command(&env, &["config", "show"])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("extra_padding_seconds = 0.5  #"));
    assert!(output.stdout.contains("frame_mode = \"karaoke\"  #"));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_deck()?;
    fs::write(env.config_path(), "minimum_duration_seconds = 0.0\n")?;

    let output = utils::run_slidecast_command(&env, &["timeline", "deck.toml"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("minimum_duration_seconds"));
    Ok(())
}
