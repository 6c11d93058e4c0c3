use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

fn binary() -> &'static str {
    env!("CARGO_BIN_EXE_vocal_range")
}

fn run(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(binary())
        .args(args)
        .env("VOCAL_RANGE_CONFIG", "/nonexistent/vocal_range.json")
        .output()
        .expect("vocal_range runs");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vocal_range_{}_{}", std::process::id(), name))
}

/// Write `segments` of (frequency, seconds) as a 16-bit mono WAV
fn write_tones(path: &Path, sample_rate: u32, segments: &[(f32, f32)]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &(frequency, seconds) in segments {
        let len = (sample_rate as f32 * seconds) as usize;
        for i in 0..len {
            let sample = (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5;
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
    }
    writer.finalize().unwrap();
}

#[test]
fn note_command_names_frequencies() {
    let (code, stdout, _) = run(&["note", "440", "261.63", "0"]);
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("A4"));
    assert!(lines[1].ends_with("C4"));
    assert!(lines[2].ends_with("--"));
}

#[test]
fn note_command_json() {
    let (code, stdout, _) = run(&["note", "--json", "880"]);
    assert_eq!(code, 0);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json[0]["note"], "A5");
    assert_eq!(json[0]["midi"], 81);
}

#[test]
fn songs_command_matches_range() {
    let (code, stdout, _) = run(&["songs", "--lowest", "55", "--highest", "72", "--json"]);
    assert_eq!(code, 0);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|song| song["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Jupiter", "恋", "TSUNAMI"]);
}

#[test]
fn songs_command_unmeasured_is_empty() {
    let (code, stdout, _) = run(&["songs", "--highest", "72", "--json"]);
    assert_eq!(code, 0);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert!(json.as_array().unwrap().is_empty());
}

#[test]
fn songs_command_rejects_bad_catalog() {
    let path = temp_path("bad_catalog.json");
    std::fs::write(&path, "not json").unwrap();
    let (code, _, stderr) = run(&[
        "songs",
        "--lowest",
        "48",
        "--highest",
        "60",
        "--catalog",
        path.to_str().unwrap(),
    ]);
    let _ = std::fs::remove_file(&path);
    assert_eq!(code, 1);
    assert!(stderr.contains("loading song catalog"));
}

#[test]
fn analyze_command_measures_recording() {
    let path = temp_path("two_tones.wav");
    write_tones(&path, 44_100, &[(220.0, 0.6), (440.0, 0.6)]);

    let (code, stdout, stderr) = run(&["analyze", "--json", "--suggest", path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["report"]["range"]["lowest_note"], "A3");
    assert_eq!(json["report"]["range"]["highest_note"], "A4");
    assert_eq!(json["report"]["range"]["lowest_midi"], 57);
    assert_eq!(json["report"]["range"]["highest_midi"], 69);
    // Only a song spanning exactly A3..A4 fits
    assert_eq!(json["songs"].as_array().unwrap().len(), 1);
    assert_eq!(json["songs"][0]["title"], "恋");
}

#[test]
fn analyze_command_missing_file_fails() {
    let (code, _, stderr) = run(&["analyze", "/nonexistent/take.wav"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Error"));
}
