// Integration tests for recording persistence
//
// AudioFileWriter mirrors the format of the first frame, absorbs write
// failures, and always leaves a readable file behind on finish.

use anyhow::Result;
use speech_session::audio::{AudioFileWriter, AudioFrame};

fn frame(sample_rate: u32, channels: u16, samples: Vec<i16>) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate,
        channels,
        timestamp_ms: 0,
    }
}

#[test]
fn test_writer_mirrors_input_format() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let output = dir.path().join("stereo.wav");

    let mut writer = AudioFileWriter::new(Some(output.clone()), dir.path());
    assert!(!output.exists(), "File is created on the first frame");

    writer.write_frame(&frame(48000, 2, vec![1, -1, 2, -2]));
    writer.write_frame(&frame(48000, 2, vec![3, -3]));
    assert_eq!(writer.frames_written(), 2);

    let path = writer.finish()?;
    assert_eq!(path, output);

    let mut reader = hound::WavReader::open(&path)?;
    assert_eq!(reader.spec().sample_rate, 48000);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().bits_per_sample, 16);
    let samples: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(samples, vec![1, -1, 2, -2, 3, -3]);
    Ok(())
}

#[test]
fn test_writer_counts_mismatched_frames_as_failures() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let output = dir.path().join("mixed.wav");

    let mut writer = AudioFileWriter::new(Some(output.clone()), dir.path());
    writer.write_frame(&frame(16000, 1, vec![5; 10]));
    writer.write_frame(&frame(44100, 1, vec![6; 10]));
    writer.write_frame(&frame(16000, 1, vec![7; 10]));

    assert_eq!(writer.frames_written(), 2);
    assert_eq!(writer.write_failures(), 1);

    writer.finish()?;
    let reader = hound::WavReader::open(&output)?;
    assert_eq!(reader.len(), 20);
    Ok(())
}

#[test]
fn test_writer_generates_name_in_default_dir() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let recordings = dir.path().join("recordings");

    let mut writer = AudioFileWriter::new(None, &recordings);
    let path = writer.path().to_path_buf();
    assert!(path.starts_with(&recordings));

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    assert!(name.starts_with("recording-"));
    assert!(name.ends_with(".wav"));

    writer.write_frame(&frame(16000, 1, vec![0; 160]));
    writer.finish()?;
    assert!(path.exists(), "Missing directories are created");
    Ok(())
}

#[test]
fn test_writer_without_frames_writes_empty_file() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let output = dir.path().join("empty.wav");

    let writer = AudioFileWriter::new(Some(output.clone()), dir.path()).with_fallback_sample_rate(22050);
    writer.finish()?;

    let reader = hound::WavReader::open(&output)?;
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 0);
    Ok(())
}

#[test]
fn test_writer_unwritable_destination_is_absorbed() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    // A regular file where a directory is expected
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x")?;

    let mut writer = AudioFileWriter::new(Some(blocker.join("take.wav")), dir.path());
    writer.write_frame(&frame(16000, 1, vec![1; 10]));
    writer.write_frame(&frame(16000, 1, vec![1; 10]));

    assert_eq!(writer.frames_written(), 0);
    assert_eq!(writer.write_failures(), 2);
    assert!(writer.finish().is_err(), "Closing reports the missing file");
    Ok(())
}

#[test]
fn test_frame_count_per_channel() {
    assert_eq!(frame(16000, 2, vec![0; 6]).frame_count(), 3);
    assert_eq!(frame(16000, 1, vec![0; 6]).frame_count(), 6);
    assert_eq!(frame(16000, 0, vec![0; 6]).frame_count(), 0);
}
