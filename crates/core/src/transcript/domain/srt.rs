use std::fmt::Write;

use super::segment::Segment;

/// Formats seconds as an SRT timestamp, `HH:MM:SS,mmm`. Every field is
/// truncated, never rounded.
pub fn format_timestamp(seconds: f64) -> String {
    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let millis = ((seconds % 1.0) * 1000.0).floor() as u64;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Serializes segments as SubRip blocks, each terminated by a blank line.
pub fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_timestamp(segment.start()),
            format_timestamp(segment.end())
        );
        match segment.speaker_id() {
            Some(id) => {
                let _ = writeln!(out, "[{id}] {}", segment.text().trim());
            }
            None => {
                let _ = writeln!(out, "{}", segment.text().trim());
            }
        }
        out.push('\n');
    }
    out
}
