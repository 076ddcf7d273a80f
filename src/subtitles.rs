//! Textual subtitle dialects.
//!
//! Every backend delivers WebVTT. Recognizers that natively produce SRT go
//! through [`srt_to_vtt`], and timed segments are rendered with [`format_srt`].

use std::fmt::Write;

pub const VTT_HEADER: &str = "WEBVTT\n\n";

/// A recognized span of speech, times in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Convert SRT text to WebVTT.
///
/// Prepends the `WEBVTT` header and turns the millisecond separator of every
/// timestamp from `,` into `.`. Commas in cue text are left alone.
pub fn srt_to_vtt(srt: &str) -> String {
    let mut vtt = String::with_capacity(VTT_HEADER.len() + srt.len());
    vtt.push_str(VTT_HEADER);

    for line in srt.split_inclusive('\n') {
        if line.contains("-->") {
            vtt.push_str(&timing_line_to_vtt(line));
        } else {
            vtt.push_str(line);
        }
    }
    vtt
}

fn timing_line_to_vtt(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let between_digits = i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if c == ',' && between_digits {
                '.'
            } else {
                c
            }
        })
        .collect()
}

/// Render segments as numbered SRT cues.
pub fn format_srt(segments: &[Segment]) -> String {
    let mut srt = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            srt.push('\n');
        }
        // writing to a String cannot fail
        let _ = write!(
            srt,
            "{}\n{} --> {}\n{}\n",
            i + 1,
            srt_timestamp(segment.start),
            srt_timestamp(segment.end),
            segment.text.trim()
        );
    }
    srt
}

/// `HH:MM:SS,mmm`
pub fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_to_vtt_single_block() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";
        let vtt = srt_to_vtt(srt);
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert_eq!(vtt, "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nHello\n");
    }

    #[test]
    fn test_srt_to_vtt_keeps_text_commas() {
        let srt = "1\n00:00:01,000 --> 00:00:02,500\nHello, world\n\n2\n00:01:00,250 --> 01:00:00,000\nOne, two\n";
        let vtt = srt_to_vtt(srt);
        assert_eq!(
            vtt,
            "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.500\nHello, world\n\n2\n00:01:00.250 --> 01:00:00.000\nOne, two\n"
        );
    }

    #[test]
    fn test_srt_to_vtt_empty() {
        assert_eq!(srt_to_vtt(""), "WEBVTT\n\n");
    }

    #[test]
    fn test_srt_timestamp() {
        assert_eq!(srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(srt_timestamp(3723.042), "01:02:03,042");
        assert_eq!(srt_timestamp(-2.0), "00:00:00,000");
    }

    #[test]
    fn test_format_srt() {
        let segments = vec![
            Segment { start: 1.0, end: 2.0, text: " Hello".to_string() },
            Segment { start: 2.0, end: 4.25, text: "again ".to_string() },
        ];
        assert_eq!(
            format_srt(&segments),
            "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:02,000 --> 00:00:04,250\nagain\n"
        );
        assert_eq!(format_srt(&[]), "");
    }
}
