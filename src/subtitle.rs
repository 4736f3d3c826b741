//! Subtitle document handling.
//!
//! The alignment pipeline writes start/end timestamps into
//! [`SubtitleLine`] values held by a [`SubtitleDocument`]. The document is
//! deliberately minimal — lines with timing and text, loaded from and saved
//! to SubRip (`.srt`) files — and is committed exactly once by the caller
//! after an alignment run, not once per request.
//!
//! # Example
//!
//! ```
//! use subalign::subtitle::SubtitleDocument;
//!
//! let doc = SubtitleDocument::parse_srt(
//!     "1\n00:00:01,000 --> 00:00:02,500\nHello\n",
//! ).unwrap();
//! assert_eq!(doc.lines.len(), 1);
//! assert_eq!(doc.lines[0].text, "Hello");
//! ```

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::error::AlignError;

/// A single subtitle line with timing and text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleLine {
    /// When this line starts displaying.
    pub start: Duration,
    /// When this line stops displaying (exclusive).
    pub end: Duration,
    /// The text content of the line.
    pub text: String,
}

/// An ordered collection of subtitle lines.
#[derive(Debug, Clone, Default)]
pub struct SubtitleDocument {
    /// The lines, in file order.
    pub lines: Vec<SubtitleLine>,
}

impl SubtitleDocument {
    /// Parse a SubRip document from text.
    ///
    /// Accepts the common loose variants: optional numeric counters, CRLF
    /// or LF line endings, and blank-line separated cues with multi-line
    /// text.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::SubtitleParse`] when a cue's timing line is
    /// malformed.
    pub fn parse_srt(content: &str) -> Result<Self, AlignError> {
        let mut lines = Vec::new();
        let mut source = content.lines().enumerate().peekable();

        while let Some((number, raw)) = source.next() {
            let trimmed = raw.trim_start_matches('\u{feff}').trim();
            if trimmed.is_empty() {
                continue;
            }

            // An optional cue counter precedes the timing line.
            let timing = if trimmed.contains("-->") {
                trimmed.to_string()
            } else {
                if trimmed.parse::<u64>().is_err() {
                    return Err(AlignError::SubtitleParse {
                        line: number + 1,
                        reason: format!("expected cue counter or timing, got {trimmed:?}"),
                    });
                }
                match source.next() {
                    Some((_, timing_raw)) if timing_raw.contains("-->") => {
                        timing_raw.trim().to_string()
                    }
                    _ => {
                        return Err(AlignError::SubtitleParse {
                            line: number + 2,
                            reason: "expected a timing line after the cue counter".into(),
                        });
                    }
                }
            };

            let (start_text, end_text) =
                timing
                    .split_once("-->")
                    .ok_or_else(|| AlignError::SubtitleParse {
                        line: number + 1,
                        reason: "missing --> separator".into(),
                    })?;
            let start = parse_srt_timestamp(start_text).ok_or_else(|| {
                AlignError::SubtitleParse {
                    line: number + 1,
                    reason: format!("invalid start timestamp {:?}", start_text.trim()),
                }
            })?;
            let end =
                parse_srt_timestamp(end_text).ok_or_else(|| AlignError::SubtitleParse {
                    line: number + 1,
                    reason: format!("invalid end timestamp {:?}", end_text.trim()),
                })?;

            let mut text_parts: Vec<&str> = Vec::new();
            while let Some((_, text_raw)) = source.peek() {
                if text_raw.trim().is_empty() {
                    source.next();
                    break;
                }
                text_parts.push(text_raw.trim_end());
                source.next();
            }

            lines.push(SubtitleLine {
                start,
                end,
                text: text_parts.join("\n"),
            });
        }

        Ok(Self { lines })
    }

    /// Read and parse a SubRip file.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from reading the file and parse errors from
    /// [`parse_srt`](SubtitleDocument::parse_srt).
    pub fn load_srt<P: AsRef<Path>>(path: P) -> Result<Self, AlignError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_srt(&content)
    }

    /// Format the document as SubRip text.
    pub fn to_srt(&self) -> String {
        let mut output = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            writeln!(output, "{}", i + 1).unwrap();
            writeln!(
                output,
                "{} --> {}",
                format_srt_timestamp(line.start),
                format_srt_timestamp(line.end),
            )
            .unwrap();
            writeln!(output, "{}", line.text).unwrap();
            writeln!(output).unwrap();
        }
        String::from_utf8(output).unwrap_or_default()
    }

    /// Write the document to a SubRip file.
    ///
    /// This is the single commit point after an alignment run.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from writing the file.
    pub fn save_srt<P: AsRef<Path>>(&self, path: P) -> Result<(), AlignError> {
        std::fs::write(path, self.to_srt())?;
        Ok(())
    }
}

/// Format a duration as an SRT timestamp (HH:MM:SS,mmm).
fn format_srt_timestamp(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = duration.subsec_millis();
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Parse an SRT timestamp (HH:MM:SS,mmm — a `.` decimal separator is
/// tolerated).
fn parse_srt_timestamp(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (clock, millis_text) = text
        .split_once(',')
        .or_else(|| text.split_once('.'))
        .unwrap_or((text, "0"));

    let mut parts = clock.split(':').rev();
    let seconds: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.trim().parse().ok()?;
    let hours: u64 = match parts.next() {
        Some(h) => h.trim().parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || seconds >= 60 || minutes >= 60 {
        return None;
    }

    let millis_text = millis_text.trim();
    let millis: u64 = millis_text.parse().ok()?;
    // Two-digit fractions ("12" = 120 ms) show up in loosely written files.
    let millis = match millis_text.len() {
        1 => millis * 100,
        2 => millis * 10,
        _ => millis,
    };

    Some(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
    ))
}
