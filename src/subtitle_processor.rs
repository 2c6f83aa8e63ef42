use std::fmt::{self, Write as _};
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::CaptionError;
use crate::file_utils::FileManager;
use crate::timestamp;

// @module: SRT document parsing and writing

const TIMING_ARROW: &str = "-->";

/// A single timed span of subtitle text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedSegment {
    // @field: Subtitle text, lines joined with '\n'
    pub text: String,

    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms
    pub end_ms: u64,
}

impl TimedSegment {
    /// Creates a segment without validating the range
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
        }
    }

    /// Creates a segment, rejecting `end_ms < start_ms`
    pub fn new_validated(index: usize, text: impl Into<String>, start_ms: u64, end_ms: u64) -> Result<Self, CaptionError> {
        if end_ms < start_ms {
            return Err(CaptionError::InvalidRange { index, start_ms, end_ms });
        }
        Ok(Self::new(text, start_ms, end_ms))
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Borrow this segment as an SRT block with the given 1-based index
    pub fn as_srt_block(&self, index: usize) -> SrtBlock<'_> {
        SrtBlock { index, segment: self }
    }
}

/// Display adapter printing one SRT block (without the separating blank line)
pub struct SrtBlock<'a> {
    index: usize,
    segment: &'a TimedSegment,
}

impl fmt::Display for SrtBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(
            f,
            "{} {} {}",
            timestamp::encode(self.segment.start_ms),
            TIMING_ARROW,
            timestamp::encode(self.segment.end_ms)
        )?;
        writeln!(f, "{}", self.segment.text)
    }
}

/// Reject a sequence whose starts decrease or whose ranges are inverted
pub fn check_ordered(segments: &[TimedSegment]) -> Result<(), CaptionError> {
    let mut previous_start: Option<u64> = None;
    for (i, segment) in segments.iter().enumerate() {
        if segment.end_ms < segment.start_ms {
            return Err(CaptionError::InvalidRange {
                index: i + 1,
                start_ms: segment.start_ms,
                end_ms: segment.end_ms,
            });
        }
        if let Some(previous) = previous_start {
            if segment.start_ms < previous {
                return Err(CaptionError::UnorderedInput {
                    index: i + 1,
                    start_ms: segment.start_ms,
                    previous_start_ms: previous,
                });
            }
        }
        previous_start = Some(segment.start_ms);
    }
    Ok(())
}

/// Parse an SRT document into timed segments
///
/// Blocks are separated by blank lines. Each block holds an index line (ignored),
/// a `start --> end` timing line and one or more text lines.
pub fn parse_srt(document: &str) -> Result<Vec<TimedSegment>, CaptionError> {
    let document = document.strip_prefix('\u{feff}').unwrap_or(document);

    let mut segments: Vec<TimedSegment> = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut block_number = 0;

    let mut lines = document.lines().map(|l| l.trim_end_matches('\r')).peekable();
    while lines.peek().is_some() {
        block.clear();
        while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
            block.push(line);
        }
        // skip the blank separator lines
        while lines.next_if(|l| l.trim().is_empty()).is_some() {}

        if block.is_empty() {
            continue;
        }
        block_number += 1;
        let segment = parse_block(block_number, &block)?;

        if let Some(previous) = segments.last() {
            if segment.start_ms < previous.start_ms {
                return Err(CaptionError::UnorderedInput {
                    index: block_number,
                    start_ms: segment.start_ms,
                    previous_start_ms: previous.start_ms,
                });
            }
        }
        segments.push(segment);
    }

    debug!("Parsed {} subtitle blocks", segments.len());
    Ok(segments)
}

fn parse_block(block_number: usize, lines: &[&str]) -> Result<TimedSegment, CaptionError> {
    let malformed = |reason: String| CaptionError::MalformedDocument {
        block: block_number,
        reason,
    };

    // The index line is optional in practice; find the timing line in the first two lines
    let timing_pos = lines
        .iter()
        .take(2)
        .position(|l| l.contains(TIMING_ARROW))
        .ok_or_else(|| malformed("missing timing line".to_string()))?;

    let (start_ms, end_ms) = parse_timing_line(lines[timing_pos])
        .map_err(|e| malformed(e.to_string()))?;

    let text_lines = &lines[timing_pos + 1..];
    if text_lines.is_empty() {
        return Err(malformed("missing subtitle text".to_string()));
    }

    TimedSegment::new_validated(block_number, text_lines.join("\n"), start_ms, end_ms)
}

fn parse_timing_line(line: &str) -> Result<(u64, u64), CaptionError> {
    let (start, rest) = line
        .split_once(TIMING_ARROW)
        .ok_or_else(|| CaptionError::MalformedTimestamp(line.to_string()))?;

    // Some writers append positioning after the end timestamp
    let end = rest.split_whitespace().next().unwrap_or("");

    Ok((timestamp::decode(start)?, timestamp::decode(end)?))
}

/// Serialize segments as an SRT document
///
/// Fails with `MalformedDocument` for a segment whose text could not be read
/// back: empty text, a blank line inside the text, or a carriage return.
pub fn write_srt(segments: &[TimedSegment]) -> Result<String, CaptionError> {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        check_writable_text(i + 1, &segment.text)?;
        if i > 0 {
            out.push('\n');
        }
        // Writing to a String cannot fail
        let _ = write!(out, "{}", segment.as_srt_block(i + 1));
    }
    Ok(out)
}

fn check_writable_text(block: usize, text: &str) -> Result<(), CaptionError> {
    let reason = if text.trim().is_empty() {
        "empty subtitle text"
    } else if text.contains('\r') {
        "carriage return in subtitle text"
    } else if text.split('\n').any(|line| line.trim().is_empty()) {
        "blank line in subtitle text"
    } else {
        return Ok(());
    };

    Err(CaptionError::MalformedDocument {
        block,
        reason: reason.to_string(),
    })
}

/// Read and parse an SRT file
pub fn read_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<TimedSegment>> {
    let path = path.as_ref();
    let content = FileManager::read_to_string(path)?;
    parse_srt(&content).with_context(|| format!("Failed to parse subtitle file: {}", path.display()))
}

/// Write segments to an SRT file, creating parent directories as needed
pub fn write_srt_file<P: AsRef<Path>>(path: P, segments: &[TimedSegment]) -> Result<()> {
    FileManager::write_to_file(path, &write_srt(segments)?)
}
