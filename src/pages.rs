/*!
 * Page synthesis: grouping timed segments into display pages.
 *
 * A page is the group of tokens the renderer shows at once. Segments are walked
 * once in order; a new page opens when the silence before a segment reaches the
 * gap threshold, or when one of the optional readability caps would be exceeded.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::CaptionError;
use crate::subtitle_processor::{TimedSegment, check_ordered};

/// Default maximum silence between two tokens of the same page
pub const DEFAULT_GAP_THRESHOLD_MS: u64 = 120;

/// The atomic display unit inside a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub text: String,
    pub from_ms: u64,
    pub to_ms: u64,
}

impl Token {
    pub fn new(text: impl Into<String>, from_ms: u64, to_ms: u64) -> Self {
        Self {
            text: text.into(),
            from_ms,
            to_ms,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.to_ms.saturating_sub(self.from_ms)
    }

    /// Inclusive on both ends
    pub fn contains(&self, time_ms: u64) -> bool {
        self.from_ms <= time_ms && time_ms <= self.to_ms
    }
}

/// A group of temporally adjacent tokens displayed together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub tokens: Vec<Token>,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl Page {
    /// Build a page spanning its tokens; `None` for an empty token list
    pub fn from_tokens(tokens: Vec<Token>) -> Option<Self> {
        let start_ms = tokens.first()?.from_ms;
        let end_ms = tokens.last()?.to_ms;
        Some(Self {
            tokens,
            start_ms,
            duration_ms: end_ms.saturating_sub(start_ms),
        })
    }

    pub fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }

    /// Check the shape the synthesizer guarantees, for pages read from outside
    ///
    /// Tokens must be non-empty, ordered, non-overlapping and must span
    /// exactly `start_ms..=end_ms()`.
    pub fn check_consistent(&self) -> Result<(), String> {
        let (Some(first), Some(last)) = (self.tokens.first(), self.tokens.last()) else {
            return Err("page has no tokens".to_string());
        };
        if self.start_ms.checked_add(self.duration_ms).is_none() {
            return Err(format!("duration {}ms overflows", self.duration_ms));
        }
        if let Some((i, token)) = self.tokens.iter().enumerate().find(|(_, t)| t.to_ms < t.from_ms) {
            return Err(format!(
                "token {} ends at {}ms before it starts at {}ms",
                i + 1,
                token.to_ms,
                token.from_ms
            ));
        }
        if let Some(i) = self.tokens.windows(2).position(|pair| pair[0].to_ms > pair[1].from_ms) {
            return Err(format!("tokens {} and {} overlap or are out of order", i + 1, i + 2));
        }
        if self.start_ms != first.from_ms {
            return Err(format!(
                "start {}ms differs from first token start {}ms",
                self.start_ms, first.from_ms
            ));
        }
        if self.end_ms() != last.to_ms {
            return Err(format!(
                "end {}ms differs from last token end {}ms",
                self.end_ms(),
                last.to_ms
            ));
        }
        Ok(())
    }

    /// Inclusive on both ends
    pub fn contains(&self, time_ms: u64) -> bool {
        self.start_ms <= time_ms && time_ms <= self.end_ms()
    }

    /// Token texts joined by single spaces
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Tunables for page synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    /// Silence (ms) at or above which a new page starts
    #[serde(default = "default_gap_threshold_ms")]
    pub gap_threshold_ms: u64,

    /// Optional readability cap on tokens per page
    #[serde(default)]
    pub max_tokens_per_page: Option<usize>,

    /// Optional readability cap on page duration
    #[serde(default)]
    pub max_page_duration_ms: Option<u64>,

    /// Split multi-word segments into one token per word
    #[serde(default = "default_true")]
    pub split_words: bool,
}

fn default_gap_threshold_ms() -> u64 {
    DEFAULT_GAP_THRESHOLD_MS
}

fn default_true() -> bool {
    true
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            gap_threshold_ms: DEFAULT_GAP_THRESHOLD_MS,
            max_tokens_per_page: None,
            max_page_duration_ms: None,
            split_words: true,
        }
    }
}

impl PageOptions {
    pub fn with_gap(gap_threshold_ms: u64) -> Self {
        Self {
            gap_threshold_ms,
            ..Self::default()
        }
    }
}

/// Group segments into pages with default options and the given gap threshold
pub fn synthesize_with_gap(segments: &[TimedSegment], gap_threshold_ms: u64) -> Result<Vec<Page>, CaptionError> {
    synthesize(segments, &PageOptions::with_gap(gap_threshold_ms))
}

/// Group ordered segments into non-overlapping pages
///
/// Fails with `UnorderedInput` if a segment starts before its predecessor.
/// Overlapping but ordered segments are clamped so that tokens never overlap.
pub fn synthesize(segments: &[TimedSegment], options: &PageOptions) -> Result<Vec<Page>, CaptionError> {
    check_ordered(segments)?;

    let mut pages = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut last_to: Option<u64> = None;

    for segment in segments {
        if let Some(prev_to) = last_to {
            let gap_reached = segment.start_ms >= prev_to
                && segment.start_ms - prev_to >= options.gap_threshold_ms;
            if gap_reached && !current.is_empty() {
                pages.extend(Page::from_tokens(std::mem::take(&mut current)));
            }
        }

        for mut token in segment_tokens(segment, options.split_words) {
            if let Some(prev_to) = last_to {
                token.from_ms = token.from_ms.max(prev_to);
                token.to_ms = token.to_ms.max(token.from_ms);
            }

            if exceeds_caps(&current, &token, options) {
                pages.extend(Page::from_tokens(std::mem::take(&mut current)));
            }

            last_to = Some(token.to_ms);
            current.push(token);
        }
    }
    pages.extend(Page::from_tokens(current));

    debug!(
        "Synthesized {} pages from {} segments (gap threshold {}ms)",
        pages.len(),
        segments.len(),
        options.gap_threshold_ms
    );
    Ok(pages)
}

fn exceeds_caps(current: &[Token], next: &Token, options: &PageOptions) -> bool {
    let Some(first) = current.first() else {
        return false;
    };
    if let Some(max_tokens) = options.max_tokens_per_page {
        if current.len() >= max_tokens.max(1) {
            return true;
        }
    }
    if let Some(max_duration) = options.max_page_duration_ms {
        if next.to_ms - first.from_ms > max_duration {
            return true;
        }
    }
    false
}

/// Tokens for one segment, either whole or split per word
///
/// Word ranges split the segment proportionally to word length, are contiguous,
/// and the last word ends exactly at the segment end.
fn segment_tokens(segment: &TimedSegment, split_words: bool) -> Vec<Token> {
    let words: Vec<&str> = segment.text.split_whitespace().collect();
    if !split_words || words.len() <= 1 {
        let text = if split_words { segment.text.trim() } else { segment.text.as_str() };
        return vec![Token::new(text, segment.start_ms, segment.end_ms)];
    }

    let total_chars: u64 = words.iter().map(|w| w.chars().count() as u64).sum();
    let duration = segment.duration_ms();

    let mut tokens = Vec::with_capacity(words.len());
    let mut consumed_chars = 0u64;
    let mut from_ms = segment.start_ms;
    for (i, word) in words.iter().enumerate() {
        consumed_chars += word.chars().count() as u64;
        let to_ms = if i + 1 == words.len() {
            segment.end_ms
        } else {
            segment.start_ms + (u128::from(duration) * u128::from(consumed_chars) / u128::from(total_chars)) as u64
        };
        tokens.push(Token::new(*word, from_ms, to_ms));
        from_ms = to_ms;
    }
    tokens
}
