/*!
 * Normalization of speech-to-text engine output.
 *
 * Engines hand back their per-word results either as a JSON array or, as an
 * observed quirk of some whisper.cpp wrappers, as a JSON object keyed by
 * arbitrary strings. Both shapes are resolved here into one ordered list of
 * `TimedSegment`s; nothing downstream ever sees the raw shape.
 *
 * Each item needs a `text` and a time range given as `startMs`/`endMs`,
 * `start`/`end`, or whisper.cpp `offsets: { from, to }`, all in milliseconds.
 * Items carrying a whisper.cpp `tokens` array are expanded to token level and
 * sub-word tokens are glued back into words.
 */

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::errors::CaptionError;
use crate::subtitle_processor::{TimedSegment, write_srt};

/// Envelope fields that wrap the word list in known engine outputs
const ENVELOPE_KEYS: [&str; 2] = ["transcription", "words"];

/// Shape of the per-word collection, resolved as soon as it is seen
enum WordCollection<'a> {
    Sequence(&'a [Value]),
    Mapping(&'a Map<String, Value>),
}

impl<'a> WordCollection<'a> {
    fn detect(raw: &'a Value) -> Option<Self> {
        match raw {
            Value::Array(items) => Some(Self::Sequence(items)),
            Value::Object(map) => Some(Self::Mapping(map)),
            _ => None,
        }
    }

    /// Items in sequence order, or in key insertion order for a mapping
    fn items(&self) -> Vec<&'a Value> {
        match self {
            Self::Sequence(items) => items.iter().collect(),
            Self::Mapping(map) => map.values().collect(),
        }
    }
}

/// A timed piece of text before trimming or word assembly
struct RawPiece<'a> {
    text: &'a str,
    start_ms: u64,
    end_ms: u64,
}

/// Normalize a per-word collection (array or keyed object) into timed segments
pub fn normalize(raw: &Value) -> Result<Vec<TimedSegment>, CaptionError> {
    let collection = WordCollection::detect(raw).ok_or(CaptionError::EmptyTranscription)?;
    if let WordCollection::Mapping(map) = &collection {
        debug!("Transcription given as a keyed mapping with {} entries", map.len());
    }

    let mut segments = Vec::new();
    for (i, item) in collection.items().into_iter().enumerate() {
        let index = i + 1;
        let object = item.as_object().ok_or_else(|| {
            CaptionError::InvalidTranscription(format!("entry {} is not an object", index))
        })?;

        match expand_tokens(object, index)? {
            Some(words) => segments.extend(words),
            None => {
                let piece = read_piece(object, index)?;
                if let Some(segment) = finish_word(&[piece]) {
                    segments.push(segment);
                }
            }
        }
    }

    if segments.is_empty() {
        warn!("Transcription output contained no usable words");
        return Err(CaptionError::EmptyTranscription);
    }

    debug!("Normalized transcription into {} segments", segments.len());
    Ok(segments)
}

/// Normalize a full engine response, unwrapping a `transcription` or `words` envelope
pub fn normalize_engine_output(output: &Value) -> Result<Vec<TimedSegment>, CaptionError> {
    let words = output
        .as_object()
        .and_then(|map| ENVELOPE_KEYS.iter().find_map(|key| map.get(*key)))
        .unwrap_or(output);
    normalize(words)
}

/// Normalize engine output and serialize it as an SRT document
pub fn transcription_to_srt(output: &Value) -> Result<String, CaptionError> {
    let segments = normalize_engine_output(output)?;
    write_srt(&segments)
}

fn read_piece<'a>(object: &'a Map<String, Value>, index: usize) -> Result<RawPiece<'a>, CaptionError> {
    let text = object.get("text").and_then(Value::as_str).ok_or_else(|| {
        CaptionError::InvalidTranscription(format!("entry {} has no text", index))
    })?;

    let offsets = object.get("offsets").and_then(Value::as_object);
    let start = read_time(object, &["startMs", "start"], offsets.and_then(|o| o.get("from")));
    let end = read_time(object, &["endMs", "end"], offsets.and_then(|o| o.get("to")));

    let (start_ms, end_ms) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(CaptionError::InvalidTranscription(format!(
                "entry {} is missing a valid start or end time",
                index
            )));
        }
    };

    if end_ms < start_ms {
        return Err(CaptionError::InvalidRange { index, start_ms, end_ms });
    }

    Ok(RawPiece { text, start_ms, end_ms })
}

fn read_time(object: &Map<String, Value>, keys: &[&str], fallback: Option<&Value>) -> Option<u64> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .or(fallback)
        .and_then(to_millis)
}

fn to_millis(value: &Value) -> Option<u64> {
    if let Some(ms) = value.as_u64() {
        return Some(ms);
    }
    value
        .as_f64()
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .map(|ms| ms.round() as u64)
}

/// Expand a whisper.cpp item with token-level timestamps into words
///
/// Returns `None` when the item has no tokens, so the caller uses the item itself.
fn expand_tokens(object: &Map<String, Value>, index: usize) -> Result<Option<Vec<TimedSegment>>, CaptionError> {
    let tokens = match object.get("tokens").and_then(Value::as_array) {
        Some(tokens) if !tokens.is_empty() => tokens,
        _ => return Ok(None),
    };

    let mut pieces = Vec::with_capacity(tokens.len());
    for token in tokens {
        let token = token.as_object().ok_or_else(|| {
            CaptionError::InvalidTranscription(format!("entry {} has a non-object token", index))
        })?;
        let piece = read_piece(token, index)?;
        if is_control_token(piece.text) {
            continue;
        }
        pieces.push(piece);
    }

    Ok(Some(pieces_to_words(&pieces)))
}

/// Control tokens look like `[_BEG_]` or `[_TT_150]`
fn is_control_token(text: &str) -> bool {
    let text = text.trim();
    text.starts_with("[_") && text.ends_with(']')
}

/// A leading space marks the start of a new word
fn pieces_to_words(pieces: &[RawPiece<'_>]) -> Vec<TimedSegment> {
    let mut words = Vec::new();
    let mut word_start = 0;

    for (i, piece) in pieces.iter().enumerate() {
        let starts_word = i == word_start || piece.text.starts_with(char::is_whitespace);
        if starts_word && i > word_start {
            words.extend(finish_word(&pieces[word_start..i]));
            word_start = i;
        }
    }
    if word_start < pieces.len() {
        words.extend(finish_word(&pieces[word_start..]));
    }

    words
}

fn finish_word(pieces: &[RawPiece<'_>]) -> Option<TimedSegment> {
    let first = pieces.first()?;
    let last = pieces.last()?;
    let raw_text: String = pieces.iter().map(|p| p.text).collect();
    let text = raw_text.trim();
    if text.is_empty() {
        return None;
    }

    Some(TimedSegment::new(text, first.start_ms, last.end_ms.max(first.start_ms)))
}
