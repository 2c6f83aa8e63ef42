/*!
 * Error types for the quill-captions crate.
 *
 * The caption core reports failures through `CaptionError`. The transcription
 * engine handle has its own `EngineError`, and `AppError` wraps everything for
 * the command line glue. All enums use the thiserror crate.
 */

use thiserror::Error;

/// Errors produced by the caption core (codec, parser, normalizer, synthesizer)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    /// A timing string matched neither `HH:MM:SS,mmm` nor `HH:MM:SS.mmm`
    #[error("Malformed timestamp: '{0}'")]
    MalformedTimestamp(String),

    /// A subtitle block could not be read
    #[error("Malformed subtitle document at block {block}: {reason}")]
    MalformedDocument {
        /// 1-based block number in the document
        block: usize,
        /// What was wrong with the block
        reason: String,
    },

    /// A segment ends before it starts
    #[error("Invalid time range at entry {index}: end {end_ms}ms < start {start_ms}ms")]
    InvalidRange {
        /// 1-based entry number
        index: usize,
        start_ms: u64,
        end_ms: u64,
    },

    /// A segment starts before the one preceding it
    #[error("Unordered input at entry {index}: start {start_ms}ms precedes previous start {previous_start_ms}ms")]
    UnorderedInput {
        /// 1-based entry number
        index: usize,
        start_ms: u64,
        previous_start_ms: u64,
    },

    /// The transcription engine output held no usable words
    #[error("Transcription produced no captions")]
    EmptyTranscription,

    /// An item of the transcription engine output has an unexpected shape
    #[error("Invalid transcription item: {0}")]
    InvalidTranscription(String),
}

/// Errors from the external transcription engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine executable could not be found
    #[error("Transcription engine not found: {0}")]
    BinaryNotFound(String),

    /// The model file could not be found
    #[error("Transcription model not found: {0}")]
    ModelNotFound(String),

    /// The engine process exited unsuccessfully
    #[error("Transcription engine failed: {0}")]
    ProcessFailed(String),

    /// The engine did not finish in time
    #[error("Transcription engine timed out after {0} seconds")]
    Timeout(u64),

    /// The engine output could not be read or decoded
    #[error("Failed to read transcription output: {0}")]
    OutputUnreadable(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the caption core
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// Error from the transcription engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::File(format!("JSON: {}", error))
    }
}
