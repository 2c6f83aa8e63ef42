/*!
 * # Quill Captions - caption timing and page synthesis
 *
 * A Rust library that turns speech-to-text output or SRT subtitles into timed
 * caption "pages" for short-form vertical video, and resolves which page and
 * word are active at any playback time.
 *
 * ## Features
 *
 * - SRT timestamp codec and document parser/writer
 * - Normalization of transcription engine output (array or keyed object)
 * - Page synthesis with a configurable silence threshold
 * - Allocation-free active page / token progress lookup for renderers
 * - A whisper.cpp engine handle with an explicit `ensure_ready` step
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `timestamp`: `HH:MM:SS,mmm` encoding and decoding
 * - `subtitle_processor`: SRT parsing and writing
 * - `transcription`: Engine output normalization
 * - `pages`: Page synthesis
 * - `active`: Active-state resolution at render time
 * - `engine`: Speech-to-text engine handle
 * - `app_config`: Configuration management
 * - `app_controller`: File pipelines used by the CLI
 * - `file_utils`: File system operations
 * - `errors`: Custom error types
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]

pub mod active;
pub mod app_config;
pub mod app_controller;
pub mod engine;
pub mod errors;
pub mod file_utils;
pub mod pages;
pub mod subtitle_processor;
pub mod timestamp;
pub mod transcription;

// Re-export main types for easier usage
pub use active::{ActiveFrame, PageLines, find_active_page, resolve, split_into_lines, token_progress};
pub use app_config::Config;
pub use errors::{AppError, CaptionError, EngineError};
pub use pages::{DEFAULT_GAP_THRESHOLD_MS, Page, PageOptions, Token, synthesize, synthesize_with_gap};
pub use subtitle_processor::{TimedSegment, parse_srt, write_srt};
pub use transcription::{normalize, normalize_engine_output, transcription_to_srt};
