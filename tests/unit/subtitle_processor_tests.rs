/*!
 * Tests for SRT parsing and writing
 */

use anyhow::Result;
use quill_captions::errors::CaptionError;
use quill_captions::subtitle_processor::{
    TimedSegment, parse_srt, read_srt_file, write_srt, write_srt_file,
};

use crate::common;

/// Test parsing SRT string content
#[test]
fn test_parseSrt_withValidContent_shouldParseCorrectly() -> Result<()> {
    let srt_content = "1\n00:00:01,000 --> 00:00:04,000\nHello world\n\n2\n00:00:05,000 --> 00:00:08,000\nTest subtitle\nSecond line\n\n";

    let segments = parse_srt(srt_content)?;

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0], TimedSegment::new("Hello world", 1000, 4000));
    assert_eq!(segments[1], TimedSegment::new("Test subtitle\nSecond line", 5000, 8000));
    Ok(())
}

#[test]
fn test_parseSrt_withPeriodSeparator_shouldParse() -> Result<()> {
    let segments = parse_srt("1\n00:00:01.500 --> 00:00:02.250\nHi\n")?;
    assert_eq!(segments, vec![TimedSegment::new("Hi", 1500, 2250)]);
    Ok(())
}

#[test]
fn test_parseSrt_withEmptyDocument_shouldReturnNoSegments() -> Result<()> {
    assert!(parse_srt("")?.is_empty());
    assert!(parse_srt("\n\n  \n")?.is_empty());
    Ok(())
}

#[test]
fn test_parseSrt_withMissingTimingLine_shouldReportBlock() {
    let doc = "1\n00:00:00,000 --> 00:00:01,000\nok\n\n2\njust text\nmore text\n";
    match parse_srt(doc) {
        Err(CaptionError::MalformedDocument { block, .. }) => assert_eq!(block, 2),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_parseSrt_withBadTimestamp_shouldBeMalformedDocument() {
    let doc = "1\n00:00:00,000 --> 00:00:xx,000\ntext\n";
    assert!(matches!(parse_srt(doc), Err(CaptionError::MalformedDocument { block: 1, .. })));
}

#[test]
fn test_parseSrt_withoutText_shouldBeMalformedDocument() {
    let doc = "1\n00:00:00,000 --> 00:00:01,000\n\n";
    assert!(matches!(parse_srt(doc), Err(CaptionError::MalformedDocument { block: 1, .. })));
}

#[test]
fn test_parseSrt_withEndBeforeStart_shouldBeInvalidRange() {
    let doc = "1\n00:00:02,000 --> 00:00:01,000\nbackwards\n";
    assert_eq!(
        parse_srt(doc),
        Err(CaptionError::InvalidRange { index: 1, start_ms: 2000, end_ms: 1000 })
    );
}

#[test]
fn test_parseSrt_withOutOfOrderBlocks_shouldRejectUnordered() {
    let doc = "1\n00:00:05,000 --> 00:00:06,000\nlater\n\n2\n00:00:01,000 --> 00:00:02,000\nearlier\n";
    assert_eq!(
        parse_srt(doc),
        Err(CaptionError::UnorderedInput { index: 2, start_ms: 1000, previous_start_ms: 5000 })
    );
}

#[test]
fn test_writeSrt_shouldUseOneBasedIndicesAndBlankSeparators() -> Result<()> {
    let segments = vec![
        TimedSegment::new("hello world", 0, 1200),
        TimedSegment::new("goodbye", 1400, 2000),
    ];
    assert_eq!(write_srt(&segments)?, common::HELLO_GOODBYE_SRT);
    Ok(())
}

#[test]
fn test_writeSrt_withNoSegments_shouldBeEmpty() {
    assert_eq!(write_srt(&[]), Ok(String::new()));
}

#[test]
fn test_parseSrt_writeSrt_shouldRoundTrip() -> Result<()> {
    let segments = vec![
        TimedSegment::new("first", 0, 0),
        TimedSegment::new("two\nlines", 0, 850),
        TimedSegment::new(" leading space", 900, 1_000),
        TimedSegment::new("long", 3_599_000, 359_999_999),
    ];
    assert_eq!(parse_srt(&write_srt(&segments)?)?, segments);
    Ok(())
}

#[test]
fn test_writeSrt_withEmptyText_shouldRejectBlock() {
    let segments = vec![TimedSegment::new("a", 0, 100), TimedSegment::new("", 200, 300)];

    assert!(matches!(
        write_srt(&segments),
        Err(CaptionError::MalformedDocument { block: 2, .. })
    ));
}

#[test]
fn test_writeSrt_withUnreadableText_shouldReject() {
    for text in ["   ", "a\n\nb", "a\n  \nb", "trailing\n", "windows\r\nline"] {
        assert!(
            matches!(
                write_srt(&[TimedSegment::new(text, 0, 100)]),
                Err(CaptionError::MalformedDocument { block: 1, .. })
            ),
            "expected rejection for {:?}",
            text
        );
    }
}

#[test]
fn test_writeSrt_withMultiLineText_shouldRoundTrip() -> Result<()> {
    let segments = vec![TimedSegment::new("first line\n  indented second", 0, 900)];
    assert_eq!(parse_srt(&write_srt(&segments)?)?, segments);
    Ok(())
}

#[test]
fn test_writeSrtFile_withEmptyText_shouldFailWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("empty.srt");

    assert!(write_srt_file(&path, &[TimedSegment::new("", 0, 10)]).is_err());
    assert!(!path.exists());
    Ok(())
}

#[test]
fn test_srtFile_writeThenRead_shouldMatch() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("captions.srt");
    let segments = vec![TimedSegment::new("saved", 10, 20)];

    write_srt_file(&path, &segments)?;
    assert_eq!(read_srt_file(&path)?, segments);
    Ok(())
}

#[test]
fn test_readSrtFile_withMissingFile_shouldFail() {
    assert!(read_srt_file("/definitely/not/here.srt").is_err());
}
