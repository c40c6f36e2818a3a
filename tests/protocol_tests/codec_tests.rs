//! Codec Tests
//!
//! Tests for string and integer frames.

use std::io::Cursor;

use noticeboard::protocol::{
    decode_modified_utf8, encode_modified_utf8, read_u64, read_utf, read_utf_or_eof, write_u64,
    write_utf, MAX_STRING_LEN,
};
use noticeboard::NoticeError;

// =============================================================================
// String Frame Tests
// =============================================================================

#[test]
fn test_write_utf_layout() {
    let mut buf = Vec::new();
    write_utf(&mut buf, "LIST").unwrap();
    assert_eq!(buf, vec![0x00, 0x04, b'L', b'I', b'S', b'T']);
}

#[test]
fn test_write_utf_empty() {
    let mut buf = Vec::new();
    write_utf(&mut buf, "").unwrap();
    assert_eq!(buf, vec![0x00, 0x00]);

    let decoded = read_utf(&mut Cursor::new(buf)).unwrap();
    assert_eq!(decoded, "");
}

#[test]
fn test_read_utf_non_ascii() {
    // "é" is U+00E9 -> C3 A9, same as standard UTF-8
    let bytes = vec![0x00, 0x06, b'c', b'a', b'f', 0xC3, 0xA9, b'!'];
    assert_eq!(read_utf(&mut Cursor::new(bytes)).unwrap(), "café!");
}

#[test]
fn test_consecutive_frames() {
    let mut buf = Vec::new();
    write_utf(&mut buf, "a.txt").unwrap();
    write_utf(&mut buf, "b.txt").unwrap();
    write_utf(&mut buf, "END").unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_utf(&mut cursor).unwrap(), "a.txt");
    assert_eq!(read_utf(&mut cursor).unwrap(), "b.txt");
    assert_eq!(read_utf(&mut cursor).unwrap(), "END");
}

#[test]
fn test_string_at_length_limit() {
    let s = "x".repeat(MAX_STRING_LEN);
    let mut buf = Vec::new();
    write_utf(&mut buf, &s).unwrap();
    assert_eq!(&buf[..2], &[0xFF, 0xFF]);
    assert_eq!(read_utf(&mut Cursor::new(buf)).unwrap(), s);
}

#[test]
fn test_string_over_length_limit() {
    // 'é' is two bytes encoded, so this is one byte over the limit
    let s = format!("{}é", "x".repeat(MAX_STRING_LEN - 1));
    let mut buf = Vec::new();
    let result = write_utf(&mut buf, &s);
    assert!(matches!(result, Err(NoticeError::Protocol(_))));
    assert!(buf.is_empty());
}

#[test]
fn test_embedded_nul_uses_two_byte_form() {
    let mut buf = Vec::new();
    write_utf(&mut buf, "a\0").unwrap();
    assert_eq!(buf, vec![0x00, 0x03, b'a', 0xC0, 0x80]);
    assert_eq!(read_utf(&mut Cursor::new(buf)).unwrap(), "a\0");
}

#[test]
fn test_bmp_and_supplementary_characters() {
    let s = "日本\u{1F4C4}";
    let encoded = encode_modified_utf8(s);
    // two 3-byte BMP chars + two 3-byte surrogates
    assert_eq!(encoded.len(), 12);
    assert_eq!(decode_modified_utf8(&encoded).unwrap(), s);
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_lone_surrogate_rejected() {
    // High surrogate D800 with nothing after it
    let result = decode_modified_utf8(&[0xED, 0xA0, 0x80]);
    assert!(matches!(result, Err(NoticeError::Protocol(_))));
}

#[test]
fn test_bad_continuation_rejected() {
    let result = decode_modified_utf8(&[0xC3, 0x41]);
    assert!(matches!(result, Err(NoticeError::Protocol(_))));
}

#[test]
fn test_four_byte_utf8_rejected() {
    // Standard UTF-8 for U+1F600; modified UTF-8 never uses 4-byte forms
    let result = decode_modified_utf8(&[0xF0, 0x9F, 0x98, 0x80]);
    assert!(matches!(result, Err(NoticeError::Protocol(_))));
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_read_utf_truncated_length() {
    let result = read_utf(&mut Cursor::new(vec![0x00]));
    assert!(matches!(
        result,
        Err(NoticeError::Truncated { expected: 2, received: 1 })
    ));
}

#[test]
fn test_read_utf_truncated_body() {
    let result = read_utf(&mut Cursor::new(vec![0x00, 0x05, b'h', b'e']));
    assert!(matches!(
        result,
        Err(NoticeError::Truncated { expected: 5, received: 2 })
    ));
}

#[test]
fn test_read_utf_empty_stream_is_truncated() {
    let result = read_utf(&mut Cursor::new(Vec::new()));
    assert!(matches!(result, Err(NoticeError::Truncated { .. })));
}

#[test]
fn test_read_utf_or_eof_clean_end() {
    let result = read_utf_or_eof(&mut Cursor::new(Vec::new())).unwrap();
    assert_eq!(result, None);
}

#[test]
fn test_read_utf_or_eof_reads_frame() {
    let mut buf = Vec::new();
    write_utf(&mut buf, "GET a.txt").unwrap();
    let mut cursor = Cursor::new(buf);

    assert_eq!(read_utf_or_eof(&mut cursor).unwrap().as_deref(), Some("GET a.txt"));
    assert_eq!(read_utf_or_eof(&mut cursor).unwrap(), None);
}

#[test]
fn test_read_utf_or_eof_partial_frame_is_truncated() {
    let result = read_utf_or_eof(&mut Cursor::new(vec![0x00, 0x04, b'L']));
    assert!(matches!(result, Err(NoticeError::Truncated { .. })));
}

// =============================================================================
// Integer Frame Tests
// =============================================================================

#[test]
fn test_u64_is_big_endian() {
    let mut buf = Vec::new();
    write_u64(&mut buf, 0x0102_0304_0506_0708).unwrap();
    assert_eq!(buf, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(read_u64(&mut Cursor::new(buf)).unwrap(), 0x0102_0304_0506_0708);
}

#[test]
fn test_u64_extremes() {
    let mut buf = Vec::new();
    write_u64(&mut buf, 0).unwrap();
    write_u64(&mut buf, u64::MAX).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_u64(&mut cursor).unwrap(), 0);
    assert_eq!(read_u64(&mut cursor).unwrap(), u64::MAX);
}

#[test]
fn test_u64_truncated() {
    let result = read_u64(&mut Cursor::new(vec![0, 0, 0, 5]));
    assert!(matches!(
        result,
        Err(NoticeError::Truncated { expected: 8, received: 4 })
    ));
}
