// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    id3 = { b"ID3\x04\x00rest", Some(MediaFormat::Id3) },
    mpeg_frame = { &[0xFF, 0xFB, 0x90, 0x00], Some(MediaFormat::MpegFrame) },
    ogg = { b"OggS\x00\x02", Some(MediaFormat::Ogg) },
    riff = { b"RIFF\x24\x08\x00\x00WAVE", Some(MediaFormat::Riff) },
    flac = { b"fLaC\x00", Some(MediaFormat::Flac) },
    webm = { &[0x1A, 0x45, 0xDF, 0xA3, 0x01], Some(MediaFormat::Webm) },
    json_object = { br#"{"type":"conversations_list"}"#, None },
    plain_text = { b"IDs are here", None },
    ff_without_sync = { &[0xFF, 0x10], None },
    too_short = { b"ID", None },
    empty = { b"", None },
)]
fn sniff_detects_signatures(bytes: &[u8], expected: Option<MediaFormat>) {
    assert_eq!(MediaFormat::sniff(bytes), expected);
}

#[test]
fn display_matches_as_str() {
    assert_eq!(MediaFormat::Webm.to_string(), "webm");
}
