// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Binary media detection.
//!
//! Media frames never go through JSON decoding. A frame is media when it
//! arrives on [`MEDIA_TOPIC`] or when its leading bytes carry one of the
//! container/codec signatures below.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved topic value for raw media payloads.
pub const MEDIA_TOPIC: &str = "media";

/// Audio/video containers recognized by their magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFormat {
    /// MP3 with an ID3v2 tag (`ID3`).
    Id3,
    /// Bare MPEG audio frame (11-bit frame sync).
    MpegFrame,
    /// Ogg container (`OggS`).
    Ogg,
    /// RIFF/WAV container (`RIFF`).
    Riff,
    /// FLAC stream (`fLaC`).
    Flac,
    /// Matroska/WebM (EBML header).
    Webm,
}

impl MediaFormat {
    /// Detects a media format from the leading bytes of a payload.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'I', b'D', b'3', ..] => Some(MediaFormat::Id3),
            [b'O', b'g', b'g', b'S', ..] => Some(MediaFormat::Ogg),
            [b'R', b'I', b'F', b'F', ..] => Some(MediaFormat::Riff),
            [b'f', b'L', b'a', b'C', ..] => Some(MediaFormat::Flac),
            [0x1A, 0x45, 0xDF, 0xA3, ..] => Some(MediaFormat::Webm),
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(MediaFormat::MpegFrame),
            _ => None,
        }
    }

    /// Returns the string representation used in logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Id3 => "id3",
            MediaFormat::MpegFrame => "mpeg",
            MediaFormat::Ogg => "ogg",
            MediaFormat::Riff => "riff",
            MediaFormat::Flac => "flac",
            MediaFormat::Webm => "webm",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "media_tests.rs"]
mod tests;
