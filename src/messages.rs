//! Frame types for the read-aloud WebSocket protocol.
//!
//! Outbound frames are text: CRLF-separated header lines, a blank line, then
//! the body. Inbound text frames mark turn boundaries; inbound binary frames
//! carry audio fragments behind a short header block.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Header that correlates frames with a synthesis request.
pub const REQUEST_ID_HEADER: &str = "X-RequestId:";

/// Terminator of the header block in binary audio frames.
pub const AUDIO_SEPARATOR: &[u8] = b"Path:audio\r\n";

const TURN_START: &str = "Path:turn.start";
const TURN_END: &str = "Path:turn.end";

// ============================================================================
// Outbound
// ============================================================================

/// Body of the `speech.config` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub context: SpeechContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechContext {
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub audio: AudioConfig,
}

/// Audio output options for a synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    #[serde(rename = "metadataoptions")]
    pub metadata_options: MetadataOptions,
    /// Output format name, e.g. `audio-24khz-48kbitrate-mono-mp3`.
    pub output_format: String,
}

/// Boundary metadata switches. The service expects the strings `"true"`/`"false"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataOptions {
    pub sentence_boundary_enabled: String,
    pub word_boundary_enabled: String,
}

impl SpeechConfig {
    /// Creates a config requesting `output_format` with boundary metadata disabled.
    pub fn new(output_format: String) -> Self {
        Self {
            context: SpeechContext {
                synthesis: SynthesisConfig {
                    audio: AudioConfig {
                        metadata_options: MetadataOptions {
                            sentence_boundary_enabled: "false".to_string(),
                            word_boundary_enabled: "false".to_string(),
                        },
                        output_format,
                    },
                },
            },
        }
    }
}

/// Renders the current time the way a browser's `Date()` does, in UTC.
pub fn timestamp() -> String {
    Utc::now()
        .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

/// Builds the `speech.config` text frame.
pub fn speech_config_frame(output_format: &str) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string(&SpeechConfig::new(output_format.to_string()))?;
    Ok(format!(
        "X-Timestamp:{}\r\nContent-Type:application/json; charset=utf-8\r\nPath:speech.config\r\n\r\n{}",
        timestamp(),
        body
    ))
}

/// Builds the `ssml` text frame carrying the markup for `request_id`.
pub fn ssml_frame(request_id: &str, ssml: &str) -> String {
    format!(
        "X-Timestamp:{}\r\n{}{}\r\nContent-Type:application/ssml+xml\r\nPath:ssml\r\n\r\n{}",
        timestamp(),
        REQUEST_ID_HEADER,
        request_id,
        ssml
    )
}

// ============================================================================
// Inbound
// ============================================================================

/// Turn boundary carried by an inbound text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent<'a> {
    /// The service started answering `request_id`.
    Start(&'a str),
    /// The service finished answering `request_id`.
    End(&'a str),
}

/// Audio fragment carried by an inbound binary frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioChunk<'a> {
    pub request_id: &'a str,
    pub payload: &'a [u8],
}

/// Extracts the lowercase-hex value of the first `X-RequestId:` header.
///
/// Returns `None` if the header is missing or empty.
pub fn request_id(headers: &str) -> Option<&str> {
    let start = headers.find(REQUEST_ID_HEADER)? + REQUEST_ID_HEADER.len();
    let rest = &headers[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .unwrap_or(rest.len());
    match &rest[..end] {
        "" => None,
        id => Some(id),
    }
}

/// Parses a text frame into a turn boundary, ignoring every other path.
pub fn parse_turn(frame: &str) -> Option<TurnEvent<'_>> {
    let headers = frame.split_once("\r\n\r\n").map_or(frame, |(h, _)| h);
    let mut start = false;
    let mut end = false;
    for line in headers.lines() {
        match line {
            TURN_START => start = true,
            TURN_END => end = true,
            _ => {}
        }
    }
    if !start && !end {
        return None;
    }
    let id = request_id(headers)?;
    Some(if start {
        TurnEvent::Start(id)
    } else {
        TurnEvent::End(id)
    })
}

/// Parses a binary frame: a 2-byte length prefix, a header block ending in
/// `Path:audio\r\n`, then raw audio.
pub fn parse_audio(frame: &[u8]) -> Option<AudioChunk<'_>> {
    let body = frame.get(2..)?;
    let split = body
        .windows(AUDIO_SEPARATOR.len())
        .position(|w| w == AUDIO_SEPARATOR)?
        + AUDIO_SEPARATOR.len();
    let headers = std::str::from_utf8(&body[..split]).ok()?;
    Some(AudioChunk {
        request_id: request_id(headers)?,
        payload: &body[split..],
    })
}
