//! Output formats accepted by the read-aloud service and their MIME types.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Codec, container and bitrate combination for synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Raw16Khz16BitMonoPcm,
    Raw48Khz16BitMonoPcm,
    Raw8Khz8BitMonoMulaw,
    Raw8Khz8BitMonoAlaw,
    Raw16Khz16BitMonoTruesilk,
    Raw24Khz16BitMonoTruesilk,
    Riff16Khz16BitMonoPcm,
    Riff24Khz16BitMonoPcm,
    Riff48Khz16BitMonoPcm,
    Riff8Khz8BitMonoMulaw,
    Riff8Khz8BitMonoAlaw,
    Audio16Khz32KBitrateMonoMp3,
    Audio16Khz64KBitrateMonoMp3,
    Audio16Khz128KBitrateMonoMp3,
    Audio24Khz48KBitrateMonoMp3,
    Audio24Khz96KBitrateMonoMp3,
    Audio24Khz160KBitrateMonoMp3,
    Audio48Khz96KBitrateMonoMp3,
    Audio48Khz192KBitrateMonoMp3,
    Webm16Khz16BitMonoOpus,
    Webm24Khz16BitMonoOpus,
    Ogg16Khz16BitMonoOpus,
    Ogg24Khz16BitMonoOpus,
    Ogg48Khz16BitMonoOpus,
}

impl OutputFormat {
    /// Every known format.
    pub const ALL: [OutputFormat; 24] = [
        OutputFormat::Raw16Khz16BitMonoPcm,
        OutputFormat::Raw48Khz16BitMonoPcm,
        OutputFormat::Raw8Khz8BitMonoMulaw,
        OutputFormat::Raw8Khz8BitMonoAlaw,
        OutputFormat::Raw16Khz16BitMonoTruesilk,
        OutputFormat::Raw24Khz16BitMonoTruesilk,
        OutputFormat::Riff16Khz16BitMonoPcm,
        OutputFormat::Riff24Khz16BitMonoPcm,
        OutputFormat::Riff48Khz16BitMonoPcm,
        OutputFormat::Riff8Khz8BitMonoMulaw,
        OutputFormat::Riff8Khz8BitMonoAlaw,
        OutputFormat::Audio16Khz32KBitrateMonoMp3,
        OutputFormat::Audio16Khz64KBitrateMonoMp3,
        OutputFormat::Audio16Khz128KBitrateMonoMp3,
        OutputFormat::Audio24Khz48KBitrateMonoMp3,
        OutputFormat::Audio24Khz96KBitrateMonoMp3,
        OutputFormat::Audio24Khz160KBitrateMonoMp3,
        OutputFormat::Audio48Khz96KBitrateMonoMp3,
        OutputFormat::Audio48Khz192KBitrateMonoMp3,
        OutputFormat::Webm16Khz16BitMonoOpus,
        OutputFormat::Webm24Khz16BitMonoOpus,
        OutputFormat::Ogg16Khz16BitMonoOpus,
        OutputFormat::Ogg24Khz16BitMonoOpus,
        OutputFormat::Ogg48Khz16BitMonoOpus,
    ];

    /// Name sent in the `speech.config` frame.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Raw16Khz16BitMonoPcm => "raw-16khz-16bit-mono-pcm",
            OutputFormat::Raw48Khz16BitMonoPcm => "raw-48khz-16bit-mono-pcm",
            OutputFormat::Raw8Khz8BitMonoMulaw => "raw-8khz-8bit-mono-mulaw",
            OutputFormat::Raw8Khz8BitMonoAlaw => "raw-8khz-8bit-mono-alaw",
            OutputFormat::Raw16Khz16BitMonoTruesilk => "raw-16khz-16bit-mono-truesilk",
            OutputFormat::Raw24Khz16BitMonoTruesilk => "raw-24khz-16bit-mono-truesilk",
            OutputFormat::Riff16Khz16BitMonoPcm => "riff-16khz-16bit-mono-pcm",
            OutputFormat::Riff24Khz16BitMonoPcm => "riff-24khz-16bit-mono-pcm",
            OutputFormat::Riff48Khz16BitMonoPcm => "riff-48khz-16bit-mono-pcm",
            OutputFormat::Riff8Khz8BitMonoMulaw => "riff-8khz-8bit-mono-mulaw",
            OutputFormat::Riff8Khz8BitMonoAlaw => "riff-8khz-8bit-mono-alaw",
            OutputFormat::Audio16Khz32KBitrateMonoMp3 => "audio-16khz-32kbitrate-mono-mp3",
            OutputFormat::Audio16Khz64KBitrateMonoMp3 => "audio-16khz-64kbitrate-mono-mp3",
            OutputFormat::Audio16Khz128KBitrateMonoMp3 => "audio-16khz-128kbitrate-mono-mp3",
            OutputFormat::Audio24Khz48KBitrateMonoMp3 => "audio-24khz-48kbitrate-mono-mp3",
            OutputFormat::Audio24Khz96KBitrateMonoMp3 => "audio-24khz-96kbitrate-mono-mp3",
            OutputFormat::Audio24Khz160KBitrateMonoMp3 => "audio-24khz-160kbitrate-mono-mp3",
            OutputFormat::Audio48Khz96KBitrateMonoMp3 => "audio-48khz-96kbitrate-mono-mp3",
            OutputFormat::Audio48Khz192KBitrateMonoMp3 => "audio-48khz-192kbitrate-mono-mp3",
            OutputFormat::Webm16Khz16BitMonoOpus => "webm-16khz-16bit-mono-opus",
            OutputFormat::Webm24Khz16BitMonoOpus => "webm-24khz-16bit-mono-opus",
            OutputFormat::Ogg16Khz16BitMonoOpus => "ogg-16khz-16bit-mono-opus",
            OutputFormat::Ogg24Khz16BitMonoOpus => "ogg-24khz-16bit-mono-opus",
            OutputFormat::Ogg48Khz16BitMonoOpus => "ogg-48khz-16bit-mono-opus",
        }
    }

    /// MIME type to serve the audio with.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Raw16Khz16BitMonoPcm
            | OutputFormat::Raw48Khz16BitMonoPcm
            | OutputFormat::Raw8Khz8BitMonoMulaw
            | OutputFormat::Raw8Khz8BitMonoAlaw => "audio/basic",
            OutputFormat::Raw16Khz16BitMonoTruesilk
            | OutputFormat::Raw24Khz16BitMonoTruesilk => "audio/SILK",
            OutputFormat::Riff16Khz16BitMonoPcm
            | OutputFormat::Riff24Khz16BitMonoPcm
            | OutputFormat::Riff48Khz16BitMonoPcm
            | OutputFormat::Riff8Khz8BitMonoMulaw
            | OutputFormat::Riff8Khz8BitMonoAlaw => "audio/x-wav",
            OutputFormat::Audio16Khz32KBitrateMonoMp3
            | OutputFormat::Audio16Khz64KBitrateMonoMp3
            | OutputFormat::Audio16Khz128KBitrateMonoMp3
            | OutputFormat::Audio24Khz48KBitrateMonoMp3
            | OutputFormat::Audio24Khz96KBitrateMonoMp3
            | OutputFormat::Audio24Khz160KBitrateMonoMp3
            | OutputFormat::Audio48Khz96KBitrateMonoMp3
            | OutputFormat::Audio48Khz192KBitrateMonoMp3 => "audio/mpeg",
            OutputFormat::Webm16Khz16BitMonoOpus
            | OutputFormat::Webm24Khz16BitMonoOpus => "audio/webm; codec=opus",
            OutputFormat::Ogg16Khz16BitMonoOpus => "audio/ogg; codecs=opus; rate=16000",
            OutputFormat::Ogg24Khz16BitMonoOpus => "audio/ogg; codecs=opus; rate=24000",
            OutputFormat::Ogg48Khz16BitMonoOpus => "audio/ogg; codecs=opus; rate=48000",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}
