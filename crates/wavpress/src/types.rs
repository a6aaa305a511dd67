use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

/// Audio container/codec families known to the transcoder.
///
/// Used both to filter inputs and to select an output encoder.
#[derive(Serialize, Deserialize)]
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Copy, Clone)]
#[derive(Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormatType {
    #[default]
    Unknown,
    // Uncompressed
    Wav,
    Aiff,
    // Lossy compressed
    Mp3,
    Aac,
    Vorbis,
    Wma,
    Opus,
    // Lossless compressed
    Flac,
    Alac,
}

impl AudioFormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormatType::Unknown => "unknown",
            AudioFormatType::Wav => "wav",
            AudioFormatType::Aiff => "aiff",
            AudioFormatType::Mp3 => "mp3",
            AudioFormatType::Aac => "aac",
            AudioFormatType::Vorbis => "vorbis",
            AudioFormatType::Wma => "wma",
            AudioFormatType::Opus => "opus",
            AudioFormatType::Flac => "flac",
            AudioFormatType::Alac => "alac",
        }
    }

    /// Case-sensitive lookup; anything unrecognized is `Unknown`.
    pub fn from_token(token: &str) -> AudioFormatType {
        match token {
            "wav" => AudioFormatType::Wav,
            "aiff" => AudioFormatType::Aiff,
            "mp3" => AudioFormatType::Mp3,
            "aac" => AudioFormatType::Aac,
            "vorbis" => AudioFormatType::Vorbis,
            "wma" => AudioFormatType::Wma,
            "opus" => AudioFormatType::Opus,
            "flac" => AudioFormatType::Flac,
            "alac" => AudioFormatType::Alac,
            _ => AudioFormatType::Unknown,
        }
    }
}

impl fmt::Display for AudioFormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormatType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AudioFormatType::from_token(s))
    }
}

/// The output codecs a backend exists for.
#[derive(Serialize, Deserialize)]
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Copy, Clone)]
#[derive(Debug)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Mp3,
    Aac,
    Flac,
    Opus,
    Vorbis,
}

impl Codec {
    pub const ALL: [Codec; 5] = [
        Codec::Flac,
        Codec::Mp3,
        Codec::Opus,
        Codec::Aac,
        Codec::Vorbis,
    ];

    /// Output file extension, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Mp3 => ".mp3",
            Codec::Aac => ".aac",
            Codec::Flac => ".flac",
            Codec::Opus => ".opus",
            Codec::Vorbis => ".ogg",
        }
    }

    pub fn format_type(&self) -> AudioFormatType {
        match self {
            Codec::Mp3 => AudioFormatType::Mp3,
            Codec::Aac => AudioFormatType::Aac,
            Codec::Flac => AudioFormatType::Flac,
            Codec::Opus => AudioFormatType::Opus,
            Codec::Vorbis => AudioFormatType::Vorbis,
        }
    }

    pub fn from_format_type(format: AudioFormatType) -> Option<Codec> {
        match format {
            AudioFormatType::Mp3 => Some(Codec::Mp3),
            AudioFormatType::Aac => Some(Codec::Aac),
            AudioFormatType::Flac => Some(Codec::Flac),
            AudioFormatType::Opus => Some(Codec::Opus),
            AudioFormatType::Vorbis => Some(Codec::Vorbis),
            _ => None,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format_type().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_for_supported_codecs() {
        for codec in Codec::ALL {
            let token = codec.format_type().as_str();
            assert_eq!(AudioFormatType::from_token(token), codec.format_type());
            assert_eq!(Codec::from_format_type(codec.format_type()), Some(codec));
        }
    }

    #[test]
    fn unknown_tokens_are_unknown() {
        assert_eq!(AudioFormatType::from_token("FLAC"), AudioFormatType::Unknown);
        assert_eq!(AudioFormatType::from_token(""), AudioFormatType::Unknown);
        assert_eq!("ogg".parse::<AudioFormatType>(), Ok(AudioFormatType::Unknown));
    }

    #[test]
    fn vorbis_writes_ogg_files() {
        assert_eq!(Codec::Vorbis.extension(), ".ogg");
        assert_eq!(Codec::from_format_type(AudioFormatType::Wav), None);
    }
}
