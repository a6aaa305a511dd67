use std::io;
use std::path::PathBuf;
use thiserror::Error;
use crate::types::Codec;

/// Flat error taxonomy shared by the parser, the backends and the
/// coordinator. Status records and run summaries carry these.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Copy, Clone)]
#[derive(Debug)]
pub enum ErrorCode {
    None,
    NotFound,
    ReadFile,
    Cancelled,
    WavInvalid,
    NotImplemented,
    ThreadSpawn,
    ThreadJoin,
    Lame,
    Opus,
    Flac,
    Vorbis,
    Aac,
    Busy,
    Io,
}

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::None => "Error none",
            ErrorCode::NotFound => "Not found",
            ErrorCode::ReadFile => "Read file error",
            ErrorCode::Cancelled => "Cancelled",
            ErrorCode::WavInvalid => "Invalid WAV file",
            ErrorCode::NotImplemented => "Not implemented",
            ErrorCode::ThreadSpawn => "Thread create error",
            ErrorCode::ThreadJoin => "Thread join error",
            ErrorCode::Lame => "LAME error",
            ErrorCode::Opus => "Opus error",
            ErrorCode::Flac => "FLAC error",
            ErrorCode::Vorbis => "Vorbis error",
            ErrorCode::Aac => "AAC error",
            ErrorCode::Busy => "Busy",
            ErrorCode::Io => "I/O error",
        }
    }

    pub fn for_codec(codec: Codec) -> ErrorCode {
        match codec {
            Codec::Mp3 => ErrorCode::Lame,
            Codec::Aac => ErrorCode::Aac,
            Codec::Flac => ErrorCode::Flac,
            Codec::Opus => ErrorCode::Opus,
            Codec::Vorbis => ErrorCode::Vorbis,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Reasons a WAV file is rejected or cannot be decoded.
#[derive(Debug, Error)]
pub enum WavError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("file is {0} bytes, shorter than the minimum header")]
    TooShort(usize),

    #[error("expected {expected:?} tag, found {found:?}")]
    TagMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("unsupported format code {0}, only PCM is accepted")]
    NotPcm(u16),

    #[error("chunk at offset {0} runs past the end of the file")]
    Truncated(usize),

    #[error("no data chunk found")]
    MissingData,

    #[error("data chunk found before fmt chunk")]
    DataBeforeFmt,

    #[error("header field {0} must be non-zero")]
    ZeroField(&'static str),

    #[error("{0} bits per sample is not supported, only 16")]
    UnsupportedBitDepth(u16),

    #[error("{0} channels is not supported, only mono and stereo")]
    UnsupportedChannels(u16),
}

/// Failure of a single file encode.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid wav file {}", .path.display())]
    WavInvalid {
        path: PathBuf,
        #[source]
        source: WavError,
    },

    #[error("failed to read pcm data from {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: WavError,
    },

    #[error("{codec} encoder failed: {message}")]
    Codec {
        codec: Codec,
        message: String,
    },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EncodeError {
    pub fn codec(codec: Codec, message: impl Into<String>) -> EncodeError {
        EncodeError::Codec {
            codec,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> EncodeError {
        EncodeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EncodeError::WavInvalid { .. } => ErrorCode::WavInvalid,
            EncodeError::ReadFile { .. } => ErrorCode::ReadFile,
            EncodeError::Codec { codec, .. } => ErrorCode::for_codec(*codec),
            EncodeError::Io { .. } => ErrorCode::Io,
        }
    }
}

/// Run-level failures. Per-file failures never show up here.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unable to list {}: {source}", .dir.display())]
    Listing {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a transcode run is already active")]
    Busy,

    #[error("failed to spawn worker {worker_id}: {source}")]
    ThreadSpawn {
        worker_id: u32,
        #[source]
        source: io::Error,
    },

    #[error("worker {0} panicked")]
    ThreadJoin(u32),
}

impl CoordinatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoordinatorError::NotFound(_) => ErrorCode::NotFound,
            CoordinatorError::Listing { .. } => ErrorCode::Io,
            CoordinatorError::Busy => ErrorCode::Busy,
            CoordinatorError::ThreadSpawn { .. } => ErrorCode::ThreadSpawn,
            CoordinatorError::ThreadJoin(_) => ErrorCode::ThreadJoin,
        }
    }
}
