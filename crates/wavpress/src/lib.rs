//! Batch transcoding of PCM WAV files into compressed formats.
//!
//! [`convert::Coordinator`] scans a directory and spreads the files across
//! a pool of worker threads, each of which drives one
//! [`codecs::EncoderBackend`].

pub mod types;
pub mod error;
pub mod wav;
pub mod io;
pub mod status;
pub mod fs;
pub mod bitdepth;
pub mod samplerate;
pub mod codecs;
pub mod convert;

#[doc(hidden)]
pub mod testsupport;
