use std::fs;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use crate::error::EncodeError;
use crate::io::PcmBuffer;
use crate::status::StatusSink;
use crate::types::{AudioFormatType, Codec};
use crate::wav::{self, WaveHeader};

pub mod aac;
pub mod flac;
pub mod mp3;
pub mod ogg;
pub mod opus;
pub mod vorbis;

/// Per-codec tuning. Every field has a default, so a partial TOML table
/// is enough.
#[derive(Serialize, Deserialize)]
#[derive(PartialEq)]
#[derive(Clone)]
#[derive(Debug)]
#[serde(default)]
pub struct EncoderSettings {
    pub mp3_bitrate_kbps: u32,
    pub opus_bitrate: i32,
    pub vorbis_quality: f32,
    pub flac_compression_level: u32,
    pub flac_verify: bool,
    pub aac_bitrate: u32,
}

impl Default for EncoderSettings {
    fn default() -> EncoderSettings {
        EncoderSettings {
            mp3_bitrate_kbps: 128,
            opus_bitrate: 128_000,
            vorbis_quality: 0.4,
            flac_compression_level: 5,
            flac_verify: true,
            aac_bitrate: 128_000,
        }
    }
}

/// One target codec.
///
/// Implementors only turn decoded PCM into a file; validation, naming,
/// decoding and status reporting are shared by [`EncoderBackend::encode_one`].
pub trait EncoderBackend: Send + Sync {
    fn codec(&self) -> Codec;

    /// Name and version of the native library doing the work.
    fn version(&self) -> String;

    /// Encodes `pcm` into a new file at `out_path`.
    ///
    /// Native handles must be released before returning, on every path.
    fn encode_pcm(
        &self,
        header: &WaveHeader,
        pcm: &PcmBuffer,
        out_path: &Path,
    ) -> Result<(), EncodeError>;

    /// Encodes one WAV file into `output_dir`, reporting exactly one status
    /// record for it.
    fn encode_one(
        &self,
        input_path: &Path,
        output_dir: &Path,
        worker_id: u32,
        status: &StatusSink,
    ) -> Result<PathBuf, EncodeError> {
        let result = encode_file(self, input_path, output_dir, worker_id);

        match &result {
            Ok(out_path) => {
                status.complete(worker_id, format!("Output: {}", out_path.display()));
            }
            Err(e) => {
                log::warn!("worker {worker_id}: {e}");
                status.failed(worker_id, e.code(), e.to_string());
            }
        }

        result
    }
}

fn encode_file<B: EncoderBackend + ?Sized>(
    backend: &B,
    input_path: &Path,
    output_dir: &Path,
    worker_id: u32,
) -> Result<PathBuf, EncodeError> {
    log::debug!("worker {worker_id}: processing {}", input_path.display());

    let header = wav::validate_with_reason(input_path)
        .map_err(|source| EncodeError::WavInvalid {
            path: input_path.to_owned(),
            source,
        })?;

    let out_path = output_path(input_path, output_dir, backend.codec());

    let pcm = wav::get_pcm(input_path, &header)
        .map_err(|source| EncodeError::ReadFile {
            path: input_path.to_owned(),
            source,
        })?;

    match backend.encode_pcm(&header, &pcm, &out_path) {
        Ok(()) => Ok(out_path),
        Err(e) => {
            // Don't leave a truncated file behind for the next run to trip on.
            if out_path.exists() {
                let _ = fs::remove_file(&out_path);
            }
            Err(e)
        }
    }
}

/// `output_dir / <stem>.<ext>` for `input_path`.
pub fn output_path(input_path: &Path, output_dir: &Path, codec: Codec) -> PathBuf {
    let name = input_path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(generate_output_file(&name, codec.extension()))
}

/// Replaces the final extension of `input_file` with `extension`, or
/// appends it when there is none.
pub fn generate_output_file(input_file: &str, extension: &str) -> String {
    match input_file.rfind('.') {
        Some(pos) => format!("{}{extension}", &input_file[..pos]),
        None => format!("{input_file}{extension}"),
    }
}

/// Returns the backend for `format`, or `None` if it isn't encodable.
pub fn create_encoder(
    format: AudioFormatType,
    settings: &EncoderSettings,
) -> Option<Box<dyn EncoderBackend>> {
    let codec = Codec::from_format_type(format)?;
    let settings = settings.clone();
    let backend: Box<dyn EncoderBackend> = match codec {
        Codec::Flac => Box::new(flac::FlacBackend::new(settings)),
        Codec::Mp3 => Box::new(mp3::Mp3Backend::new(settings)),
        Codec::Opus => Box::new(opus::OpusBackend::new(settings)),
        Codec::Aac => Box::new(aac::AacBackend::new(settings)),
        Codec::Vorbis => Box::new(vorbis::VorbisBackend::new(settings)),
    };
    Some(backend)
}

pub fn supported_formats() -> &'static [&'static str] {
    &["flac", "mp3", "opus", "aac", "vorbis"]
}

pub fn format_type_to_string(format: AudioFormatType) -> &'static str {
    format.as_str()
}

pub fn string_to_format_type(format: &str) -> AudioFormatType {
    AudioFormatType::from_token(format)
}
