use crate::codecs::{EncoderBackend, EncoderSettings};
use crate::error::EncodeError;
use crate::io::PcmBuffer;
use crate::types::Codec;
use crate::wav::WaveHeader;
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One LAME granule group per encode call.
const CHUNK_FRAMES: usize = 1152 * 8;

pub struct Mp3Backend {
    settings: EncoderSettings,
}

impl Mp3Backend {
    pub fn new(settings: EncoderSettings) -> Mp3Backend {
        Mp3Backend { settings }
    }
}

impl EncoderBackend for Mp3Backend {
    fn codec(&self) -> Codec {
        Codec::Mp3
    }

    fn version(&self) -> String {
        String::from("LAME (mp3lame-encoder)")
    }

    fn encode_pcm(
        &self,
        header: &WaveHeader,
        pcm: &PcmBuffer,
        out_path: &Path,
    ) -> Result<(), EncodeError> {
        let bitrate = bitrate_from_kbps(self.settings.mp3_bitrate_kbps)?;
        let mut lame = create_lame(pcm.channels(), header.sample_rate, bitrate)?;

        let file = File::create(out_path).map_err(|e| EncodeError::io(out_path, e))?;
        let mut out = BufWriter::new(file);
        let mut mp3_buffer: Vec<u8> = Vec::with_capacity(buffer_size(CHUNK_FRAMES));

        let interleaved = pcm.interleaved();
        let channels = pcm.channels() as usize;
        for chunk in interleaved.chunks(CHUNK_FRAMES * channels) {
            mp3_buffer.clear();
            mp3_buffer.reserve(buffer_size(chunk.len() / channels));
            let written = if channels == 1 {
                lame.encode(MonoPcm(chunk), mp3_buffer.spare_capacity_mut())
            } else {
                lame.encode(InterleavedPcm(chunk), mp3_buffer.spare_capacity_mut())
            }
            .map_err(|e| EncodeError::codec(Codec::Mp3, format!("{e:?}")))?;

            // LAME wrote exactly `written` bytes into spare capacity.
            unsafe {
                mp3_buffer.set_len(written);
            }
            out.write_all(&mp3_buffer).map_err(|e| EncodeError::io(out_path, e))?;
        }

        mp3_buffer.clear();
        mp3_buffer.reserve(buffer_size(0));
        let written = lame.flush::<FlushNoGap>(mp3_buffer.spare_capacity_mut())
            .map_err(|e| EncodeError::codec(Codec::Mp3, format!("{e:?}")))?;
        unsafe {
            mp3_buffer.set_len(written);
        }
        out.write_all(&mp3_buffer).map_err(|e| EncodeError::io(out_path, e))?;
        out.flush().map_err(|e| EncodeError::io(out_path, e))?;

        Ok(())
    }
}

fn create_lame(
    channels: u16,
    sample_rate: u32,
    bitrate: Bitrate,
) -> Result<mp3lame_encoder::Encoder, EncodeError> {
    let mut builder = Builder::new()
        .ok_or_else(|| EncodeError::codec(Codec::Mp3, "unable to allocate LAME encoder"))?;
    builder
        .set_num_channels(channels as u8)
        .map_err(|e| lame_err("channel count", &e))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| lame_err("sample rate", &e))?;
    builder
        .set_brate(bitrate)
        .map_err(|e| lame_err("bitrate", &e))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| lame_err("quality", &e))?;

    builder.build().map_err(|e| lame_err("init", &e))
}

fn lame_err(what: &str, e: &dyn std::fmt::Debug) -> EncodeError {
    EncodeError::codec(Codec::Mp3, format!("{what}: {e:?}"))
}

/// LAME's worst case: 1.25 * samples + 7200 bytes.
fn buffer_size(frames: usize) -> usize {
    frames * 5 / 4 + 7200
}

fn bitrate_from_kbps(kbps: u32) -> Result<Bitrate, EncodeError> {
    let bitrate = match kbps {
        32 => Bitrate::Kbps32,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(EncodeError::codec(
                Codec::Mp3,
                format!("unsupported bitrate {other} kbps"),
            ));
        }
    };
    Ok(bitrate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn known_bitrates_map() {
        assert!(bitrate_from_kbps(128).is_ok());
        assert!(bitrate_from_kbps(320).is_ok());
    }

    #[test]
    fn odd_bitrates_are_codec_errors() {
        let Err(err) = bitrate_from_kbps(127) else {
            panic!("127 kbps accepted");
        };
        assert_eq!(err.code(), ErrorCode::Lame);
    }
}
