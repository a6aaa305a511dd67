//! Ogg Opus output.
//!
//! libopus only runs at a handful of rates, so input is resampled to 48 kHz
//! first. Pages follow RFC 7845: an `OpusHead` packet, an `OpusTags`
//! packet, then one 20 ms audio packet at a time.

use crate::codecs::ogg::OggWriter;
use crate::codecs::{EncoderBackend, EncoderSettings};
use crate::error::EncodeError;
use crate::io::PcmBuffer;
use crate::samplerate::{self, OPUS_RATE};
use crate::types::Codec;
use crate::wav::WaveHeader;
use opus::{Application, Bitrate, Channels};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// 20 ms at 48 kHz.
const FRAME_SAMPLES: usize = 960;
/// Largest packet libopus will produce for one frame.
const MAX_PACKET: usize = 4000;
/// Encoder lookahead at 48 kHz for the audio application.
const PRE_SKIP: u16 = 312;
const VENDOR: &str = "wavpress";

pub struct OpusBackend {
    settings: EncoderSettings,
}

impl OpusBackend {
    pub fn new(settings: EncoderSettings) -> OpusBackend {
        OpusBackend { settings }
    }
}

impl EncoderBackend for OpusBackend {
    fn codec(&self) -> Codec {
        Codec::Opus
    }

    fn version(&self) -> String {
        opus::version().to_string()
    }

    fn encode_pcm(
        &self,
        header: &WaveHeader,
        pcm: &PcmBuffer,
        out_path: &Path,
    ) -> Result<(), EncodeError> {
        let channels = pcm.channels();
        let opus_channels = match channels {
            1 => Channels::Mono,
            _ => Channels::Stereo,
        };

        let samples = samplerate::resample_to_48k(&pcm.interleaved(), header.sample_rate, channels)
            .map_err(|e| EncodeError::codec(Codec::Opus, format!("resample: {e}")))?;

        let mut encoder = opus::Encoder::new(OPUS_RATE, opus_channels, Application::Audio)
            .map_err(opus_err)?;
        encoder.set_bitrate(Bitrate::Bits(self.settings.opus_bitrate))
            .map_err(opus_err)?;

        let file = File::create(out_path).map_err(|e| EncodeError::io(out_path, e))?;
        let mut ogg = OggWriter::new(BufWriter::new(file), rand::random::<i32>())
            .map_err(|e| EncodeError::codec(Codec::Opus, e))?;

        let head = opus_head(channels as u8, header.sample_rate);
        ogg.write_packet(&head, 0, true, false)
            .map_err(|e| EncodeError::codec(Codec::Opus, e))?;
        ogg.write_pages(true).map_err(|e| EncodeError::io(out_path, e))?;
        ogg.write_packet(&opus_tags(VENDOR), 0, false, false)
            .map_err(|e| EncodeError::codec(Codec::Opus, e))?;
        ogg.write_pages(true).map_err(|e| EncodeError::io(out_path, e))?;

        let frame_len = FRAME_SAMPLES * channels as usize;
        let total_frames = (samples.len() / channels as usize) as i64;
        let packet_count = samples.len().div_ceil(frame_len).max(1);
        let mut frame = vec![0i16; frame_len];
        let mut packet = vec![0u8; MAX_PACKET];
        let mut granulepos = PRE_SKIP as i64;

        for index in 0..packet_count {
            let start = (index * frame_len).min(samples.len());
            let end = (start + frame_len).min(samples.len());
            let chunk = &samples[start..end];
            frame[..chunk.len()].copy_from_slice(chunk);
            frame[chunk.len()..].fill(0);

            let len = encoder.encode(&frame, &mut packet).map_err(opus_err)?;

            let last = index + 1 == packet_count;
            granulepos = if last {
                PRE_SKIP as i64 + total_frames
            } else {
                granulepos + FRAME_SAMPLES as i64
            };
            ogg.write_packet(&packet[..len], granulepos, false, last)
                .map_err(|e| EncodeError::codec(Codec::Opus, e))?;
            ogg.write_pages(false).map_err(|e| EncodeError::io(out_path, e))?;
        }

        ogg.finish().map_err(|e| EncodeError::io(out_path, e))
    }
}

fn opus_err(e: opus::Error) -> EncodeError {
    EncodeError::codec(Codec::Opus, e.to_string())
}

/// Identification header, mapping family 0.
fn opus_head(channels: u8, input_rate: u32) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1);
    head.push(channels);
    head.extend_from_slice(&PRE_SKIP.to_le_bytes());
    head.extend_from_slice(&input_rate.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes());
    head.push(0);
    head
}

/// Comment header with a vendor string and no user comments.
fn opus_tags(vendor: &str) -> Vec<u8> {
    let mut tags = Vec::with_capacity(16 + vendor.len());
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor.as_bytes());
    tags.extend_from_slice(&0u32.to_le_bytes());
    tags
}
