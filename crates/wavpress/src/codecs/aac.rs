use crate::codecs::{EncoderBackend, EncoderSettings};
use crate::error::EncodeError;
use crate::io::PcmBuffer;
use crate::types::Codec;
use crate::wav::WaveHeader;
use fdk_aac::enc::{BitRate, ChannelMode, Encoder, EncoderParams, Transport};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Samples per channel in one AAC-LC frame.
const FRAME_SAMPLES: usize = 1024;
/// Silent frames pushed through at the end to flush the encoder delay.
const FLUSH_FRAMES: usize = 3;
const OUT_BUFFER: usize = 8192;

pub struct AacBackend {
    settings: EncoderSettings,
}

impl AacBackend {
    pub fn new(settings: EncoderSettings) -> AacBackend {
        AacBackend { settings }
    }
}

impl EncoderBackend for AacBackend {
    fn codec(&self) -> Codec {
        Codec::Aac
    }

    fn version(&self) -> String {
        String::from("Fraunhofer FDK AAC (fdk-aac)")
    }

    fn encode_pcm(
        &self,
        header: &WaveHeader,
        pcm: &PcmBuffer,
        out_path: &Path,
    ) -> Result<(), EncodeError> {
        let channels = match pcm.channels() {
            1 => ChannelMode::Mono,
            _ => ChannelMode::Stereo,
        };
        let params = EncoderParams {
            bit_rate: BitRate::Cbr(self.settings.aac_bitrate),
            sample_rate: header.sample_rate,
            transport: Transport::Adts,
            channels,
        };
        let mut encoder = Encoder::new(params)
            .map_err(|e| EncodeError::codec(Codec::Aac, format!("init: {e:?}")))?;

        let file = File::create(out_path).map_err(|e| EncodeError::io(out_path, e))?;
        let mut out = BufWriter::new(file);
        let mut buffer = vec![0u8; OUT_BUFFER];

        let samples = pcm.interleaved();
        encode_all(&mut encoder, &samples, &mut buffer, &mut out, out_path)?;

        let silence = vec![0i16; FRAME_SAMPLES * FLUSH_FRAMES * pcm.channels() as usize];
        encode_all(&mut encoder, &silence, &mut buffer, &mut out, out_path)?;

        out.flush().map_err(|e| EncodeError::io(out_path, e))
    }
}

/// Feeds `samples` until the encoder has consumed all of them, writing
/// each ADTS frame as it comes out.
fn encode_all(
    encoder: &mut Encoder,
    samples: &[i16],
    buffer: &mut [u8],
    out: &mut impl Write,
    out_path: &Path,
) -> Result<(), EncodeError> {
    let mut offset = 0;
    while offset < samples.len() {
        let info = encoder.encode(&samples[offset..], buffer)
            .map_err(|e| EncodeError::codec(Codec::Aac, format!("{e:?}")))?;

        if info.input_consumed == 0 && info.output_size == 0 {
            return Err(EncodeError::codec(Codec::Aac, "encoder made no progress"));
        }

        out.write_all(&buffer[..info.output_size])
            .map_err(|e| EncodeError::io(out_path, e))?;
        offset += info.input_consumed;
    }
    Ok(())
}
