use crate::codecs::{EncoderBackend, EncoderSettings};
use crate::error::EncodeError;
use crate::io::PcmBuffer;
use crate::types::Codec;
use crate::wav::WaveHeader;
use std::ffi::{c_char, CStr, CString};
use std::io;
use std::path::Path;
use std::ptr::NonNull;
use libflac_sys::*;

/// Interleaved frames handed to libFLAC per call.
const BLOCK_FRAMES: usize = 4096;

pub struct FlacBackend {
    settings: EncoderSettings,
}

impl FlacBackend {
    pub fn new(settings: EncoderSettings) -> FlacBackend {
        FlacBackend { settings }
    }
}

impl EncoderBackend for FlacBackend {
    fn codec(&self) -> Codec {
        Codec::Flac
    }

    fn version(&self) -> String {
        let version = unsafe { FLAC__VERSION_STRING };
        if version.is_null() {
            return String::from("libFLAC");
        }
        let version = unsafe { CStr::from_ptr(version).to_string_lossy() };
        format!("libFLAC {version}")
    }

    fn encode_pcm(
        &self,
        header: &WaveHeader,
        pcm: &PcmBuffer,
        out_path: &Path,
    ) -> Result<(), EncodeError> {
        let mut encoder = FlacEncoder::new()?;
        encoder.configure(
            &self.settings,
            pcm.channels(),
            header.bits_per_sample,
            header.sample_rate,
            pcm.frames() as u64,
        )?;
        encoder.init_file(out_path)?;

        let samples = pcm.interleaved_i32();
        let channels = pcm.channels() as usize;
        for block in samples.chunks(BLOCK_FRAMES * channels) {
            encoder.process_interleaved(block, block.len() / channels)?;
        }

        encoder.finish()
    }
}

/// Owns a libFLAC stream encoder; deleted exactly once on drop.
struct FlacEncoder {
    encoder: NonNull<FLAC__StreamEncoder>,
}

impl FlacEncoder {
    fn new() -> Result<FlacEncoder, EncodeError> {
        let encoder = unsafe { FLAC__stream_encoder_new() };
        let encoder = NonNull::new(encoder).ok_or_else(|| {
            EncodeError::codec(Codec::Flac, "unable to allocate FLAC encoder")
        })?;
        Ok(FlacEncoder { encoder })
    }

    fn configure(
        &mut self,
        settings: &EncoderSettings,
        channels: u16,
        bits_per_sample: u16,
        sample_rate: u32,
        total_samples: u64,
    ) -> Result<(), EncodeError> {
        let encoder = self.encoder.as_ptr();
        let ok = unsafe {
            FLAC__stream_encoder_set_verify(encoder, settings.flac_verify as FLAC__bool) != 0
                && FLAC__stream_encoder_set_compression_level(encoder, settings.flac_compression_level) != 0
                && FLAC__stream_encoder_set_channels(encoder, channels as u32) != 0
                && FLAC__stream_encoder_set_bits_per_sample(encoder, bits_per_sample as u32) != 0
                && FLAC__stream_encoder_set_sample_rate(encoder, sample_rate) != 0
                && FLAC__stream_encoder_set_total_samples_estimate(encoder, total_samples) != 0
        };

        if ok {
            Ok(())
        } else {
            Err(self.state_error())
        }
    }

    fn init_file(&mut self, path: &Path) -> Result<(), EncodeError> {
        let c_path = path.to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| {
                EncodeError::io(path, io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "output path is not representable as a C string",
                ))
            })?;

        let status = unsafe {
            FLAC__stream_encoder_init_file(
                self.encoder.as_ptr(),
                c_path.as_ptr(),
                None,
                std::ptr::null_mut(),
            )
        };

        if status == FLAC__STREAM_ENCODER_INIT_STATUS_OK {
            return Ok(());
        }

        let state = unsafe { FLAC__stream_encoder_get_state(self.encoder.as_ptr()) };
        if state == FLAC__STREAM_ENCODER_IO_ERROR {
            return Err(EncodeError::io(path, io::Error::other("unable to open output file")));
        }

        let err_str = unsafe {
            code_to_string(&FLAC__StreamEncoderInitStatusString, status)
        };
        Err(EncodeError::codec(Codec::Flac, err_str))
    }

    fn process_interleaved(&mut self, samples: &[i32], frames: usize) -> Result<(), EncodeError> {
        let ok = unsafe {
            FLAC__stream_encoder_process_interleaved(
                self.encoder.as_ptr(),
                samples.as_ptr(),
                frames as u32,
            ) != 0
        };

        if ok {
            Ok(())
        } else {
            Err(self.state_error())
        }
    }

    fn finish(&mut self) -> Result<(), EncodeError> {
        let ok = unsafe { FLAC__stream_encoder_finish(self.encoder.as_ptr()) != 0 };

        if ok {
            Ok(())
        } else {
            Err(self.state_error())
        }
    }

    fn state_error(&self) -> EncodeError {
        let message = unsafe {
            let state = FLAC__stream_encoder_get_state(self.encoder.as_ptr());
            code_to_string(&FLAC__StreamEncoderStateString, state)
        };
        EncodeError::codec(Codec::Flac, message)
    }
}

impl Drop for FlacEncoder {
    fn drop(&mut self) {
        unsafe {
            FLAC__stream_encoder_delete(self.encoder.as_ptr());
        }
    }
}

unsafe fn code_to_string(
    table: &[*const c_char; 0],
    code: u32,
) -> String {
    unsafe {
        let cstr_ptr = table.as_ptr().offset(code as isize);
        let cstr = CStr::from_ptr(*cstr_ptr);
        cstr.to_string_lossy().into_owned()
    }
}
