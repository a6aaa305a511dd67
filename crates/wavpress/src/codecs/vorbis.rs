use crate::bitdepth::i16_to_f32;
use crate::codecs::ogg::OggWriter;
use crate::codecs::{EncoderBackend, EncoderSettings};
use crate::error::EncodeError;
use crate::io::PcmBuffer;
use crate::types::Codec;
use crate::wav::WaveHeader;
use aotuv_lancer_vorbis_sys::*;
use ogg_next_sys::ogg_packet;
use std::ffi::{c_int, c_long, CStr};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::mem::MaybeUninit;
use std::path::Path;
use std::ptr;

/// Frames submitted to the analysis buffer per call.
const CHUNK_FRAMES: usize = 1024;

pub struct VorbisBackend {
    settings: EncoderSettings,
}

impl VorbisBackend {
    pub fn new(settings: EncoderSettings) -> VorbisBackend {
        VorbisBackend { settings }
    }
}

impl EncoderBackend for VorbisBackend {
    fn codec(&self) -> Codec {
        Codec::Vorbis
    }

    fn version(&self) -> String {
        let version = unsafe { vorbis_version_string() };
        if version.is_null() {
            return String::from("libvorbis");
        }
        unsafe { CStr::from_ptr(version).to_string_lossy().into_owned() }
    }

    fn encode_pcm(
        &self,
        header: &WaveHeader,
        pcm: &PcmBuffer,
        out_path: &Path,
    ) -> Result<(), EncodeError> {
        let mut state = VorbisState::new(
            pcm.channels(),
            header.sample_rate,
            self.settings.vorbis_quality,
        )?;

        let file = File::create(out_path).map_err(|e| EncodeError::io(out_path, e))?;
        let mut ogg = OggWriter::new(BufWriter::new(file), rand::random::<i32>())
            .map_err(|e| EncodeError::codec(Codec::Vorbis, e))?;

        state.write_headers(&mut ogg, out_path)?;

        let frames = pcm.frames();
        let mut start = 0;
        while start < frames {
            let end = (start + CHUNK_FRAMES).min(frames);
            state.submit(&pcm.left[start..end], pcm.right.as_ref().map(|r| &r[start..end]));
            state.drain(&mut ogg, out_path)?;
            start = end;
        }

        state.submit_end();
        state.drain(&mut ogg, out_path)?;

        ogg.finish().map_err(|e| EncodeError::io(out_path, e))
    }
}

/// libvorbis encoder state.
///
/// Boxed because the dsp state points at the info and the block points at
/// the dsp state. Cleared in reverse order on drop.
struct VorbisState {
    info: Box<vorbis_info>,
    comment: Box<vorbis_comment>,
    dsp: Box<vorbis_dsp_state>,
    block: Box<vorbis_block>,
    dsp_ready: bool,
    block_ready: bool,
}

impl VorbisState {
    fn new(channels: u16, sample_rate: u32, quality: f32) -> Result<VorbisState, EncodeError> {
        let mut state = unsafe {
            VorbisState {
                info: Box::new(MaybeUninit::zeroed().assume_init()),
                comment: Box::new(MaybeUninit::zeroed().assume_init()),
                dsp: Box::new(MaybeUninit::zeroed().assume_init()),
                block: Box::new(MaybeUninit::zeroed().assume_init()),
                dsp_ready: false,
                block_ready: false,
            }
        };

        unsafe {
            vorbis_info_init(state.info.as_mut());
            vorbis_comment_init(state.comment.as_mut());

            let ret = vorbis_encode_init_vbr(
                state.info.as_mut(),
                channels as c_long,
                sample_rate as c_long,
                quality,
            );
            if ret != 0 {
                return Err(EncodeError::codec(
                    Codec::Vorbis,
                    format!("vorbis_encode_init_vbr failed ({ret}) for {channels} ch at {sample_rate} hz"),
                ));
            }

            vorbis_comment_add_tag(
                state.comment.as_mut(),
                c"ENCODER".as_ptr(),
                c"wavpress".as_ptr(),
            );

            if vorbis_analysis_init(state.dsp.as_mut(), state.info.as_mut()) != 0 {
                return Err(EncodeError::codec(Codec::Vorbis, "vorbis_analysis_init failed"));
            }
            state.dsp_ready = true;

            if vorbis_block_init(state.dsp.as_mut(), state.block.as_mut()) != 0 {
                return Err(EncodeError::codec(Codec::Vorbis, "vorbis_block_init failed"));
            }
            state.block_ready = true;
        }

        Ok(state)
    }

    /// Emits the identification, comment and setup packets.
    fn write_headers<W: Write>(
        &mut self,
        ogg: &mut OggWriter<W>,
        out_path: &Path,
    ) -> Result<(), EncodeError> {
        unsafe {
            let mut ident: ogg_packet = MaybeUninit::zeroed().assume_init();
            let mut comments: ogg_packet = MaybeUninit::zeroed().assume_init();
            let mut setup: ogg_packet = MaybeUninit::zeroed().assume_init();

            let ret = vorbis_analysis_headerout(
                self.dsp.as_mut(),
                self.comment.as_mut(),
                &mut ident,
                &mut comments,
                &mut setup,
            );
            if ret != 0 {
                return Err(EncodeError::codec(Codec::Vorbis, "vorbis_analysis_headerout failed"));
            }

            // The identification header gets a page of its own.
            ogg.packet_in(&mut ident)
                .map_err(|e| EncodeError::codec(Codec::Vorbis, e))?;
            ogg.write_pages(true).map_err(|e| EncodeError::io(out_path, e))?;

            for packet in [&mut comments, &mut setup] {
                ogg.packet_in(packet)
                    .map_err(|e| EncodeError::codec(Codec::Vorbis, e))?;
            }
        }
        ogg.write_pages(true).map_err(|e| EncodeError::io(out_path, e))
    }

    /// Copies one block of planar samples into the analysis buffer.
    fn submit(&mut self, left: &[i16], right: Option<&[i16]>) {
        let frames = left.len();
        unsafe {
            let buffer = vorbis_analysis_buffer(self.dsp.as_mut(), frames as c_int);
            let planes = std::slice::from_raw_parts(buffer, 1 + right.is_some() as usize);

            let dest = std::slice::from_raw_parts_mut(planes[0], frames);
            for (d, s) in dest.iter_mut().zip(left) {
                *d = i16_to_f32(*s);
            }
            if let Some(right) = right {
                let dest = std::slice::from_raw_parts_mut(planes[1], frames);
                for (d, s) in dest.iter_mut().zip(right) {
                    *d = i16_to_f32(*s);
                }
            }

            vorbis_analysis_wrote(self.dsp.as_mut(), frames as c_int);
        }
    }

    fn submit_end(&mut self) {
        unsafe {
            vorbis_analysis_wrote(self.dsp.as_mut(), 0);
        }
    }

    /// Pulls every finished packet out of the encoder and into `ogg`.
    fn drain<W: Write>(&mut self, ogg: &mut OggWriter<W>, out_path: &Path) -> Result<(), EncodeError> {
        unsafe {
            while vorbis_analysis_blockout(self.dsp.as_mut(), self.block.as_mut()) == 1 {
                if vorbis_analysis(self.block.as_mut(), ptr::null_mut()) != 0 {
                    return Err(EncodeError::codec(Codec::Vorbis, "vorbis_analysis failed"));
                }
                if vorbis_bitrate_addblock(self.block.as_mut()) != 0 {
                    return Err(EncodeError::codec(Codec::Vorbis, "vorbis_bitrate_addblock failed"));
                }

                let mut packet: ogg_packet = MaybeUninit::zeroed().assume_init();
                while vorbis_bitrate_flushpacket(self.dsp.as_mut(), &mut packet) == 1 {
                    ogg.packet_in(&mut packet)
                        .map_err(|e| EncodeError::codec(Codec::Vorbis, e))?;
                    ogg.write_pages(false)
                        .map_err(|e| EncodeError::io(out_path, e))?;
                }
            }
        }
        Ok(())
    }
}

impl Drop for VorbisState {
    fn drop(&mut self) {
        unsafe {
            if self.block_ready {
                vorbis_block_clear(self.block.as_mut());
            }
            if self.dsp_ready {
                vorbis_dsp_clear(self.dsp.as_mut());
            }
            vorbis_comment_clear(self.comment.as_mut());
            vorbis_info_clear(self.info.as_mut());
        }
    }
}
