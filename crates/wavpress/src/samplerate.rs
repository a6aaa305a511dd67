use crate::bitdepth::{i16_slice_to_f32, f32_slice_to_i16};
use libsamplerate_sys::*;
use std::ffi::{c_int, c_long, CStr};

pub const OPUS_RATE: u32 = 48_000;

/// Resamples interleaved 16-bit PCM from `inrate` to 48 kHz.
///
/// Uses libsamplerate's linear converter. Input already at 48 kHz is
/// returned unchanged.
pub fn resample_to_48k(
    input: &[i16],
    inrate: u32,
    channels: u16,
) -> Result<Vec<i16>, String> {
    resample(input, inrate, OPUS_RATE, channels)
}

pub fn resample(
    input: &[i16],
    inrate: u32,
    outrate: u32,
    channels: u16,
) -> Result<Vec<i16>, String> {
    if channels == 0 || inrate == 0 {
        return Err(format!("cannot resample {channels} channels at {inrate} hz"));
    }
    if inrate == outrate || input.is_empty() {
        return Ok(input.to_vec());
    }
    if input.len() % channels as usize != 0 {
        return Err(format!("{} samples is not a whole number of frames", input.len()));
    }

    let src_ratio = outrate as f64 / inrate as f64;
    let inbuf = i16_slice_to_f32(input);
    let input_frames = inbuf.len() / channels as usize;
    let output_frames = (input_frames as f64 * src_ratio).ceil() as usize + 1;
    let mut outbuf = vec![0.0f32; output_frames * channels as usize];

    let mut data = SRC_DATA {
        data_in: inbuf.as_ptr(),
        data_out: outbuf.as_mut_ptr(),
        input_frames: input_frames as c_long,
        output_frames: output_frames as c_long,
        input_frames_used: 0,
        output_frames_gen: 0,
        end_of_input: 1,
        src_ratio,
    };

    let err = unsafe {
        src_simple(&mut data, SRC_LINEAR as c_int, channels as c_int)
    };

    if err != 0 {
        let msg = unsafe {
            let msg = src_strerror(err);
            if msg.is_null() {
                format!("libsamplerate error {err}")
            } else {
                CStr::from_ptr(msg).to_string_lossy().into_owned()
            }
        };
        return Err(msg);
    }

    outbuf.truncate(data.output_frames_gen as usize * channels as usize);
    Ok(f32_slice_to_i16(&outbuf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_at_target_rate() {
        let input = vec![1, -1, 2, -2];
        assert_eq!(resample_to_48k(&input, 48_000, 2).unwrap(), input);
    }

    #[test]
    fn upsampling_scales_frame_count() {
        let input: Vec<i16> = (0..2400).map(|i| (i % 200) as i16 * 100).collect();
        let out = resample_to_48k(&input, 24_000, 1).unwrap();
        let expected = 4800;
        assert!(out.len().abs_diff(expected) <= 16, "got {} frames", out.len());
    }

    #[test]
    fn stereo_output_has_whole_frames() {
        let input = vec![0i16; 44_100 * 2];
        let out = resample_to_48k(&input, 44_100, 2).unwrap();
        assert_eq!(out.len() % 2, 0);
        assert!(out.len() / 2 >= 47_900);
    }

    #[test]
    fn rejects_ragged_input() {
        assert!(resample(&[1, 2, 3], 44_100, 48_000, 2).is_err());
        assert!(resample(&[1, 2], 0, 48_000, 1).is_err());
    }
}
