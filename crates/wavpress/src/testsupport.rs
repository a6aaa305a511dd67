//! Synthetic WAV fixtures for tests. Nothing here is used at runtime.

use anyhow::Result as AnyResult;
use rand::Rng;
use rand_pcg::Pcg64Mcg;
use std::fs;
use std::iter;
use std::path::Path;

/// Description of a WAV file to synthesise.
///
/// Every field that ends up in the header can be overridden, including
/// the tags, so tests can build both valid and broken files.
#[derive(Clone, Debug)]
pub struct WavFixture {
    pub riff: [u8; 4],
    pub wave: [u8; 4],
    pub fmt: [u8; 4],
    pub data: [u8; 4],
    pub format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub frames: usize,
    /// Declared `fmt ` size. Bytes past the first 16 are written as zeros.
    pub fmt_size: u32,
    /// Puts a `JUNK` chunk first, the way broadcast WAV writers reserve
    /// header space.
    pub junk_chunk: bool,
    /// Puts a `LIST` chunk ahead of `fmt `.
    pub list_chunk: bool,
    /// Puts an odd-sized unknown chunk between `fmt ` and `data`.
    pub odd_chunk: bool,
    /// Cuts the image to this many bytes.
    pub truncate_to: Option<usize>,
    pub seed: u64,
}

impl Default for WavFixture {
    fn default() -> WavFixture {
        WavFixture {
            riff: *b"RIFF",
            wave: *b"WAVE",
            fmt: *b"fmt ",
            data: *b"data",
            format: 1,
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            frames: 4410,
            fmt_size: 16,
            junk_chunk: false,
            list_chunk: false,
            odd_chunk: false,
            truncate_to: None,
            seed: 0,
        }
    }
}

impl WavFixture {
    pub fn new(channels: u16, sample_rate: u32, frames: usize) -> WavFixture {
        WavFixture {
            channels,
            sample_rate,
            frames,
            ..WavFixture::default()
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    pub fn data_size(&self) -> u32 {
        (self.frames * self.block_align() as usize) as u32
    }

    /// Interleaved 16-bit noise, reproducible from `seed`.
    pub fn samples(&self) -> Vec<i16> {
        let mut rng = Pcg64Mcg::new(self.seed as u128);
        let count = self.frames * self.channels as usize;
        iter::from_fn(|| Some(rng.gen_range(i16::MIN / 4..=i16::MAX / 4)))
            .take(count)
            .collect()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let samples = self.samples();
        let mut body = Vec::new();

        if self.junk_chunk {
            body.extend_from_slice(b"JUNK");
            body.extend_from_slice(&28u32.to_le_bytes());
            body.extend_from_slice(&[0; 28]);
        }

        if self.list_chunk {
            let info = b"INFOISFT\x08\x00\x00\x00wavpress";
            body.extend_from_slice(b"LIST");
            body.extend_from_slice(&(info.len() as u32).to_le_bytes());
            body.extend_from_slice(info);
        }

        body.extend_from_slice(&self.fmt);
        body.extend_from_slice(&self.fmt_size.to_le_bytes());
        body.extend_from_slice(&self.format.to_le_bytes());
        body.extend_from_slice(&self.channels.to_le_bytes());
        body.extend_from_slice(&self.sample_rate.to_le_bytes());
        body.extend_from_slice(&self.byte_rate().to_le_bytes());
        body.extend_from_slice(&self.block_align().to_le_bytes());
        body.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        let extra = self.fmt_size.saturating_sub(16) as usize;
        body.extend(iter::repeat_n(0, extra + (extra & 1)));

        if self.odd_chunk {
            body.extend_from_slice(b"junk");
            body.extend_from_slice(&3u32.to_le_bytes());
            body.extend_from_slice(&[1, 2, 3, 0]);
        }

        body.extend_from_slice(&self.data);
        body.extend_from_slice(&self.data_size().to_le_bytes());
        for sample in &samples {
            body.extend_from_slice(&sample.to_le_bytes());
        }

        let mut image = Vec::with_capacity(body.len() + 12);
        image.extend_from_slice(&self.riff);
        image.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
        image.extend_from_slice(&self.wave);
        image.extend_from_slice(&body);

        if let Some(len) = self.truncate_to {
            image.truncate(len);
        }
        image
    }

    /// Writes the file and returns the interleaved samples it holds.
    pub fn write(&self, path: &Path) -> AnyResult<Vec<i16>> {
        fs::write(path, self.to_bytes())?;
        Ok(self.samples())
    }
}

/// Writes a valid 16-bit PCM file filled with noise.
pub fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) -> AnyResult<Vec<i16>> {
    WavFixture::new(channels, sample_rate, frames).write(path)
}

/// A file that starts like a WAV but is cut off inside the header.
pub fn write_corrupt_wav(path: &Path) -> AnyResult<()> {
    let fixture = WavFixture {
        truncate_to: Some(30),
        ..WavFixture::default()
    };
    fixture.write(path)?;
    Ok(())
}

/// Splits interleaved samples into per-channel vectors.
pub fn deinterleave(samples: &[i16], channels: u16) -> Vec<Vec<i16>> {
    let channels = channels as usize;
    (0..channels)
        .map(|ch| samples.iter().skip(ch).step_by(channels).copied().collect())
        .collect()
}
