//! RIFF/WAVE container parsing.
//!
//! Only canonical PCM files are accepted: a `RIFF`/`WAVE` envelope, a `fmt `
//! chunk with format code 1, and a `data` chunk. `LIST` and other chunks are
//! stepped over by their declared size.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use crate::error::WavError;
use crate::io::PcmBuffer;

pub const MIN_HEADER_SIZE: usize = 44;
pub const PCM_FORMAT: u16 = 1;

const RIFF: &[u8; 4] = b"RIFF";
const WAVE: &[u8; 4] = b"WAVE";
const FMT: &[u8; 4] = b"fmt ";
const DATA: &[u8; 4] = b"data";

const FMT_PCM_SIZE: u32 = 16;

#[derive(Eq, PartialEq)]
#[derive(Copy, Clone)]
#[derive(Debug, Default)]
pub struct WaveHeader {
    pub riff: [u8; 4],
    pub file_length: u32,
    pub wave: [u8; 4],
    pub fmt: [u8; 4],
    /// Declared `fmt ` chunk size, 16 or 18 in practice.
    pub chunk_size: u32,
    pub format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data: [u8; 4],
    pub data_size: u32,
    /// Absolute file offset of the first PCM byte.
    pub data_offset: u64,
}

impl WaveHeader {
    /// Number of sample frames in the data chunk.
    pub fn samples_total(&self) -> u32 {
        self.data_size / self.block_align as u32
    }

    /// Samples per channel, as `get_pcm` sizes its arrays.
    pub fn samples_per_channel(&self) -> usize {
        self.data_size as usize / self.channels as usize / 2
    }
}

/// Byte readers over an in-memory file image.
///
/// Every reader is bounds checked and reports the offending offset.
pub mod bytes {
    use crate::error::WavError;

    /// Copies `dest.len()` bytes starting at `pos` into `dest`.
    pub fn read_tag(input: &[u8], pos: usize, dest: &mut [u8]) -> Result<(), WavError> {
        let end = pos.checked_add(dest.len())
            .ok_or(WavError::Truncated(pos))?;
        let src = input.get(pos..end)
            .ok_or(WavError::Truncated(pos))?;
        dest.copy_from_slice(src);
        Ok(())
    }

    pub fn read_u16_le(input: &[u8], pos: usize) -> Result<u16, WavError> {
        let mut buf = [0; 2];
        read_tag(input, pos, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32_le(input: &[u8], pos: usize) -> Result<u32, WavError> {
        let mut buf = [0; 4];
        read_tag(input, pos, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u32_be(input: &[u8], pos: usize) -> Result<u32, WavError> {
        let mut buf = [0; 4];
        read_tag(input, pos, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }
}

/// Returns the parsed header if `path` is a valid PCM WAV file.
pub fn validate(path: &Path) -> Option<WaveHeader> {
    match validate_with_reason(path) {
        Ok(header) => Some(header),
        Err(e) => {
            log::debug!("rejecting {}: {e}", path.display());
            None
        }
    }
}

pub fn validate_with_reason(path: &Path) -> Result<WaveHeader, WavError> {
    let contents = fs::read(path)?;
    parse_header(&contents)
}

/// Parses the header out of a whole-file image.
pub fn parse_header(contents: &[u8]) -> Result<WaveHeader, WavError> {
    use bytes::*;

    if contents.len() < MIN_HEADER_SIZE {
        return Err(WavError::TooShort(contents.len()));
    }

    let mut header = WaveHeader::default();

    read_tag(contents, 0, &mut header.riff)?;
    expect_tag(&header.riff, RIFF)?;
    header.file_length = read_u32_le(contents, 4)?;
    read_tag(contents, 8, &mut header.wave)?;
    expect_tag(&header.wave, WAVE)?;

    let mut pos = 12;
    let mut found_fmt = false;

    loop {
        let mut tag = [0; 4];
        if read_tag(contents, pos, &mut tag).is_err() {
            break;
        }
        let size = read_u32_le(contents, pos + 4)?;
        let body = pos + 8;

        if &tag == FMT {
            if size < FMT_PCM_SIZE {
                return Err(WavError::Truncated(pos));
            }
            header.fmt = tag;
            header.chunk_size = size;
            header.format = read_u16_le(contents, body)?;
            header.channels = read_u16_le(contents, body + 2)?;
            header.sample_rate = read_u32_le(contents, body + 4)?;
            header.byte_rate = read_u32_le(contents, body + 8)?;
            header.block_align = read_u16_le(contents, body + 12)?;
            header.bits_per_sample = read_u16_le(contents, body + 14)?;

            if header.format != PCM_FORMAT {
                return Err(WavError::NotPcm(header.format));
            }

            found_fmt = true;
            pos = next_chunk(body, size);
        } else if &tag == DATA {
            if !found_fmt {
                return Err(WavError::DataBeforeFmt);
            }
            header.data = tag;
            header.data_size = size;
            header.data_offset = body as u64;
            break;
        } else {
            log::trace!("skipping {:?} chunk at {pos}", String::from_utf8_lossy(&tag));
            pos = next_chunk(body, size);
        }
    }

    if !found_fmt {
        return Err(WavError::TagMismatch {
            expected: "fmt ",
            found: String::new(),
        });
    }

    if &header.data != DATA {
        return Err(WavError::MissingData);
    }

    if header.channels == 0 {
        return Err(WavError::ZeroField("channels"));
    }
    if header.block_align == 0 {
        return Err(WavError::ZeroField("block_align"));
    }
    if header.data_size == 0 {
        return Err(WavError::ZeroField("data_size"));
    }

    Ok(header)
}

fn expect_tag(found: &[u8; 4], expected: &'static [u8; 4]) -> Result<(), WavError> {
    if found == expected {
        Ok(())
    } else {
        Err(WavError::TagMismatch {
            expected: std::str::from_utf8(expected).unwrap_or("????"),
            found: String::from_utf8_lossy(found).into_owned(),
        })
    }
}

/// Start of the chunk following one whose body begins at `body`.
/// RIFF chunks are word aligned.
fn next_chunk(body: usize, size: u32) -> usize {
    let size = size as usize;
    body.saturating_add(size).saturating_add(size & 1)
}

/// Reads the 16-bit PCM samples described by `header`.
///
/// Stereo data is deinterleaved into `left` and `right`.
pub fn get_pcm(path: &Path, header: &WaveHeader) -> Result<PcmBuffer, WavError> {
    if header.bits_per_sample != 16 {
        return Err(WavError::UnsupportedBitDepth(header.bits_per_sample));
    }
    if header.channels != 1 && header.channels != 2 {
        return Err(WavError::UnsupportedChannels(header.channels));
    }

    let mut file = File::open(path)?;
    let available = file.metadata()?.len().saturating_sub(header.data_offset);

    let samples = header.samples_per_channel();
    let wanted = samples * header.channels as usize * 2;
    if wanted as u64 > available {
        return Err(WavError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("data chunk claims {wanted} bytes, only {available} in file"),
        )));
    }

    file.seek(SeekFrom::Start(header.data_offset))?;
    let mut raw = vec![0; wanted];
    file.read_exact(&mut raw)?;

    let pcm = match header.channels {
        1 => {
            let left = raw.chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();
            PcmBuffer::mono(left)
        }
        _ => {
            let mut left = Vec::with_capacity(samples);
            let mut right = Vec::with_capacity(samples);
            for frame in raw.chunks_exact(4) {
                left.push(i16::from_le_bytes([frame[0], frame[1]]));
                right.push(i16::from_le_bytes([frame[2], frame[3]]));
            }
            PcmBuffer::stereo(left, right)
        }
    };

    Ok(pcm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::bytes::*;

    #[test]
    fn little_endian_readers() {
        let input = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u16_le(&input, 0).unwrap(), 0x0201);
        assert_eq!(read_u32_le(&input, 0).unwrap(), 0x0403_0201);
        assert_eq!(read_u16_le(&[0xff, 0xff], 0).unwrap(), u16::MAX);
    }

    #[test]
    fn big_endian_reader_shifts_whole_bytes() {
        let input = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(read_u32_be(&input, 0).unwrap(), 0x1234_5678);
        assert_eq!(read_u32_be(&[0xff; 4], 0).unwrap(), u32::MAX);
    }

    #[test]
    fn readers_reject_out_of_bounds() {
        let input = [0u8; 3];
        assert!(read_u32_le(&input, 0).is_err());
        assert!(read_u16_le(&input, 2).is_err());
        assert!(read_u32_be(&input, usize::MAX).is_err());
    }

    #[test]
    fn read_tag_respects_destination_capacity() {
        let input = b"RIFFWAVE";
        let mut small = [0u8; 4];
        read_tag(input, 4, &mut small).unwrap();
        assert_eq!(&small, b"WAVE");

        let mut large = [0u8; 16];
        assert!(matches!(read_tag(input, 0, &mut large), Err(WavError::Truncated(0))));
    }

    #[test]
    fn odd_chunks_are_padded() {
        assert_eq!(next_chunk(20, 4), 24);
        assert_eq!(next_chunk(20, 5), 26);
    }

    #[test]
    fn rejects_short_images() {
        let image = [0u8; MIN_HEADER_SIZE - 1];
        assert!(matches!(parse_header(&image), Err(WavError::TooShort(43))));
    }
}
