use anyhow::{Result as AnyResult, bail, ensure};
use itertools::Itertools;
use std::fs;
use wavpress::codecs::{self, EncoderSettings};
use wavpress::status::{Outcome, StatusSink};
use wavpress::testsupport::*;
use wavpress::types::Codec;

fn main() {
    use libtest_mimic::{Arguments, Trial};

    let args = Arguments::from_args();

    let tests = all_single_test_cases()
        .map(|test| {
            let name = format!(
                "encode_{}_{}ch_{}hz",
                test.codec, test.channels, test.sample_rate,
            );
            Trial::test(name, move || {
                Ok(run_single_test_case(test)?)
            })
        }).collect();

    libtest_mimic::run(&args, tests).exit();
}

struct SingleTestCase {
    codec: Codec,
    channels: u16,
    sample_rate: u32,
}

fn all_single_test_cases() -> impl Iterator<Item = SingleTestCase> {
    const CHANNELS: &[u16] = &[1, 2];
    const SAMPLE_RATES: &[u32] = &[22_050, 44_100, 48_000];

    Codec::ALL.iter().copied()
        .cartesian_product(CHANNELS.iter().copied())
        .cartesian_product(SAMPLE_RATES.iter().copied())
        .map(|((codec, channels), sample_rate)| {
            SingleTestCase {
                codec, channels, sample_rate,
            }
        })
}

fn run_single_test_case(test: SingleTestCase) -> AnyResult<()> {
    let tempdir = tempfile::tempdir()?;
    let in_dir = tempdir.path().join("in");
    let out_dir = tempdir.path().join("out");
    fs::create_dir_all(&in_dir)?;
    fs::create_dir_all(&out_dir)?;

    let infile = in_dir.join("test.wav");
    // Half a second.
    write_wav(&infile, test.channels, test.sample_rate, test.sample_rate as usize / 2)?;

    let backend = codecs::create_encoder(test.codec.format_type(), &EncoderSettings::default())
        .ok_or_else(|| anyhow::anyhow!("no backend for {}", test.codec))?;
    ensure!(backend.codec() == test.codec);
    ensure!(!backend.version().is_empty());

    let status = StatusSink::new(false);
    let outfile = backend.encode_one(&infile, &out_dir, 1, &status)?;

    ensure!(outfile == out_dir.join(format!("test{}", test.codec.extension())));
    let records = status.drain();
    ensure!(records.len() == 1);
    ensure!(records[0].outcome == Outcome::Complete);

    let bytes = fs::read(&outfile)?;
    ensure!(bytes.len() > 64, "only {} bytes written", bytes.len());
    check_magic(test.codec, &bytes)
}

fn check_magic(codec: Codec, bytes: &[u8]) -> AnyResult<()> {
    let ok = match codec {
        Codec::Flac => bytes.starts_with(b"fLaC"),
        Codec::Vorbis => bytes.starts_with(b"OggS") && bytes[28..35] == *b"\x01vorbis",
        Codec::Opus => bytes.starts_with(b"OggS") && bytes[28..36] == *b"OpusHead",
        Codec::Mp3 => bytes.starts_with(b"ID3") || (bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0),
        Codec::Aac => bytes[0] == 0xFF && bytes[1] & 0xF0 == 0xF0,
    };
    if !ok {
        bail!("{codec} output starts with {:02x?}", &bytes[..8]);
    }
    Ok(())
}
