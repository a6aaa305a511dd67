use anyhow::Result as AnyResult;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use wavpress::codecs::{self, EncoderBackend, EncoderSettings};
use wavpress::convert::{CancelToken, Config, Coordinator};
use wavpress::error::{EncodeError, ErrorCode};
use wavpress::io::PcmBuffer;
use wavpress::status::Outcome;
use wavpress::testsupport::*;
use wavpress::types::{AudioFormatType, Codec};
use wavpress::wav::WaveHeader;

fn output_files(dir: &Path) -> AnyResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    files.sort();
    Ok(files)
}

fn flac_coordinator(out_dir: &Path, threads: usize) -> Coordinator {
    let backend = codecs::create_encoder(AudioFormatType::Flac, &EncoderSettings::default())
        .expect("flac backend");
    Coordinator::new(backend, Config {
        input_type: AudioFormatType::Wav,
        output_dir: out_dir.to_owned(),
        threads,
        verbose: false,
    })
}

#[test]
fn three_valid_one_corrupt_to_flac() -> AnyResult<()> {
    let tempdir = tempfile::tempdir()?;
    let in_dir = tempdir.path().join("in");
    let out_dir = tempdir.path().join("out");
    fs::create_dir_all(&in_dir)?;
    fs::create_dir_all(&out_dir)?;

    write_wav(&in_dir.join("a.wav"), 2, 44_100, 4410)?;
    write_wav(&in_dir.join("b.wav"), 1, 48_000, 4800)?;
    WavFixture {
        list_chunk: true,
        ..WavFixture::new(2, 22_050, 2205)
    }.write(&in_dir.join("c.wav"))?;
    write_corrupt_wav(&in_dir.join("d.wav"))?;

    let mut coord = flac_coordinator(&out_dir, 2);
    assert_eq!(coord.scan_input_directory(&in_dir)?, 3);

    let report = coord.start_encoding()?;
    assert_eq!(report.completed, 3);
    assert_eq!(report.failed, 0);

    let outputs = output_files(&out_dir)?;
    let names: Vec<_> = outputs.iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.flac", "b.flac", "c.flac"]);
    for path in &outputs {
        let bytes = fs::read(path)?;
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[..4], b"fLaC");
    }

    let records = coord.status().drain();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.outcome == Outcome::Complete));
    Ok(())
}

#[test]
fn undecodable_files_fail_without_failing_the_run() -> AnyResult<()> {
    let tempdir = tempfile::tempdir()?;
    let in_dir = tempdir.path().join("in");
    let out_dir = tempdir.path().join("out");
    fs::create_dir_all(&in_dir)?;
    fs::create_dir_all(&out_dir)?;

    write_wav(&in_dir.join("ok.wav"), 2, 44_100, 1000)?;
    WavFixture {
        bits_per_sample: 24,
        ..WavFixture::default()
    }.write(&in_dir.join("wide.wav"))?;

    let mut coord = flac_coordinator(&out_dir, 2);
    assert_eq!(coord.scan_input_directory(&in_dir)?, 2);

    let report = coord.start_encoding()?;
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 1);

    let records = coord.status().drain();
    assert!(records.iter().any(|r| r.outcome == Outcome::Failed(ErrorCode::ReadFile)));
    assert_eq!(output_files(&out_dir)?.len(), 1);
    Ok(())
}

/// Cancels the run once its first file is done.
struct CancelAfterFirst {
    inner: Box<dyn EncoderBackend>,
    token: Arc<OnceLock<CancelToken>>,
}

impl EncoderBackend for CancelAfterFirst {
    fn codec(&self) -> Codec {
        self.inner.codec()
    }

    fn version(&self) -> String {
        self.inner.version()
    }

    fn encode_pcm(
        &self,
        header: &WaveHeader,
        pcm: &PcmBuffer,
        out_path: &Path,
    ) -> Result<(), EncodeError> {
        let result = self.inner.encode_pcm(header, pcm, out_path);
        if let Some(token) = self.token.get() {
            token.cancel();
        }
        result
    }
}

#[test]
fn cancellation_stops_after_the_file_in_flight() -> AnyResult<()> {
    let tempdir = tempfile::tempdir()?;
    let in_dir = tempdir.path().join("in");
    let out_dir = tempdir.path().join("out");
    fs::create_dir_all(&in_dir)?;
    fs::create_dir_all(&out_dir)?;

    for i in 0..5 {
        write_wav(&in_dir.join(format!("{i}.wav")), 1, 44_100, 1000)?;
    }

    let token = Arc::new(OnceLock::new());
    let backend = CancelAfterFirst {
        inner: codecs::create_encoder(AudioFormatType::Flac, &EncoderSettings::default())
            .expect("flac backend"),
        token: token.clone(),
    };
    let mut coord = Coordinator::new(Box::new(backend), Config {
        input_type: AudioFormatType::Wav,
        output_dir: out_dir.clone(),
        threads: 1,
        verbose: false,
    });
    token.set(coord.cancel_token()).expect("token set twice");

    coord.scan_input_directory(&in_dir)?;
    let report = coord.start_encoding()?;

    assert_eq!(report.claimed, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.cancelled, 4);
    assert_eq!(coord.status().len(), 1);
    assert_eq!(output_files(&out_dir)?.len(), 1);
    assert!(!coord.cancel_token().is_cancelled());
    Ok(())
}

#[test]
fn missing_output_directory_is_an_io_failure() -> AnyResult<()> {
    let tempdir = tempfile::tempdir()?;
    let in_dir = tempdir.path().join("in");
    fs::create_dir_all(&in_dir)?;
    write_wav(&in_dir.join("a.wav"), 2, 44_100, 1000)?;

    let mut coord = flac_coordinator(&tempdir.path().join("nowhere"), 1);
    coord.scan_input_directory(&in_dir)?;
    let report = coord.start_encoding()?;
    assert_eq!(report.failed, 1);

    let records = coord.status().drain();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, Outcome::Failed(ErrorCode::Io));
    Ok(())
}

#[cfg(unix)]
#[test]
fn dangling_link_does_not_hide_valid_files() -> AnyResult<()> {
    let tempdir = tempfile::tempdir()?;
    let in_dir = tempdir.path().join("in");
    let out_dir = tempdir.path().join("out");
    fs::create_dir_all(&in_dir)?;
    fs::create_dir_all(&out_dir)?;
    write_wav(&in_dir.join("a.wav"), 2, 44_100, 1000)?;
    write_wav(&in_dir.join("b.wav"), 1, 22_050, 1000)?;
    std::os::unix::fs::symlink(in_dir.join("gone.wav"), in_dir.join("link.wav"))?;

    let mut coord = flac_coordinator(&out_dir, 2);
    assert_eq!(coord.scan_input_directory(&in_dir)?, 2);
    assert_eq!(coord.input_files(), [in_dir.join("a.wav"), in_dir.join("b.wav")]);

    let report = coord.start_encoding()?;
    assert_eq!(report.completed, 2);
    assert_eq!(output_files(&out_dir)?, [out_dir.join("a.flac"), out_dir.join("b.flac")]);
    Ok(())
}
