use assert_cmd::Command;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use wavpress::testsupport::{write_corrupt_wav, write_wav};

type TestResult = Result<(), Box<dyn Error>>;

fn wavpress() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("wavpress")?;
    cmd.env("RUST_LOG", "warn");
    Ok(cmd)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();
    Ok(entries)
}

#[test]
fn encodes_a_directory_to_flac() -> TestResult {
    let input_dir = tempdir()?;
    write_wav(&input_dir.path().join("one.wav"), 2, 44_100, 4410)?;
    write_wav(&input_dir.path().join("two.wav"), 1, 22_050, 2205)?;
    write_corrupt_wav(&input_dir.path().join("broken.wav"))?;

    let output_root = tempdir()?;
    let output_dir = output_root.path().join("nested").join("out");

    let output = wavpress()?
        .arg("-i").arg(input_dir.path())
        .arg("-o").arg(&output_dir)
        .args(["-j", "2"])
        .output()?;
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Found 2 files"), "{stdout}");
    assert!(stdout.contains("Encoded 2 of 2 files"), "{stdout}");

    let outputs = sorted_entries(&output_dir)?;
    assert_eq!(outputs.len(), 2);
    for path in outputs {
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("flac"));
        assert!(fs::metadata(&path)?.len() > 0);
    }
    Ok(())
}

#[test]
fn missing_input_directory_fails() -> TestResult {
    let root = tempdir()?;
    wavpress()?
        .arg("-i").arg(root.path().join("absent"))
        .arg("-o").arg(root.path().join("out"))
        .assert()
        .failure()
        .code(1);
    Ok(())
}

#[test]
fn empty_input_directory_is_not_an_error() -> TestResult {
    let input_dir = tempdir()?;
    let output_dir = tempdir()?;

    let output = wavpress()?
        .arg("-i").arg(input_dir.path())
        .arg("-o").arg(output_dir.path())
        .output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("No files found"));
    Ok(())
}

#[test]
fn unsupported_format_fails() -> TestResult {
    let input_dir = tempdir()?;
    write_wav(&input_dir.path().join("one.wav"), 2, 44_100, 441)?;
    let root = tempdir()?;
    let output_dir = root.path().join("new").join("dir");

    wavpress()?
        .arg("-i").arg(input_dir.path())
        .arg("-o").arg(&output_dir)
        .args(["-f", "wma"])
        .assert()
        .failure()
        .code(1);
    assert!(sorted_entries(root.path())?.is_empty());
    Ok(())
}

#[test]
fn output_path_blocked_by_a_file_fails() -> TestResult {
    let input_dir = tempdir()?;
    write_wav(&input_dir.path().join("one.wav"), 2, 44_100, 441)?;
    let root = tempdir()?;
    let blocker = root.path().join("out");
    fs::write(&blocker, b"not a directory")?;

    wavpress()?
        .arg("-i").arg(input_dir.path())
        .arg("-o").arg(&blocker)
        .assert()
        .failure()
        .code(1);
    Ok(())
}

#[test]
fn config_file_and_status_log() -> TestResult {
    let input_dir = tempdir()?;
    write_wav(&input_dir.path().join("a.wav"), 2, 44_100, 4410)?;
    write_wav(&input_dir.path().join("b.wav"), 2, 44_100, 4410)?;

    let root = tempdir()?;
    let output_dir = root.path().join("out");
    let config = root.path().join("wavpress.toml");
    let status_log = root.path().join("status.log");
    fs::write(&config, "format = \"flac\"\nthreads = 1\n\n[encoder]\nflac_compression_level = 8\n")?;

    wavpress()?
        .arg("-i").arg(input_dir.path())
        .arg("-o").arg(&output_dir)
        .arg("-c").arg(&config)
        .arg("--status-log").arg(&status_log)
        .assert()
        .success();

    let log = fs::read_to_string(&status_log)?;
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 2, "{log}");
    assert!(lines.iter().all(|l| l.starts_with("[worker 1] Complete")), "{log}");
    assert_eq!(sorted_entries(&output_dir)?.len(), 2);
    Ok(())
}

#[test]
fn unreadable_config_fails() -> TestResult {
    let input_dir = tempdir()?;
    let root = tempdir()?;
    let config = root.path().join("bad.toml");
    fs::write(&config, "threads = \"many\"")?;

    wavpress()?
        .arg("-i").arg(input_dir.path())
        .arg("-o").arg(root.path().join("out"))
        .arg("-c").arg(&config)
        .assert()
        .failure()
        .code(1);
    Ok(())
}

#[cfg(unix)]
#[test]
fn dangling_link_in_input_is_skipped() -> TestResult {
    let input_dir = tempdir()?;
    write_wav(&input_dir.path().join("a.wav"), 2, 44_100, 441)?;
    write_wav(&input_dir.path().join("b.wav"), 2, 44_100, 441)?;
    std::os::unix::fs::symlink(
        input_dir.path().join("gone.wav"),
        input_dir.path().join("link.wav"),
    )?;
    let output_dir = tempdir()?;

    let output = wavpress()?
        .arg("-i").arg(input_dir.path())
        .arg("-o").arg(output_dir.path())
        .output()?;
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8(output.stdout)?.contains("Encoded 2 of 2 files"));
    assert_eq!(sorted_entries(output_dir.path())?.len(), 2);
    Ok(())
}
