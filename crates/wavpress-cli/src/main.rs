use anyhow::{Context, Result as AnyResult, bail};
use clap::Parser as _;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use wavpress::codecs::{self, EncoderSettings};
use wavpress::convert::{self as cvt, Coordinator};
use wavpress::error::{CoordinatorError, ErrorCode};
use wavpress::fs as wfs;
use wavpress::types::AudioFormatType;

mod interrupt;

const DEFAULT_FORMAT: &str = "flac";

fn main() -> AnyResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cli.run()
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Batch-convert WAV files to a compressed format.
#[derive(clap::Parser)]
#[command(name = "wavpress", version, about)]
struct Cli {
    /// Directory of WAV files, searched recursively.
    #[arg(short, long)]
    input: PathBuf,
    /// Directory for encoded files. Created if missing.
    #[arg(short, long)]
    output: PathBuf,
    /// flac, mp3, opus, aac or vorbis.
    #[arg(short, long)]
    format: Option<String>,
    /// Worker threads. Defaults to half the available cores.
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    /// Echo each file's status and log at debug level.
    #[arg(short, long)]
    verbose: bool,
    /// TOML file with encoder settings and defaults for the flags.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write every status record to this file after the run.
    #[arg(long)]
    status_log: Option<PathBuf>,
}

/// Contents of `--config`. Flags given on the command line win.
#[derive(Serialize, Deserialize)]
#[derive(Default)]
#[serde(default)]
struct FileConfig {
    format: Option<String>,
    threads: Option<usize>,
    encoder: EncoderSettings,
}

impl FileConfig {
    fn load(path: &Path) -> AnyResult<FileConfig> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

impl Cli {
    fn run(&self) -> AnyResult<()> {
        let file_config = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let format = self.format.as_deref()
            .or(file_config.format.as_deref())
            .unwrap_or(DEFAULT_FORMAT);
        let threads = self.threads
            .or(file_config.threads)
            .unwrap_or_else(cvt::default_threads);

        let input_dir = wfs::canonical_path(&self.input)
            .ok()
            .filter(|p| wfs::directory_exists(p))
            .with_context(|| format!("input directory {} does not exist", self.input.display()))?;

        let format_type = codecs::string_to_format_type(format);
        let Some(backend) = codecs::create_encoder(format_type, &file_config.encoder) else {
            bail!(
                "{}: unsupported format {format:?}, expected one of {}",
                ErrorCode::NotImplemented,
                codecs::supported_formats().join(", "),
            );
        };

        wfs::ensure_directory_exists(&self.output)
            .with_context(|| format!("creating output directory {}", self.output.display()))?;
        let output_dir = wfs::canonical_path(&self.output)?;

        let mut coordinator = Coordinator::new(backend, cvt::Config {
            input_type: AudioFormatType::Wav,
            output_dir: output_dir.clone(),
            threads,
            verbose: self.verbose,
        });

        match coordinator.scan_input_directory(&input_dir) {
            Ok(_) => {}
            Err(CoordinatorError::NotFound(reason)) => {
                println!("No files found: {reason}");
                return Ok(());
            }
            Err(e) => return Err(e).context("scanning input directory"),
        }

        println!("Found {} files:", coordinator.input_files().len());
        for path in coordinator.input_files() {
            println!("  {}", path.display());
        }
        println!("Encoder: {}", coordinator.encoder_version());
        println!("Output: {} ({} threads)", output_dir.display(), threads);

        interrupt::init(coordinator.cancel_token())?;

        let report = coordinator.start_encoding()
            .context("encoding")?;

        if let Some(path) = &self.status_log {
            write_status_log(&coordinator, path)?;
        }

        println!(
            "Encoded {} of {} files ({report})",
            report.completed,
            coordinator.input_files().len(),
        );
        if report.cancelled > 0 {
            println!("{}: {} files were not started", ErrorCode::Cancelled, report.cancelled);
        }

        Ok(())
    }
}

fn write_status_log(coordinator: &Coordinator, path: &Path) -> AnyResult<()> {
    let file = File::create(path)
        .with_context(|| format!("creating status log {}", path.display()))?;
    let written = coordinator.status().write_log(BufWriter::new(file))
        .with_context(|| format!("writing status log {}", path.display()))?;
    log::debug!("wrote {written} status records to {}", path.display());
    Ok(())
}
