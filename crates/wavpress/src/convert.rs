mod config {
    use crate::types::AudioFormatType;
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;

    #[derive(Serialize, Deserialize)]
    #[derive(PartialEq)]
    #[derive(Clone)]
    #[derive(Debug)]
    #[serde(default)]
    pub struct Config {
        /// Files of any other type are dropped during the scan. Only `Wav`
        /// filters; anything else keeps every file.
        pub input_type: AudioFormatType,
        pub output_dir: PathBuf,
        pub threads: usize,
        pub verbose: bool,
    }

    impl Default for Config {
        fn default() -> Config {
            Config {
                input_type: AudioFormatType::Wav,
                output_dir: PathBuf::from("."),
                threads: default_threads(),
                verbose: false,
            }
        }
    }

    /// Half the available parallelism, at least one.
    pub fn default_threads() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get() / 2)
            .unwrap_or(1)
            .max(1)
    }
}

pub use config::*;

use crate::codecs::EncoderBackend;
use crate::error::{CoordinatorError, ErrorCode};
use crate::fs as wfs;
use crate::status::StatusSink;
use crate::types::AudioFormatType;
use crate::wav;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

/// Cooperative stop flag shared by a coordinator and its workers.
///
/// Workers check it before each claim. An encode already in flight always
/// runs to completion.
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Eq, PartialEq)]
#[derive(Copy, Clone)]
#[derive(Debug)]
pub enum CoordinatorState {
    Idle,
    Scanning,
    Running,
    Drained,
    Joined,
}

/// Tally of one `start_encoding` run.
///
/// `cancelled` counts jobs never claimed because the token was set.
#[derive(Eq, PartialEq)]
#[derive(Copy, Clone, Default)]
#[derive(Debug)]
pub struct RunReport {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} completed, {} failed, {} cancelled",
            self.completed, self.failed, self.cancelled,
        )
    }
}

#[derive(Default)]
struct Tally {
    claimed: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Runs one backend over a directory of files with a fixed pool of worker
/// threads.
///
/// The job set and cancel token belong to this coordinator alone, so
/// separate coordinators never contend.
pub struct Coordinator {
    backend: Box<dyn EncoderBackend>,
    config: Config,
    input_files: Vec<PathBuf>,
    jobs: Mutex<BTreeMap<PathBuf, bool>>,
    cancel: CancelToken,
    status: StatusSink,
    state: Mutex<CoordinatorState>,
}

impl Coordinator {
    pub fn new(backend: Box<dyn EncoderBackend>, config: Config) -> Coordinator {
        let status = StatusSink::new(config.verbose);
        Coordinator {
            backend,
            config,
            input_files: Vec::new(),
            jobs: Mutex::new(BTreeMap::new()),
            cancel: CancelToken::new(),
            status,
            state: Mutex::new(CoordinatorState::Idle),
        }
    }

    /// Collects the candidate files below `dir` and returns how many there
    /// are.
    pub fn scan_input_directory(&mut self, dir: &Path) -> Result<usize, CoordinatorError> {
        self.set_state(CoordinatorState::Scanning);
        self.input_files.clear();
        let result = self.scan(dir);
        self.set_state(CoordinatorState::Idle);

        let files = result?;
        log::info!("found {} input files in {}", files.len(), dir.display());
        self.input_files = files;
        Ok(self.input_files.len())
    }

    fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>, CoordinatorError> {
        if !wfs::directory_exists(dir) {
            return Err(CoordinatorError::NotFound(format!(
                "input directory {} does not exist",
                dir.display(),
            )));
        }

        let paths = wfs::get_file_paths(dir).map_err(|source| CoordinatorError::Listing {
            dir: dir.to_owned(),
            source,
        })?;

        let files: Vec<PathBuf> = if self.config.input_type == AudioFormatType::Wav {
            paths.into_iter()
                .filter(|path| {
                    let valid = wav::validate(path).is_some();
                    if !valid {
                        log::debug!("skipping {}: not a usable wav file", path.display());
                    }
                    valid
                })
                .collect()
        } else {
            paths
        };

        if files.is_empty() {
            return Err(CoordinatorError::NotFound(format!(
                "no {} files in {}",
                self.config.input_type,
                dir.display(),
            )));
        }

        Ok(files)
    }

    /// Encodes every scanned file and blocks until all workers have exited.
    ///
    /// Per-file failures only show up in [`Coordinator::status`] and the
    /// returned report; they never make this return `Err`.
    pub fn start_encoding(&self) -> Result<RunReport, CoordinatorError> {
        if self.input_files.is_empty() {
            return Err(CoordinatorError::NotFound(String::from("no input files to encode")));
        }

        {
            let mut state = self.lock_state();
            if matches!(*state, CoordinatorState::Running | CoordinatorState::Drained) {
                return Err(CoordinatorError::Busy);
            }
            *state = CoordinatorState::Running;
        }

        self.cancel.reset();
        {
            let mut jobs = self.lock_jobs();
            jobs.clear();
            jobs.extend(self.input_files.iter().map(|path| (path.clone(), false)));
        }

        let threads = self.config.threads.max(1);
        log::info!(
            "encoding {} files to {} with {threads} threads ({})",
            self.input_files.len(),
            self.config.output_dir.display(),
            self.backend.codec(),
        );

        let tally = Tally::default();
        let result = self.run_workers(threads, &tally);

        self.set_state(CoordinatorState::Joined);
        let unclaimed = {
            let mut jobs = self.lock_jobs();
            let unclaimed = jobs.values().filter(|claimed| !**claimed).count();
            jobs.clear();
            unclaimed
        };
        let was_cancelled = self.cancel.is_cancelled();
        self.cancel.reset();
        self.set_state(CoordinatorState::Idle);

        result?;

        let report = RunReport {
            claimed: tally.claimed.load(Ordering::SeqCst),
            completed: tally.completed.load(Ordering::SeqCst),
            failed: tally.failed.load(Ordering::SeqCst),
            cancelled: if was_cancelled { unclaimed } else { 0 },
        };
        log::info!("run finished: {report}");
        Ok(report)
    }

    fn run_workers(&self, threads: usize, tally: &Tally) -> Result<(), CoordinatorError> {
        let output_dir = self.config.output_dir.as_path();

        let result = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(threads);

            for worker_id in 1..=threads as u32 {
                let spawned = thread::Builder::new()
                    .name(format!("wavpress-worker-{worker_id}"))
                    .spawn_scoped(scope, move || self.worker_loop(worker_id, output_dir, tally));

                match spawned {
                    Ok(handle) => handles.push((worker_id, handle)),
                    Err(source) => {
                        log::error!("failed to spawn worker {worker_id}: {source}");
                        self.cancel.cancel();
                        for (_, handle) in handles {
                            let _ = handle.join();
                        }
                        return Err(CoordinatorError::ThreadSpawn { worker_id, source });
                    }
                }
            }

            let mut panicked = None;
            for (worker_id, handle) in handles {
                if handle.join().is_err() {
                    log::error!("worker {worker_id} panicked");
                    panicked.get_or_insert(worker_id);
                }
            }

            match panicked {
                Some(worker_id) => Err(CoordinatorError::ThreadJoin(worker_id)),
                None => Ok(()),
            }
        });

        self.set_state(CoordinatorState::Drained);
        result
    }

    fn worker_loop(&self, worker_id: u32, output_dir: &Path, tally: &Tally) {
        loop {
            if self.cancel.is_cancelled() {
                log::debug!("worker {worker_id}: cancelled");
                break;
            }

            let Some(path) = self.claim_next() else {
                break;
            };
            tally.claimed.fetch_add(1, Ordering::SeqCst);
            log::debug!("worker {worker_id}: claimed {}", path.display());

            match self.backend.encode_one(&path, output_dir, worker_id, &self.status) {
                Ok(_) => tally.completed.fetch_add(1, Ordering::SeqCst),
                Err(_) => tally.failed.fetch_add(1, Ordering::SeqCst),
            };
        }
    }

    /// Marks the first unclaimed job in path order as claimed.
    fn claim_next(&self) -> Option<PathBuf> {
        let mut jobs = self.lock_jobs();
        let (path, claimed) = jobs.iter_mut().find(|(_, claimed)| !**claimed)?;
        *claimed = true;
        Some(path.clone())
    }

    /// Asks workers to stop after their current file. Returns immediately.
    pub fn cancel_encoding(&self) -> ErrorCode {
        log::info!("cancellation requested");
        self.cancel.cancel();
        ErrorCode::Cancelled
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn status(&self) -> &StatusSink {
        &self.status
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    pub fn output_directory(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn set_output_directory(&mut self, dir: impl Into<PathBuf>) {
        self.config.output_dir = dir.into();
    }

    pub fn encoder_version(&self) -> String {
        self.backend.version()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> CoordinatorState {
        *self.lock_state()
    }

    fn set_state(&self, state: CoordinatorState) {
        *self.lock_state() = state;
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_jobs(&self) -> MutexGuard<'_, BTreeMap<PathBuf, bool>> {
        // Claims are a single flag flip; a poisoned map is still consistent.
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}
