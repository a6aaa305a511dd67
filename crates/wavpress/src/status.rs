use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use crate::error::ErrorCode;

#[derive(Eq, PartialEq)]
#[derive(Copy, Clone)]
#[derive(Debug)]
pub enum Outcome {
    Complete,
    Failed(ErrorCode),
}

#[derive(Eq, PartialEq)]
#[derive(Clone)]
#[derive(Debug)]
pub struct StatusRecord {
    pub worker_id: u32,
    pub outcome: Outcome,
    pub message: String,
}

impl std::fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.outcome {
            Outcome::Complete => {
                write!(f, "[worker {}] Complete {}", self.worker_id, self.message)
            }
            Outcome::Failed(code) => {
                write!(f, "[worker {}] Error ({code}) {}", self.worker_id, self.message)
            }
        }
    }
}

/// Append-only, thread-safe log of per-file outcomes.
///
/// Records from one worker keep their order; records from different workers
/// interleave in arrival order.
#[derive(Debug, Default)]
pub struct StatusSink {
    records: Mutex<Vec<StatusRecord>>,
    verbose: bool,
}

impl StatusSink {
    pub fn new(verbose: bool) -> StatusSink {
        StatusSink {
            records: Mutex::new(Vec::new()),
            verbose,
        }
    }

    pub fn append(&self, worker_id: u32, outcome: Outcome, message: impl Into<String>) {
        let record = StatusRecord {
            worker_id,
            outcome,
            message: message.into(),
        };

        let mut records = self.lock();
        if self.verbose {
            println!("{record}");
        }
        records.push(record);
    }

    pub fn complete(&self, worker_id: u32, message: impl Into<String>) {
        self.append(worker_id, Outcome::Complete, message);
    }

    pub fn failed(&self, worker_id: u32, code: ErrorCode, message: impl Into<String>) {
        self.append(worker_id, Outcome::Failed(code), message);
    }

    /// Takes every record appended so far, oldest first.
    pub fn drain(&self) -> Vec<StatusRecord> {
        std::mem::take(&mut *self.lock())
    }

    /// Copies the records without taking them.
    pub fn snapshot(&self) -> Vec<StatusRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drains into `out`, one line per record.
    pub fn write_log(&self, mut out: impl Write) -> io::Result<usize> {
        let records = self.drain();
        for record in &records {
            writeln!(out, "{record}")?;
        }
        out.flush()?;
        Ok(records.len())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StatusRecord>> {
        // A panicking appender can't leave a half-pushed record behind.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}
