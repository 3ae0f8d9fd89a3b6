//! Pipeline drivers: capture, replay, rewrite and transform.
//!
//! The file pipelines (rewrite, transform) share one engine in
//! [`ordered`]: records are read in order, handed to a [`FrameProcessor`]
//! and written back in input order, either sequentially or through a
//! bounded worker pool.

mod capture;
mod ordered;
mod replay;
mod rewrite;
mod transform;

pub use capture::{capture_to_file, run_capture};
pub use ordered::run_ordered;
pub use replay::{replay_file, run_replay, PROGRESS_INTERVAL};
pub use rewrite::{rewrite_file, RewriteProcessor};
pub use transform::{transform_file, TransformProcessor};

use std::fmt;

use crate::container::CaptureRecord;

/// What a processor decided for one frame.
#[derive(Debug)]
pub enum Verdict {
    /// Write the record as it was read.
    Unchanged(CaptureRecord),
    /// Write the re-encoded record.
    Modified(CaptureRecord),
    /// Dropped by the filter policy.
    Filtered,
    /// Dropped because the frame could not be decoded.
    Undecodable,
}

/// A verdict plus the number of non-fatal warnings raised on the way.
#[derive(Debug)]
pub struct Processed {
    pub verdict: Verdict,
    pub warnings: u64,
}

impl Processed {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            warnings: 0,
        }
    }

    pub fn with_warnings(mut self, warnings: u64) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Per-frame stage of a file pipeline.
///
/// Processors are shared by every worker, so they hold only immutable
/// policy state.
pub trait FrameProcessor: Send + Sync {
    /// Process the record at position `index` of the input.
    fn process(&self, index: u64, record: CaptureRecord) -> Processed;
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub read: u64,
    pub written: u64,
    pub modified: u64,
    pub dropped: u64,
    pub decode_errors: u64,
    pub warnings: u64,
}

impl PipelineStats {
    /// Count a processed frame; returns the record to write, if any.
    pub(crate) fn record(&mut self, processed: Processed) -> Option<CaptureRecord> {
        self.read += 1;
        self.warnings += processed.warnings;
        match processed.verdict {
            Verdict::Unchanged(record) => Some(record),
            Verdict::Modified(record) => {
                self.modified += 1;
                Some(record)
            }
            Verdict::Filtered => {
                self.dropped += 1;
                None
            }
            Verdict::Undecodable => {
                self.decode_errors += 1;
                None
            }
        }
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read {}, written {}, modified {}, dropped {}, decode errors {}, warnings {}",
            self.read, self.written, self.modified, self.dropped, self.decode_errors, self.warnings
        )
    }
}
