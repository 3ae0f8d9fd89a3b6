//! Rewrite pipeline: address substitution over a capture file.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use super::{run_ordered, FrameProcessor, PipelineStats, Processed, Verdict};
use crate::container::{CaptureReader, CaptureRecord, CaptureWriter};
use crate::error::PipelineError;
use crate::parser::FrameParser;
use crate::rewriter::{rewrite, AddressRewritePolicy};

/// Decodes each frame, applies the rewrite policy and re-encodes frames
/// that changed. Unchanged frames keep their original bytes.
pub struct RewriteProcessor {
    parser: FrameParser,
    policy: AddressRewritePolicy,
}

impl RewriteProcessor {
    pub fn new(parser: FrameParser, policy: AddressRewritePolicy) -> Self {
        Self { parser, policy }
    }
}

impl FrameProcessor for RewriteProcessor {
    fn process(&self, index: u64, record: CaptureRecord) -> Processed {
        let stack = match self.parser.parse(record.data()) {
            Ok(stack) => stack,
            Err(e) => {
                tracing::warn!("Frame {}: skipped, {}", index, e);
                return Processed::new(Verdict::Undecodable);
            }
        };

        let outcome = rewrite(stack, &self.policy);
        for warning in &outcome.warnings {
            tracing::warn!("Frame {}: {}", index, warning);
        }
        let warnings = outcome.warnings.len() as u64;

        if !outcome.modified {
            return Processed::new(Verdict::Unchanged(record)).with_warnings(warnings);
        }

        match outcome.stack.encode() {
            Ok(data) => {
                tracing::debug!("Frame {}: rewritten ({} bytes)", index, data.len());
                Processed::new(Verdict::Modified(record.with_data(data))).with_warnings(warnings)
            }
            Err(e) => {
                tracing::warn!("Frame {}: {}, keeping original bytes", index, e);
                Processed::new(Verdict::Unchanged(record)).with_warnings(warnings + 1)
            }
        }
    }
}

/// Rewrite `input` into `output` with `policy`.
///
/// The output inherits the input's header: byte order, timestamp
/// resolution, snap length and link type.
pub fn rewrite_file(
    input: &Path,
    output: &Path,
    policy: AddressRewritePolicy,
    workers: usize,
    running: &AtomicBool,
) -> Result<PipelineStats, PipelineError> {
    let mut reader = CaptureReader::open(input)?;
    let meta = *reader.meta();
    let mut writer = CaptureWriter::create(output, meta)?;

    tracing::info!(
        "Rewriting {} -> {} ({} mappings, link type {}, {} workers)",
        input.display(),
        output.display(),
        policy.len(),
        meta.link_type,
        workers.max(1)
    );

    let processor = RewriteProcessor::new(FrameParser::new(meta.link_type), policy);
    let stats = run_ordered(&mut reader, &mut writer, &processor, workers, running)?;

    tracing::info!("Rewrite complete: {}", stats);
    Ok(stats)
}
