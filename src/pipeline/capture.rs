//! Capture pipeline: live frames into a capture file.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::PipelineStats;
use crate::capture::{FrameSource, PnetCapture};
use crate::config::CaptureConfig;
use crate::container::{CaptureWriter, FileMeta};
use crate::error::PipelineError;

/// Write every frame of `source` until it reports end of stream.
pub fn run_capture<S, W>(
    source: &mut S,
    writer: &mut CaptureWriter<W>,
) -> Result<PipelineStats, PipelineError>
where
    S: FrameSource + ?Sized,
    W: Write,
{
    let mut stats = PipelineStats::default();

    while let Some(record) = source.next_frame()? {
        stats.read += 1;
        writer.write_record(&record)?;
        stats.written += 1;
        tracing::debug!(
            "Captured frame {} ({} of {} bytes)",
            stats.read,
            record.captured_len(),
            record.original_len()
        );
    }

    writer.flush()?;
    Ok(stats)
}

/// Capture from the interface in `config` into `output` until `running`
/// is cleared.
pub fn capture_to_file(
    config: &CaptureConfig,
    output: &Path,
    running: Arc<AtomicBool>,
) -> Result<PipelineStats, PipelineError> {
    let mut source = PnetCapture::open(config)?;
    source.set_running(running);

    let meta = FileMeta::new(source.snap_len(), source.link_type());
    let mut writer = CaptureWriter::create(output, meta)?;

    tracing::info!(
        "Capturing on {} into {}. Press Ctrl+C to stop...",
        config.interface,
        output.display()
    );
    let stats = run_capture(&mut source, &mut writer)?;
    tracing::info!("Capture done: {}", stats);
    Ok(stats)
}
