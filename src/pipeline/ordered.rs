//! Order-preserving file pipeline engine.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use super::{FrameProcessor, PipelineStats, Processed};
use crate::container::{CaptureReader, CaptureRecord, CaptureWriter};
use crate::error::{ContainerError, PipelineError};

/// Frames queued per worker before the reader blocks.
const QUEUE_DEPTH: usize = 64;

/// Run every record of `reader` through `processor` into `writer`.
///
/// With `workers <= 1` frames are processed on the calling thread.
/// Otherwise a reader thread deals indexed frames round-robin to `workers`
/// threads and the calling thread writes results in input order. Clearing
/// `running` stops reading; frames already read are still written. The
/// writer is flushed before returning.
pub fn run_ordered<R, W, P>(
    reader: &mut CaptureReader<R>,
    writer: &mut CaptureWriter<W>,
    processor: &P,
    workers: usize,
    running: &AtomicBool,
) -> Result<PipelineStats, PipelineError>
where
    R: Read + Send,
    W: Write,
    P: FrameProcessor,
{
    let stats = if workers <= 1 {
        run_sequential(reader, writer, processor, running)?
    } else {
        run_parallel(reader, writer, processor, workers, running)?
    };
    writer.flush()?;
    Ok(stats)
}

fn run_sequential<R, W, P>(
    reader: &mut CaptureReader<R>,
    writer: &mut CaptureWriter<W>,
    processor: &P,
    running: &AtomicBool,
) -> Result<PipelineStats, PipelineError>
where
    R: Read,
    W: Write,
    P: FrameProcessor,
{
    let mut stats = PipelineStats::default();
    let mut index = 0;

    while running.load(Ordering::SeqCst) {
        let Some(record) = reader.read_record()? else {
            break;
        };
        let processed = processor.process(index, record);
        emit(&mut stats, writer, processed)?;
        index += 1;
    }

    Ok(stats)
}

fn run_parallel<R, W, P>(
    reader: &mut CaptureReader<R>,
    writer: &mut CaptureWriter<W>,
    processor: &P,
    workers: usize,
    running: &AtomicBool,
) -> Result<PipelineStats, PipelineError>
where
    R: Read + Send,
    W: Write,
    P: FrameProcessor,
{
    thread::scope(|scope| {
        let (result_tx, result_rx) = mpsc::sync_channel::<(u64, Processed)>(workers * QUEUE_DEPTH);

        let mut job_txs = Vec::with_capacity(workers);
        for _ in 0..workers {
            let (job_tx, job_rx) = mpsc::sync_channel::<(u64, CaptureRecord)>(QUEUE_DEPTH);
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, record) in job_rx {
                    if result_tx.send((index, processor.process(index, record))).is_err() {
                        break;
                    }
                }
            });
            job_txs.push(job_tx);
        }
        drop(result_tx);

        let feeder = scope.spawn(move || -> Result<u64, ContainerError> {
            let mut index = 0u64;
            while running.load(Ordering::SeqCst) {
                let Some(record) = reader.read_record()? else {
                    break;
                };
                let worker = (index % job_txs.len() as u64) as usize;
                if job_txs[worker].send((index, record)).is_err() {
                    break;
                }
                index += 1;
            }
            Ok(index)
        });

        let mut stats = PipelineStats::default();
        let mut pending = BTreeMap::new();
        let mut next = 0u64;

        for (index, processed) in result_rx {
            pending.insert(index, processed);
            while let Some(processed) = pending.remove(&next) {
                emit(&mut stats, writer, processed)?;
                next += 1;
            }
        }

        let dispatched = match feeder.join() {
            Ok(result) => result?,
            Err(_) => {
                return Err(PipelineError::Worker("frame reader thread panicked".to_string()))
            }
        };
        if next != dispatched {
            return Err(PipelineError::Worker(format!(
                "{} of {} frames were lost by the worker pool",
                dispatched - next,
                dispatched
            )));
        }

        Ok(stats)
    })
}

fn emit<W: Write>(
    stats: &mut PipelineStats,
    writer: &mut CaptureWriter<W>,
    processed: Processed,
) -> Result<(), PipelineError> {
    if let Some(record) = stats.record(processed) {
        writer.write_record(&record)?;
        stats.written += 1;
    }
    Ok(())
}
