//! Transform pipeline: drop frames matching the filter policy.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use super::{run_ordered, FrameProcessor, PipelineStats, Processed, Verdict};
use crate::container::{CaptureReader, CaptureRecord, CaptureWriter};
use crate::error::PipelineError;
use crate::parser::FrameParser;
use crate::sanitizer::{should_keep, FilterPolicy};

/// Keeps frames the filter accepts, byte for byte; drops the rest and
/// frames that cannot be decoded.
pub struct TransformProcessor {
    parser: FrameParser,
    policy: FilterPolicy,
}

impl TransformProcessor {
    pub fn new(parser: FrameParser, policy: FilterPolicy) -> Self {
        Self { parser, policy }
    }
}

impl FrameProcessor for TransformProcessor {
    fn process(&self, index: u64, record: CaptureRecord) -> Processed {
        let stack = match self.parser.parse(record.data()) {
            Ok(stack) => stack,
            Err(e) => {
                tracing::warn!("Frame {}: skipped, {}", index, e);
                return Processed::new(Verdict::Undecodable);
            }
        };

        if should_keep(&stack, &self.policy) {
            Processed::new(Verdict::Unchanged(record))
        } else {
            if let Some((source, destination)) = stack.ip_addresses() {
                tracing::debug!("Frame {}: dropped {} -> {}", index, source, destination);
            }
            Processed::new(Verdict::Filtered)
        }
    }
}

/// Filter `input` into `output` with `policy`.
pub fn transform_file(
    input: &Path,
    output: &Path,
    policy: FilterPolicy,
    workers: usize,
    running: &AtomicBool,
) -> Result<PipelineStats, PipelineError> {
    let mut reader = CaptureReader::open(input)?;
    let meta = *reader.meta();
    let mut writer = CaptureWriter::create(output, meta)?;

    if policy.is_empty() {
        tracing::warn!("Blocklist is empty, every decodable frame will be kept");
    }
    tracing::info!(
        "Filtering {} -> {} ({} blocked addresses, {} workers)",
        input.display(),
        output.display(),
        policy.len(),
        workers.max(1)
    );

    let processor = TransformProcessor::new(FrameParser::new(meta.link_type), policy);
    let stats = run_ordered(&mut reader, &mut writer, &processor, workers, running)?;

    tracing::info!(
        "Done. Processed {} packets, kept {} ({})",
        stats.read,
        stats.written,
        stats
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::container::LinkType;
    use crate::layers::{ip_protocol, Ipv4, Layer, LayerStack};

    fn raw_ipv4(source: Ipv4Addr) -> Vec<u8> {
        LayerStack::new(vec![
            Layer::Ipv4(Ipv4 {
                version: 4,
                header_len: 5,
                tos: 0,
                total_length: 0,
                identification: 0,
                flags_fragment: 0,
                ttl: 64,
                protocol: ip_protocol::UDP,
                checksum: 0,
                source,
                destination: Ipv4Addr::new(192, 168, 0, 1),
                options: Vec::new(),
            }),
            Layer::Opaque(vec![0; 8]),
        ])
        .encode()
        .unwrap()
    }

    fn processor() -> TransformProcessor {
        let policy = FilterPolicy::default().with_blocked(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        TransformProcessor::new(FrameParser::new(LinkType::IPV4), policy)
    }

    #[test]
    fn blocked_source_is_filtered() {
        let record = CaptureRecord::from_frame(0, 0, raw_ipv4(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(matches!(
            processor().process(0, record).verdict,
            Verdict::Filtered
        ));
    }

    #[test]
    fn other_source_is_kept_verbatim() {
        let data = raw_ipv4(Ipv4Addr::new(192, 168, 100, 5));
        let record = CaptureRecord::from_frame(0, 0, data.clone());
        match processor().process(0, record).verdict {
            Verdict::Unchanged(out) => assert_eq!(out.data(), &data[..]),
            other => panic!("expected Unchanged, got {:?}", other),
        }
    }

    #[test]
    fn empty_frame_is_undecodable() {
        let record = CaptureRecord::from_frame(0, 0, Vec::new());
        assert!(matches!(
            processor().process(0, record).verdict,
            Verdict::Undecodable
        ));
    }
}
