//! osi-replay: capture, replay, rewrite and filter classic pcap files.
//!
//! Frames are decoded into a typed [`layers::LayerStack`], optionally
//! rewritten ([`rewriter`]) or filtered ([`sanitizer`]), and re-encoded with
//! consistent lengths and checksums. Frames nobody touched are written back
//! byte for byte.

pub mod capture;
pub mod checksum;
pub mod config;
pub mod container;
pub mod error;
pub mod layers;
pub mod parser;
pub mod pipeline;
pub mod rewriter;
pub mod sanitizer;
pub mod utils;

pub use container::{CaptureReader, CaptureRecord, CaptureWriter, FileMeta, LinkType};
pub use layers::{Layer, LayerStack};
pub use parser::decode;
pub use rewriter::{rewrite, AddressRewritePolicy, RewriteOutcome};
pub use sanitizer::{should_keep, FilterPolicy};
