//! Live interface I/O abstraction.
//!
//! Pipelines talk to the wire through the `FrameSource` and `FrameSink`
//! traits, so they can be driven by mock sources in tests. `PnetCapture`
//! implements both on top of a pnet datalink channel.

mod pnet_capture;

pub use pnet_capture::{list_interfaces, PnetCapture};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::container::{CaptureRecord, LinkType};
use crate::error::CaptureError;

/// Producer of timestamped raw frames.
pub trait FrameSource: Send {
    /// Block until the next frame arrives.
    ///
    /// Returns `Ok(None)` once the source is exhausted or the running flag
    /// was cleared.
    fn next_frame(&mut self) -> Result<Option<CaptureRecord>, CaptureError>;

    /// Link-layer type of the frames produced.
    fn link_type(&self) -> LinkType;

    /// Maximum number of bytes kept per frame.
    fn snap_len(&self) -> u32;

    /// Set the running flag for graceful shutdown.
    /// When it turns false, `next_frame` returns `Ok(None)`.
    fn set_running(&mut self, running: Arc<AtomicBool>);
}

/// Consumer of raw frames for on-wire transmission.
pub trait FrameSink: Send {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), CaptureError>;

    /// Name of the interface frames are sent on.
    fn interface_name(&self) -> &str;
}
