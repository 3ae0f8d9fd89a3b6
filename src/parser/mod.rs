//! Frame decoding module.
//!
//! Turns raw frame bytes into a typed [`LayerStack`](crate::layers::LayerStack).

mod frame_parser;

pub use frame_parser::{decode, FrameParser};
