//! Packet filter module.
//!
//! Decides which decoded frames are kept; it never modifies them.

mod ip_filter;

pub use ip_filter::{should_keep, FilterPolicy};
