//! Address rewrite module.
//!
//! Substitutes MAC and IP addresses of decoded frames according to an
//! immutable policy.

mod address_rewriter;

pub use address_rewriter::{rewrite, AddressRewritePolicy, RewriteOutcome};
