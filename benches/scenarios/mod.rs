//! Engine-level scenario benchmarks.
//!
//! Voice pool cost as polyphony grows, and full renders through effect
//! chains of increasing length.

mod chain;
mod voices;

pub use chain::bench_chain;
pub use voices::bench_voices;
