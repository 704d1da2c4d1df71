pub mod chain; // Ordered effect pipeline with atomic structural edits
pub mod dsp;
pub mod effects; // Effect module family
pub mod engine; // Control handle + render half
pub mod error;
pub mod router; // ParameterChange dispatch
pub mod synth; // Voice lifecycle and polyphony

pub use engine::{EngineConfig, Renderer, SynthEngine};
pub use error::{EngineError, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
