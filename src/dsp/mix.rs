//! Mixing helpers.
//!
//! LINEAR dry/wet crossfade:
//!
//! ```text
//! out = dry · (1 - mix) + wet · mix
//! ```
//!
//! mix = 0.0 is fully dry, 1.0 fully wet. Linear crossfades dip about 3 dB in
//! the middle for uncorrelated signals; for effect returns that is fine and
//! keeps the sum bounded by the louder of the two inputs.

#[inline]
pub fn blend_dry_wet(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}
