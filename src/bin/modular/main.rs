//! modular - plays a short phrase through the default output device.
//!
//! Run with: cargo run --bin modular
//! Set RUST_LOG=saavy_modular=debug to watch the control plane.

use std::{thread, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use saavy_modular::{
    dsp::oscillator::OscillatorWaveform,
    effects::{EffectKind, EffectParam},
    synth::{EnvelopeStage, SynthKind},
    EngineConfig, SynthEngine,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

// (note, octave shift, beats)
const PHRASE: &[(i32, i32, f32)] = &[
    (60, 0, 1.0),
    (63, 0, 1.0),
    (65, 0, 0.5),
    (63, 0, 0.5),
    (65, 0, 1.0),
    (60, -1, 2.0),
];

const BPM: f32 = 110.0;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("saavy_modular=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let supported = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;
    let sample_rate = supported.sample_rate().0 as f32;
    let channels = supported.channels() as usize;
    info!(sample_rate, channels, "output device ready");

    let config = EngineConfig {
        sample_rate,
        ..EngineConfig::default()
    };
    let (mut engine, mut renderer) = SynthEngine::new(config)?;
    build_patch(&mut engine)?;

    let stream = device.build_output_stream(
        &supported.into(),
        move |data: &mut [f32], _| renderer.render_interleaved(data, channels),
        |err| tracing::error!("audio stream error: {err}"),
        None,
    )?;
    stream.play()?;

    let beat = Duration::from_secs_f32(60.0 / BPM);
    for pass in 0..2 {
        if pass == 1 {
            // Second pass: same notes, FM voice and a brighter filter
            engine.set_synth_kind(SynthKind::Fm)?;
            engine.update_module_parameter(EffectKind::Lowpass, EffectParam::Cutoff, 4_000.0)?;
        }
        for &(note, octave, beats) in PHRASE {
            engine.note_on(note, 100, octave)?;
            thread::sleep(beat.mul_f32(beats * 0.8));
            engine.note_off(note, octave)?;
            thread::sleep(beat.mul_f32(beats * 0.2));
        }
    }

    // Let the delay and reverb tails ring out
    thread::sleep(Duration::from_secs(3));
    engine.all_notes_off()?;
    engine.collect_garbage();
    Ok(())
}

fn build_patch(engine: &mut SynthEngine) -> EyreResult<()> {
    engine.set_waveform(OscillatorWaveform::Sawtooth)?;
    engine.set_envelope(EnvelopeStage::Attack, 0.005)?;
    engine.set_envelope(EnvelopeStage::Release, 0.25)?;

    for kind in [EffectKind::Lowpass, EffectKind::FeedbackDelay, EffectKind::Reverb] {
        engine.add_module(kind)?;
    }
    engine.update_module_parameter(EffectKind::Lowpass, EffectParam::Cutoff, 1_200.0)?;
    engine.update_module_parameter(EffectKind::Lowpass, EffectParam::Resonance, 0.5)?;
    engine.update_module_parameter(EffectKind::FeedbackDelay, EffectParam::Time, 0.27)?;
    engine.update_module_parameter(EffectKind::FeedbackDelay, EffectParam::Mix, 0.3)?;
    engine.update_module_parameter(EffectKind::Reverb, EffectParam::Mix, 0.25)?;

    info!(chain = ?engine.stages(), "patch built");
    Ok(())
}
