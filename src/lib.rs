//! Resona: real-time music analysis for audio-reactive visuals.
//!
//! The crate turns per-frame byte spectra and waveforms into spectral
//! features, beat and onset events, a smoothed tempo estimate, and a
//! debounced genre prediction, then maps the detected genre to a
//! visualization preset. Rendering is an external concern reached through
//! [`engine::VisualSurface`] and the GPU-ready [`engine::RenderParams`]
//! block.
//!
//! The per-frame path ([`engine::Engine::update`]) is synchronous and
//! allocation-light; the genre classifier runs off-frame on a worker
//! thread with a bounded wait and falls back to deterministic heuristics
//! when the deadline is missed.

pub mod audio;
pub mod config;
pub mod engine;
pub mod genre;
pub mod preset;

pub use audio::{
    AnalyserFrame, BandLevels, BeatEvent, BeatTracker, FeatureExtractor, FeatureVector,
    OnsetTracker, SpectrumAnalyser,
};
pub use config::EngineConfig;
pub use engine::{Engine, FrameInput, FrameOutput, RenderParams, VisualSurface};
pub use genre::{Genre, GenreClassifier, GenrePrediction};
pub use preset::{Algorithm, Palette, PresetError, SettingsPatch, VisualSettings};
