pub mod analyser;
pub mod beat;
pub mod decode;
pub mod features;
pub mod mel;
pub mod onset;

pub use analyser::{AnalyserFrame, SpectrumAnalyser};
pub use beat::{BeatEvent, BeatTracker};
pub use features::{FeatureExtractor, FeatureVector};
pub use onset::OnsetTracker;

/// Amplitude byte representing silence in a time-domain frame.
///
/// Platform analysers deliver waveform samples as unsigned bytes centered on
/// this value; a frame pinned at 128 is a flat (silent) signal.
pub const SILENCE_BASELINE: u8 = 128;

/// Coarse low/mid/high energy split of a byte spectrum, each level in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLevels {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl Default for BandLevels {
    fn default() -> Self {
        Self {
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
        }
    }
}

impl BandLevels {
    /// Splits the spectrum into the first eighth (bass), up to the midpoint
    /// (mid), and the remainder (treble), averaging each region.
    pub fn from_spectrum(spectrum: &[u8]) -> Self {
        if spectrum.is_empty() {
            return Self::default();
        }

        let bass_end = (spectrum.len() / 8).max(1);
        let mid_end = (spectrum.len() / 2).max(bass_end);

        Self {
            bass: average_level(&spectrum[..bass_end]),
            mid: average_level(&spectrum[bass_end..mid_end]),
            treble: average_level(&spectrum[mid_end..]),
        }
    }

    /// Combined low-end energy used to drive beat tracking.
    pub fn beat_energy(&self) -> f32 {
        (self.bass + self.mid) / 2.0
    }
}

/// Groups a byte spectrum into `count` averaged bands scaled to 0.0-1.0.
///
/// Renderers that draw bar-style visuals consume this rather than the full
/// bin-resolution spectrum.
pub fn frequency_bands(spectrum: &[u8], count: usize) -> Vec<f32> {
    if count == 0 || spectrum.is_empty() {
        return Vec::new();
    }

    let bin_size = (spectrum.len() / count).max(1);
    (0..count)
        .map(|band| {
            let start = band * bin_size;
            let end = ((band + 1) * bin_size).min(spectrum.len());
            if start >= end {
                0.0
            } else {
                average_level(&spectrum[start..end])
            }
        })
        .collect()
}

fn average_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: f32 = bins.iter().map(|&b| b as f32).sum();
    sum / bins.len() as f32 / 255.0
}
