use crate::audio::FeatureVector;

use super::{Genre, GenrePrediction};

/// Deterministic rule-tree classifier used whenever no scoring model is
/// available or the model errors.
///
/// Rules test a handful of ratios derived from the feature vector, most
/// extreme profile first, and every path lands on a genre with a fixed
/// confidence. Stateless, so a fresh result never depends on earlier frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, features: &FeatureVector) -> GenrePrediction {
        let energy = features.energy / 10_000.0;
        let brightness = if features.brightness > 0.0 {
            features.brightness
        } else {
            features.spectral_centroid / 1000.0
        };
        let rhythmicity = features.zero_crossing_rate;
        let complexity = features.spectral_flux / 50.0;
        let harmonic_ratio = harmonic_ratio(&features.chroma);
        let dynamic_range = if features.rms > 0.0 { features.rms } else { 0.5 };

        let (genre, confidence) = if energy > 0.9 && complexity > 0.9 && brightness > 0.8 {
            if rhythmicity > 0.15 {
                (Genre::Dubstep, 0.85)
            } else if brightness > 0.9 {
                (Genre::Metal, 0.8)
            } else {
                (Genre::Electronic, 0.75)
            }
        } else if energy > 0.8 && rhythmicity > 0.12 {
            if harmonic_ratio > 2.2 {
                (Genre::HipHop, 0.75)
            } else if brightness > 0.7 {
                (Genre::Rock, 0.7)
            } else {
                (Genre::House, 0.65)
            }
        } else if energy > 0.8 && harmonic_ratio <= 2.2 {
            // Loud, inharmonic, bass-dominated mixes stay beat-driven even
            // when the waveform is too smooth to raise the crossing rate.
            if brightness < 0.6 {
                (Genre::HipHop, 0.7)
            } else {
                (Genre::Electronic, 0.65)
            }
        } else if harmonic_ratio > 2.8 && brightness < 0.6 {
            if complexity < 0.3 && dynamic_range < 0.4 {
                (Genre::Classical, 0.75)
            } else if complexity > 0.5 {
                (Genre::Jazz, 0.7)
            } else {
                (Genre::Blues, 0.65)
            }
        } else if energy < 0.4 && complexity < 0.4 {
            (Genre::Ambient, 0.7)
        } else if energy > 0.6 && energy <= 0.8 {
            if harmonic_ratio > 2.0 {
                (Genre::Pop, 0.65)
            } else if rhythmicity < 0.06 {
                (Genre::Folk, 0.6)
            } else {
                (Genre::Country, 0.55)
            }
        } else {
            (Genre::Pop, 0.4)
        };

        GenrePrediction::concentrated(genre, confidence)
    }
}

/// Strongest pitch class over the mean class energy; 0 for an empty
/// chroma so silent input falls through the energy rules.
fn harmonic_ratio(chroma: &[f32; 12]) -> f32 {
    let mean = chroma.iter().sum::<f32>() / chroma.len() as f32;
    if mean <= 0.0 {
        return 0.0;
    }
    let max = chroma.iter().fold(0.0f32, |a, &b| a.max(b));
    max / mean
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chroma with one dominant class, giving roughly the requested
    /// max-over-mean ratio.
    fn peaked_chroma(ratio: f32) -> [f32; 12] {
        // max / mean = 12 / (11 x + 1) with the peak at 1.0.
        let x = ((12.0 / ratio) - 1.0) / 11.0;
        let mut chroma = [x; 12];
        chroma[0] = 1.0;
        chroma
    }

    fn features() -> FeatureVector {
        FeatureVector {
            chroma: peaked_chroma(1.5),
            ..FeatureVector::default()
        }
    }

    #[test]
    fn test_bass_heavy_mix_lands_in_beat_family() {
        let mut f = features();
        f.energy = 40_000.0;
        f.brightness = 0.5;
        f.zero_crossing_rate = 0.02;
        f.spectral_flux = 200.0;

        let prediction = HeuristicClassifier::new().classify(&f);
        assert!(matches!(
            prediction.genre,
            Genre::HipHop | Genre::Electronic
        ));
        assert!(prediction.confidence > 0.6);
    }

    #[test]
    fn test_quiet_harmonic_material_reads_classical() {
        let mut f = features();
        f.energy = 5_000.0;
        f.brightness = 0.3;
        f.spectral_flux = 10.0;
        f.rms = 0.2;
        f.chroma = peaked_chroma(3.5);

        let prediction = HeuristicClassifier::new().classify(&f);
        assert_eq!(prediction.genre, Genre::Classical);
        assert_eq!(prediction.confidence, 0.75);
    }

    #[test]
    fn test_low_energy_low_flux_reads_ambient() {
        let mut f = features();
        f.energy = 1_000.0;
        f.spectral_flux = 5.0;
        f.brightness = 0.7;

        let prediction = HeuristicClassifier::new().classify(&f);
        assert_eq!(prediction.genre, Genre::Ambient);
    }

    #[test]
    fn test_harsh_noisy_mix_reads_dubstep() {
        let mut f = features();
        f.energy = 12_000.0;
        f.spectral_flux = 60.0;
        f.brightness = 0.85;
        f.zero_crossing_rate = 0.2;

        let prediction = HeuristicClassifier::new().classify(&f);
        assert_eq!(prediction.genre, Genre::Dubstep);
        assert_eq!(prediction.confidence, 0.85);
    }

    #[test]
    fn test_loud_rhythmic_bright_mix_reads_rock() {
        let mut f = features();
        f.energy = 9_000.0;
        f.spectral_flux = 30.0;
        f.brightness = 0.75;
        f.zero_crossing_rate = 0.14;

        let prediction = HeuristicClassifier::new().classify(&f);
        assert_eq!(prediction.genre, Genre::Rock);
    }

    #[test]
    fn test_unremarkable_input_defaults_to_pop() {
        let mut f = features();
        f.energy = 5_000.0;
        f.spectral_flux = 25.0;
        f.brightness = 0.7;

        let prediction = HeuristicClassifier::new().classify(&f);
        assert_eq!(prediction.genre, Genre::Pop);
        assert_eq!(prediction.confidence, 0.4);
    }

    #[test]
    fn test_silence_reads_ambient() {
        let prediction = HeuristicClassifier::new().classify(&FeatureVector::default());
        assert_eq!(prediction.genre, Genre::Ambient);
    }

    #[test]
    fn test_distribution_always_sums_to_one() {
        let mut f = features();
        for energy in [0.0, 3_000.0, 7_000.0, 11_000.0, 50_000.0] {
            f.energy = energy;
            let prediction = HeuristicClassifier::new().classify(&f);
            let total: f32 = prediction.distribution.iter().sum();
            assert!((total - 1.0).abs() < 1e-5);
        }
    }
}
