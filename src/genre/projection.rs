use std::collections::VecDeque;

use crate::audio::FeatureVector;

/// Dimension of the model input vector.
pub const PROJECTION_LEN: usize = 40;

/// Retained z-scored projections.
const HISTORY_CAP: usize = 200;

/// Projections averaged into each model input.
const AVERAGE_WINDOW: usize = 30;

/// Stabilizer added to the standard deviation before z-scoring.
const Z_EPSILON: f32 = 1e-8;

/// Turns feature vectors into averaged, normalized model inputs.
///
/// Each frame's features are scaled into comparable magnitudes, z-scored
/// within the vector, and pushed into a rolling history; the model sees the
/// mean of the most recent entries rather than a single noisy frame.
#[derive(Default)]
pub struct FeatureProjector {
    history: VecDeque<[f32; PROJECTION_LEN]>,
}

impl FeatureProjector {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAP),
        }
    }

    /// Projects one frame and returns the rolling average the model
    /// should see.
    pub fn ingest(&mut self, features: &FeatureVector) -> [f32; PROJECTION_LEN] {
        let projected = z_score(raw_projection(features));
        self.history.push_back(projected);
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
        self.average_recent()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    fn average_recent(&self) -> [f32; PROJECTION_LEN] {
        let count = self.history.len().min(AVERAGE_WINDOW);
        let mut average = [0.0f32; PROJECTION_LEN];
        if count == 0 {
            return average;
        }

        for projected in self.history.iter().rev().take(count) {
            for (slot, &value) in average.iter_mut().zip(projected.iter()) {
                *slot += value;
            }
        }
        for slot in average.iter_mut() {
            *slot /= count as f32;
        }
        average
    }
}

/// Fixed projection order: scaled scalars, cepstra, chroma, then the shape
/// moments, zero-padded to [`PROJECTION_LEN`].
pub fn raw_projection(features: &FeatureVector) -> [f32; PROJECTION_LEN] {
    let mut projected = [0.0f32; PROJECTION_LEN];
    let scalars = [
        features.spectral_centroid / 2000.0,
        features.spectral_rolloff / 2000.0,
        features.spectral_flux / 100.0,
        features.energy / 20_000.0,
        features.zero_crossing_rate,
        features.rms,
        features.brightness,
        features.roughness,
        features.harmonicity,
    ];

    let mut cursor = 0;
    for &value in scalars
        .iter()
        .chain(features.cepstra.iter())
        .chain(features.chroma.iter())
    {
        projected[cursor] = value;
        cursor += 1;
    }
    for &value in &[
        features.spectral_spread,
        features.spectral_skewness,
        features.spectral_kurtosis,
        features.spectral_slope,
    ] {
        projected[cursor] = value;
        cursor += 1;
    }
    projected
}

fn z_score(mut vector: [f32; PROJECTION_LEN]) -> [f32; PROJECTION_LEN] {
    let n = PROJECTION_LEN as f32;
    let mean = vector.iter().sum::<f32>() / n;
    let variance = vector.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let deviation = variance.sqrt() + Z_EPSILON;

    for value in vector.iter_mut() {
        *value = (*value - mean) / deviation;
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_features() -> FeatureVector {
        FeatureVector {
            spectral_centroid: 2000.0,
            spectral_rolloff: 1000.0,
            spectral_flux: 50.0,
            energy: 20_000.0,
            zero_crossing_rate: 0.1,
            rms: 0.5,
            brightness: 0.6,
            roughness: 0.2,
            harmonicity: 0.8,
            spectral_spread: 2.0,
            spectral_skewness: 0.3,
            spectral_kurtosis: -1.0,
            spectral_slope: -0.1,
            chroma: [0.5; 12],
            cepstra: [0.25; 13],
        }
    }

    #[test]
    fn test_projection_order_and_scaling() {
        let projected = raw_projection(&sample_features());

        assert_eq!(projected[0], 1.0); // centroid / 2000
        assert_eq!(projected[1], 0.5); // rolloff / 2000
        assert_eq!(projected[2], 0.5); // flux / 100
        assert_eq!(projected[3], 1.0); // energy / 20000
        assert_eq!(projected[9], 0.25); // first cepstral coefficient
        assert_eq!(projected[22], 0.5); // first chroma class
        assert_eq!(projected[34], 2.0); // spread
        assert_eq!(projected[37], -0.1); // slope
        assert_eq!(projected[38], 0.0); // padding
        assert_eq!(projected[39], 0.0);
    }

    #[test]
    fn test_z_score_centers_the_vector() {
        let scored = z_score(raw_projection(&sample_features()));

        let mean = scored.iter().sum::<f32>() / PROJECTION_LEN as f32;
        assert!(mean.abs() < 1e-4);
        let variance =
            scored.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / PROJECTION_LEN as f32;
        assert!((variance - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_features_stay_finite() {
        let scored = z_score(raw_projection(&FeatureVector::default()));
        for &value in scored.iter() {
            assert_eq!(value, 0.0);
        }
    }

    #[test]
    fn test_history_is_capped() {
        let mut projector = FeatureProjector::new();
        let features = sample_features();
        for _ in 0..HISTORY_CAP + 50 {
            projector.ingest(&features);
        }
        assert_eq!(projector.len(), HISTORY_CAP);
    }

    #[test]
    fn test_average_blends_recent_frames() {
        let mut projector = FeatureProjector::new();
        let features = sample_features();

        let first = projector.ingest(&features);
        let mut louder = sample_features();
        louder.energy = 40_000.0;
        let second = projector.ingest(&louder);

        // Energy sits at slot 3; averaging with the louder frame moves it.
        assert!(first[3] != second[3]);

        // Identical history entries average to the entry itself.
        let mut steady = FeatureProjector::new();
        let mut last = [0.0; PROJECTION_LEN];
        for _ in 0..AVERAGE_WINDOW {
            last = steady.ingest(&features);
        }
        let single = z_score(raw_projection(&features));
        for (averaged, expected) in last.iter().zip(single.iter()) {
            assert!((averaged - expected).abs() < 1e-5);
        }
    }
}
