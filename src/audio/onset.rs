use std::collections::VecDeque;

use crate::config::OnsetConfig;

/// Spectral-flux onset detector.
///
/// Keeps its own previous spectrum so per-frame flux is independent of any
/// other consumer of the analyser output. The returned strength is the
/// current flux over the recent flux average when it clears the configured
/// ratio, and 0.0 otherwise.
pub struct OnsetTracker {
    config: OnsetConfig,
    previous_spectrum: Vec<f32>,
    flux_history: VecDeque<f32>,
}

impl OnsetTracker {
    pub fn new(config: OnsetConfig) -> Self {
        let capacity = config.history_len;
        Self {
            config,
            previous_spectrum: Vec::new(),
            flux_history: VecDeque::with_capacity(capacity),
        }
    }

    /// Feeds one spectrum frame and returns its onset strength.
    pub fn update(&mut self, spectrum: &[u8]) -> f32 {
        let flux = self.flux(spectrum);
        self.retain_spectrum(spectrum);

        let strength = self.evaluate(flux);
        self.push_flux(flux);
        strength
    }

    pub fn reset(&mut self) {
        self.previous_spectrum.clear();
        self.flux_history.clear();
    }

    fn evaluate(&self, flux: f32) -> f32 {
        if self.flux_history.len() < self.config.min_history {
            return 0.0;
        }

        let average = self.flux_history.iter().sum::<f32>() / self.flux_history.len() as f32;
        // A zero baseline gives no notion of relative novelty.
        if average <= 0.0 {
            return 0.0;
        }

        let ratio = flux / average;
        if ratio > self.config.threshold_ratio {
            ratio
        } else {
            0.0
        }
    }

    fn flux(&self, spectrum: &[u8]) -> f32 {
        if spectrum.is_empty() || self.previous_spectrum.len() != spectrum.len() {
            return 0.0;
        }

        let positive_change: f32 = spectrum
            .iter()
            .zip(self.previous_spectrum.iter())
            .map(|(&current, &previous)| (current as f32 - previous).max(0.0))
            .sum();

        positive_change / spectrum.len() as f32
    }

    fn retain_spectrum(&mut self, spectrum: &[u8]) {
        self.previous_spectrum.clear();
        self.previous_spectrum
            .extend(spectrum.iter().map(|&b| b as f32));
    }

    fn push_flux(&mut self, flux: f32) {
        self.flux_history.push_back(flux);
        while self.flux_history.len() > self.config.history_len {
            self.flux_history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> OnsetTracker {
        OnsetTracker::new(OnsetConfig::default())
    }

    #[test]
    fn test_silence_produces_no_onsets() {
        let mut tracker = tracker();
        let silence = vec![0u8; 512];
        for _ in 0..100 {
            assert_eq!(tracker.update(&silence), 0.0);
        }
    }

    #[test]
    fn test_needs_minimum_history() {
        let mut tracker = tracker();
        let quiet = vec![10u8; 512];
        let loud = vec![200u8; 512];

        tracker.update(&quiet);
        tracker.update(&quiet);
        // Only two flux samples so far, below the required history.
        assert_eq!(tracker.update(&loud), 0.0);
    }

    #[test]
    fn test_spectral_jump_fires_onset() {
        let mut tracker = tracker();
        let mut base = vec![20u8; 512];
        // Small alternation keeps the flux baseline above zero.
        for frame in 0..30 {
            tracker.update(&base);
            base[0] = if frame % 2 == 0 { 30 } else { 20 };
        }

        let loud = vec![220u8; 512];
        let strength = tracker.update(&loud);
        assert!(strength > 1.1, "strength was {strength}");
    }

    #[test]
    fn test_sustained_level_is_not_an_onset() {
        let mut tracker = tracker();
        let mut base = vec![20u8; 512];
        for frame in 0..30 {
            tracker.update(&base);
            base[0] = if frame % 2 == 0 { 30 } else { 20 };
        }

        let loud = vec![220u8; 512];
        tracker.update(&loud);
        // The level stays high, so flux collapses back toward zero.
        assert_eq!(tracker.update(&loud), 0.0);
    }

    #[test]
    fn test_strength_is_never_negative() {
        let mut tracker = tracker();
        let loud = vec![200u8; 512];
        let quiet = vec![5u8; 512];
        for frame in 0..50 {
            let spectrum = if frame % 3 == 0 { &loud } else { &quiet };
            assert!(tracker.update(spectrum) >= 0.0);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tracker = tracker();
        let loud = vec![200u8; 512];
        for _ in 0..30 {
            tracker.update(&loud);
        }

        tracker.reset();
        assert_eq!(tracker.update(&loud), 0.0);
        let brighter = vec![255u8; 512];
        // History is rebuilding from empty, still below the minimum.
        assert_eq!(tracker.update(&brighter), 0.0);
    }
}
