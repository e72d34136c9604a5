use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Temporal smoothing factor applied to bin magnitudes between frames.
const SMOOTHING: f32 = 0.8;

/// Magnitudes at or below this level map to spectrum byte 0.
const MIN_DB: f32 = -100.0;

/// Magnitudes at or above this level map to spectrum byte 255.
const MAX_DB: f32 = -30.0;

/// One analysis frame of byte-quantized spectral and waveform data.
///
/// `spectrum` holds half the FFT size in bins, each 0-255 on a decibel
/// scale. `time_domain` holds the same number of bytes, centered on 128,
/// covering the most recent half window of samples.
#[derive(Debug, Clone)]
pub struct AnalyserFrame {
    pub spectrum: Vec<u8>,
    pub time_domain: Vec<u8>,
}

/// Converts a stream of mono samples into byte analysis frames.
///
/// Samples accumulate in a ring holding the most recent FFT window;
/// [`SpectrumAnalyser::process`] can therefore run at any cadence
/// independent of the feed rate. Bin magnitudes are smoothed across frames
/// before decibel conversion so the spectrum decays rather than flickers.
pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    ring: VecDeque<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window: hann_window(fft_size),
            ring: VecDeque::from(vec![0.0; fft_size]),
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins in each produced spectrum.
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Appends mono samples, discarding anything older than one window.
    pub fn feed(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.ring.push_back(sample);
        }
        while self.ring.len() > self.fft_size {
            self.ring.pop_front();
        }
    }

    /// Analyses the current window into a byte frame.
    pub fn process(&mut self) -> AnalyserFrame {
        for (slot, (&sample, &weight)) in self
            .scratch
            .iter_mut()
            .zip(self.ring.iter().zip(self.window.iter()))
        {
            *slot = Complex::new(sample * weight, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 2.0 / self.fft_size as f32;
        let spectrum = self
            .smoothed
            .iter_mut()
            .zip(self.scratch.iter())
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() * scale;
                *smoothed = SMOOTHING * *smoothed + (1.0 - SMOOTHING) * magnitude;
                db_to_byte(20.0 * smoothed.max(1e-10).log10())
            })
            .collect();

        // Time frames match the spectrum length: the most recent half window.
        let time_domain = self
            .ring
            .iter()
            .skip(self.fft_size / 2)
            .map(|&sample| (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8)
            .collect();

        AnalyserFrame {
            spectrum,
            time_domain,
        }
    }

    pub fn reset(&mut self) {
        self.ring.clear();
        self.ring.extend(std::iter::repeat(0.0).take(self.fft_size));
        self.smoothed.fill(0.0);
    }
}

fn db_to_byte(db: f32) -> u8 {
    let scaled = (db - MIN_DB) / (MAX_DB - MIN_DB) * 255.0;
    scaled.clamp(0.0, 255.0) as u8
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: f32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_silence_maps_to_floor_bytes() {
        let mut analyser = SpectrumAnalyser::new(1024);
        analyser.feed(&vec![0.0; 1024]);

        let frame = analyser.process();
        assert_eq!(frame.spectrum.len(), 512);
        assert_eq!(frame.time_domain.len(), 512);
        assert!(frame.spectrum.iter().all(|&b| b == 0));
        assert!(frame.time_domain.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let mut analyser = SpectrumAnalyser::new(1024);
        analyser.feed(&sine(440.0, 44100.0, 1024));

        let frame = analyser.process();
        let mut peak = 0usize;
        let mut peak_level = 0u8;
        for (bin, &level) in frame.spectrum.iter().enumerate() {
            if level > peak_level {
                peak_level = level;
                peak = bin;
            }
        }

        // 440 Hz at a 44.1 kHz rate and 1024-point window lands near bin 10.
        let expected = 440.0 * 1024.0 / 44100.0;
        assert!((peak as f32 - expected).abs() <= 1.0, "peak bin {peak}");
    }

    #[test]
    fn test_full_scale_sine_saturates_peak() {
        let mut analyser = SpectrumAnalyser::new(1024);
        analyser.feed(&sine(440.0, 44100.0, 1024));

        let frame = analyser.process();
        let max = frame.spectrum.iter().copied().max().unwrap();
        assert_eq!(max, 255);
    }

    #[test]
    fn test_smoothing_decays_after_signal_stops() {
        let mut analyser = SpectrumAnalyser::new(1024);
        analyser.feed(&sine(440.0, 44100.0, 1024));
        let loud = analyser.process();
        let loud_peak = loud.spectrum.iter().copied().max().unwrap();

        analyser.feed(&vec![0.0; 1024]);
        let decayed = analyser.process();
        let decayed_peak = decayed.spectrum.iter().copied().max().unwrap();

        assert!(decayed_peak > 0, "smoothing should hold residual energy");
        assert!(decayed_peak <= loud_peak);

        for _ in 0..60 {
            analyser.feed(&vec![0.0; 1024]);
            analyser.process();
        }
        let settled = analyser.process();
        assert!(settled.spectrum.iter().all(|&b| b < 10));
    }

    #[test]
    fn test_short_feed_keeps_window_aligned() {
        let mut analyser = SpectrumAnalyser::new(1024);
        // 735 samples per frame models 60 fps at 44.1 kHz.
        for _ in 0..10 {
            analyser.feed(&sine(440.0, 44100.0, 735));
            let frame = analyser.process();
            assert_eq!(frame.spectrum.len(), 512);
            assert_eq!(frame.time_domain.len(), 512);
        }
    }

    #[test]
    fn test_time_domain_clamps_hot_samples() {
        let mut analyser = SpectrumAnalyser::new(1024);
        analyser.feed(&vec![1.5; 1024]);

        let frame = analyser.process();
        assert!(frame.time_domain.iter().all(|&b| b == 255));
    }
}
