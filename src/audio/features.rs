use serde::{Deserialize, Serialize};

use super::mel::MelFilterBank;
use super::SILENCE_BASELINE;

/// Cumulative-energy fraction that defines the spectral rolloff bin.
const ROLLOFF_THRESHOLD: f32 = 0.85;

/// Peaks below this fraction of the spectrum maximum are ignored when
/// scoring harmonicity.
const PEAK_THRESHOLD: f32 = 0.1;

/// Penalty steepness for peak ratios that land between integer harmonics.
const HARMONIC_FALLOFF: f32 = 10.0;

/// Number of cepstral coefficients (and mel filters backing them).
pub const CEPSTRUM_LEN: usize = 13;

/// Number of pitch classes in the chroma distribution.
pub const CHROMA_LEN: usize = 12;

/// Per-frame spectral and temporal descriptors of one analysis window.
///
/// Magnitude-derived fields stay in raw byte units (bins are 0-255), so
/// `energy` can reach the tens of thousands while the ratio fields
/// (`zero_crossing_rate`, `rms`, `brightness`, `harmonicity`) are 0.0-1.0.
/// A silent or unavailable input produces the all-zero vector, never NaN.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Energy-weighted mean bin index.
    pub spectral_centroid: f32,
    /// Bin index below which 85% of the spectral energy sits.
    pub spectral_rolloff: f32,
    /// Mean positive magnitude change per bin since the previous frame.
    pub spectral_flux: f32,
    /// Mean squared bin magnitude.
    pub energy: f32,
    /// Fraction of adjacent time-domain samples crossing the silence baseline.
    pub zero_crossing_rate: f32,
    /// Root mean square amplitude, normalized to 0.0-1.0.
    pub rms: f32,
    /// Upper-half spectral energy over total energy.
    pub brightness: f32,
    /// Mean absolute deviation of each bin from its neighbor average.
    pub roughness: f32,
    /// Consonance score from peak-to-fundamental frequency ratios.
    pub harmonicity: f32,
    /// Standard deviation of the spectral distribution, in bins.
    pub spectral_spread: f32,
    /// Third standardized moment of the spectral distribution.
    pub spectral_skewness: f32,
    /// Excess kurtosis of the spectral distribution.
    pub spectral_kurtosis: f32,
    /// Least-squares slope of magnitude against bin index.
    pub spectral_slope: f32,
    /// Pitch-class energy distribution, normalized by the strongest class.
    pub chroma: [f32; CHROMA_LEN],
    /// Mel-scale cepstral coefficients describing the spectral envelope.
    pub cepstra: [f32; CEPSTRUM_LEN],
}

/// Computes a [`FeatureVector`] from byte spectrum and time-domain frames.
///
/// The extractor retains the previous frame's spectrum for flux and rebuilds
/// its chroma/mel mappings if the spectrum resolution changes. All other
/// state is per-call; every division is guarded so degenerate input yields
/// zeros rather than NaN.
pub struct FeatureExtractor {
    sample_rate: f32,
    previous_spectrum: Vec<f32>,
    chroma_classes: Vec<usize>,
    mel_bank: MelFilterBank,
    bins: usize,
}

impl FeatureExtractor {
    pub fn new(sample_rate: f32, spectrum_bins: usize) -> Self {
        Self {
            sample_rate,
            previous_spectrum: vec![0.0; spectrum_bins],
            chroma_classes: Self::chroma_class_table(sample_rate, spectrum_bins),
            mel_bank: MelFilterBank::new(CEPSTRUM_LEN, spectrum_bins, sample_rate),
            bins: spectrum_bins,
        }
    }

    /// Drops retained cross-frame state, e.g. when a new track starts.
    pub fn reset(&mut self) {
        self.previous_spectrum.clear();
        self.previous_spectrum.resize(self.bins, 0.0);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Extracts all descriptors for one frame.
    ///
    /// `spectrum` holds per-bin magnitudes 0-255; `time_domain` holds
    /// amplitude bytes centered on 128. The previous-spectrum state updates
    /// as a side effect of the flux computation.
    pub fn extract(&mut self, spectrum: &[u8], time_domain: &[u8]) -> FeatureVector {
        if spectrum.len() != self.bins {
            self.rebuild_for(spectrum.len());
        }

        let magnitudes: Vec<f32> = spectrum.iter().map(|&b| b as f32).collect();
        let total: f32 = magnitudes.iter().sum();

        let spectral_flux = self.spectral_flux(&magnitudes);
        self.previous_spectrum.copy_from_slice(&magnitudes);

        let spectral_centroid = spectral_centroid(&magnitudes, total);
        let (spectral_spread, spectral_skewness, spectral_kurtosis) =
            spectral_moments(&magnitudes, total, spectral_centroid);

        FeatureVector {
            spectral_centroid,
            spectral_rolloff: spectral_rolloff(&magnitudes, total),
            spectral_flux,
            energy: mean_squared(&magnitudes),
            zero_crossing_rate: zero_crossing_rate(time_domain),
            rms: root_mean_square(time_domain),
            brightness: brightness(&magnitudes, total),
            roughness: roughness(&magnitudes),
            harmonicity: harmonicity(&magnitudes),
            spectral_spread,
            spectral_skewness,
            spectral_kurtosis,
            spectral_slope: spectral_slope(&magnitudes),
            chroma: self.chroma(&magnitudes),
            cepstra: self.cepstra(&magnitudes, total),
        }
    }

    fn rebuild_for(&mut self, bins: usize) {
        self.bins = bins;
        self.previous_spectrum = vec![0.0; bins];
        self.chroma_classes = Self::chroma_class_table(self.sample_rate, bins);
        self.mel_bank = MelFilterBank::new(CEPSTRUM_LEN, bins, self.sample_rate);
    }

    fn spectral_flux(&self, magnitudes: &[f32]) -> f32 {
        if magnitudes.is_empty() || self.previous_spectrum.len() != magnitudes.len() {
            return 0.0;
        }

        let positive_change: f32 = magnitudes
            .iter()
            .zip(self.previous_spectrum.iter())
            .map(|(&current, &previous)| (current - previous).max(0.0))
            .sum();

        positive_change / magnitudes.len() as f32
    }

    fn chroma(&self, magnitudes: &[f32]) -> [f32; CHROMA_LEN] {
        let mut classes = [0.0f32; CHROMA_LEN];

        // Bin 0 is DC and carries no pitch information.
        for (bin, &magnitude) in magnitudes.iter().enumerate().skip(1) {
            classes[self.chroma_classes[bin]] += magnitude;
        }

        let max = classes.iter().fold(0.0f32, |a, &b| a.max(b));
        if max > 0.0 {
            for class in classes.iter_mut() {
                *class /= max;
            }
        }
        classes
    }

    fn cepstra(&self, magnitudes: &[f32], total: f32) -> [f32; CEPSTRUM_LEN] {
        if total == 0.0 {
            return [0.0; CEPSTRUM_LEN];
        }
        self.mel_bank.cepstra(magnitudes)
    }

    /// Maps each bin to a pitch class by rounding its frequency to the
    /// nearest semitone on the A440 scale.
    fn chroma_class_table(sample_rate: f32, bins: usize) -> Vec<usize> {
        let fft_size = (bins * 2).max(2) as f32;
        (0..bins)
            .map(|bin| {
                if bin == 0 {
                    return 0;
                }
                let freq = bin as f32 * sample_rate / fft_size;
                let midi = 69.0 + 12.0 * (freq / 440.0).log2();
                (midi.round() as i64).rem_euclid(12) as usize
            })
            .collect()
    }
}

fn spectral_centroid(magnitudes: &[f32], total: f32) -> f32 {
    if total == 0.0 {
        return 0.0;
    }

    let weighted: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(bin, &magnitude)| bin as f32 * magnitude)
        .sum();

    weighted / total
}

fn spectral_rolloff(magnitudes: &[f32], total: f32) -> f32 {
    if total == 0.0 {
        return 0.0;
    }

    let threshold = total * ROLLOFF_THRESHOLD;
    let mut cumulative = 0.0;
    for (bin, &magnitude) in magnitudes.iter().enumerate() {
        cumulative += magnitude;
        if cumulative >= threshold {
            return bin as f32;
        }
    }
    (magnitudes.len().saturating_sub(1)) as f32
}

fn mean_squared(magnitudes: &[f32]) -> f32 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    magnitudes.iter().map(|&m| m * m).sum::<f32>() / magnitudes.len() as f32
}

fn zero_crossing_rate(time_domain: &[u8]) -> f32 {
    if time_domain.len() < 2 {
        return 0.0;
    }

    let crossings = time_domain
        .windows(2)
        .filter(|pair| {
            let a = pair[0] as i32 - SILENCE_BASELINE as i32;
            let b = pair[1] as i32 - SILENCE_BASELINE as i32;
            a * b < 0
        })
        .count();

    crossings as f32 / time_domain.len() as f32
}

fn root_mean_square(time_domain: &[u8]) -> f32 {
    if time_domain.is_empty() {
        return 0.0;
    }
    // An all-zero buffer is an unpopulated frame, not a signal pinned at
    // full negative amplitude.
    if time_domain.iter().all(|&s| s == 0) {
        return 0.0;
    }

    let sum_squares: f32 = time_domain
        .iter()
        .map(|&s| {
            let normalized = (s as f32 - SILENCE_BASELINE as f32) / SILENCE_BASELINE as f32;
            normalized * normalized
        })
        .sum();

    (sum_squares / time_domain.len() as f32).sqrt()
}

fn brightness(magnitudes: &[f32], total: f32) -> f32 {
    if total == 0.0 {
        return 0.0;
    }
    let upper: f32 = magnitudes[magnitudes.len() / 2..].iter().sum();
    upper / total
}

fn roughness(magnitudes: &[f32]) -> f32 {
    if magnitudes.len() < 3 {
        return 0.0;
    }

    let deviation: f32 = magnitudes
        .windows(3)
        .map(|w| (w[1] - (w[0] + w[2]) / 2.0).abs())
        .sum();

    deviation / (magnitudes.len() - 2) as f32
}

fn harmonicity(magnitudes: &[f32]) -> f32 {
    let max = magnitudes.iter().fold(0.0f32, |a, &b| a.max(b));
    if max == 0.0 {
        return 0.0;
    }

    let floor = max * PEAK_THRESHOLD;
    let mut peaks = Vec::new();
    for bin in 1..magnitudes.len().saturating_sub(1) {
        let m = magnitudes[bin];
        if m > floor && m > magnitudes[bin - 1] && m > magnitudes[bin + 1] {
            peaks.push(bin);
        }
    }

    if peaks.len() < 2 {
        return 0.0;
    }

    let fundamental = peaks[0] as f32;
    let score: f32 = peaks[1..]
        .iter()
        .map(|&peak| {
            let ratio = peak as f32 / fundamental;
            (-HARMONIC_FALLOFF * (ratio - ratio.round()).abs()).exp()
        })
        .sum();

    score / (peaks.len() - 1) as f32
}

fn spectral_moments(magnitudes: &[f32], total: f32, centroid: f32) -> (f32, f32, f32) {
    if total == 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let mut m2 = 0.0;
    let mut m3 = 0.0;
    let mut m4 = 0.0;
    for (bin, &magnitude) in magnitudes.iter().enumerate() {
        let p = magnitude / total;
        let d = bin as f32 - centroid;
        let d2 = d * d;
        m2 += p * d2;
        m3 += p * d2 * d;
        m4 += p * d2 * d2;
    }

    let spread = m2.sqrt();
    if spread == 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let skewness = m3 / (spread * spread * spread);
    let kurtosis = m4 / (m2 * m2) - 3.0;
    (spread, skewness, kurtosis)
}

fn spectral_slope(magnitudes: &[f32]) -> f32 {
    let n = magnitudes.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f32;
    let sum_x: f32 = (0..n).map(|i| i as f32).sum();
    let sum_y: f32 = magnitudes.iter().sum();
    let sum_xy: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| i as f32 * m)
        .sum();
    let sum_xx: f32 = (0..n).map(|i| (i as f32) * (i as f32)).sum();

    let denominator = n_f * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denominator
}
