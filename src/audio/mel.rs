use super::features::CEPSTRUM_LEN;

/// Lowest frequency covered by the filterbank, in Hz.
const MEL_LOW_HZ: f32 = 80.0;

/// Highest frequency covered by the filterbank, in Hz. Clamped to Nyquist
/// for low sample rates.
const MEL_HIGH_HZ: f32 = 8000.0;

/// Floor applied to filter energies before taking the log.
const LOG_FLOOR: f32 = 1e-10;

/// One triangular filter over a contiguous run of spectrum bins.
struct MelFilter {
    start: usize,
    weights: Vec<f32>,
}

impl MelFilter {
    fn apply(&self, magnitudes: &[f32]) -> f32 {
        self.weights
            .iter()
            .enumerate()
            .map(|(offset, &weight)| {
                magnitudes
                    .get(self.start + offset)
                    .map_or(0.0, |&magnitude| magnitude * weight)
            })
            .sum()
    }
}

/// Triangular mel-spaced filterbank with a DCT stage, yielding compact
/// spectral-envelope coefficients.
///
/// Filter edges are spaced evenly on the mel scale between 80 Hz and 8 kHz,
/// converted back to bin indices for the configured resolution.
pub struct MelFilterBank {
    filters: Vec<MelFilter>,
}

impl MelFilterBank {
    pub fn new(filter_count: usize, spectrum_bins: usize, sample_rate: f32) -> Self {
        let fft_size = spectrum_bins * 2;
        let nyquist = sample_rate / 2.0;
        let high_hz = MEL_HIGH_HZ.min(nyquist);
        let low_mel = hz_to_mel(MEL_LOW_HZ.min(high_hz));
        let high_mel = hz_to_mel(high_hz);

        // filter_count triangles need filter_count + 2 edge points.
        let edges: Vec<usize> = (0..filter_count + 2)
            .map(|i| {
                let mel = low_mel + (high_mel - low_mel) * i as f32 / (filter_count + 1) as f32;
                let hz = mel_to_hz(mel);
                let bin = ((fft_size + 1) as f32 * hz / sample_rate).floor() as usize;
                bin.min(spectrum_bins.saturating_sub(1))
            })
            .collect();

        let filters = edges
            .windows(3)
            .map(|edge| {
                let (left, center, right) = (edge[0], edge[1], edge[2]);
                let mut weights = Vec::with_capacity(right.saturating_sub(left) + 1);
                for bin in left..=right {
                    let weight = if bin <= center {
                        ramp(bin, left, center)
                    } else {
                        1.0 - ramp(bin, center, right)
                    };
                    weights.push(weight);
                }
                MelFilter {
                    start: left,
                    weights,
                }
            })
            .collect();

        Self { filters }
    }

    /// Log filter energies followed by a DCT-II across filters.
    pub fn cepstra(&self, magnitudes: &[f32]) -> [f32; CEPSTRUM_LEN] {
        let log_energies: Vec<f32> = self
            .filters
            .iter()
            .map(|filter| (filter.apply(magnitudes) + LOG_FLOOR).ln())
            .collect();

        let mut coefficients = [0.0f32; CEPSTRUM_LEN];
        let n = log_energies.len() as f32;
        for (k, coefficient) in coefficients.iter_mut().enumerate() {
            *coefficient = log_energies
                .iter()
                .enumerate()
                .map(|(m, &energy)| {
                    energy * (std::f32::consts::PI * k as f32 * (m as f32 + 0.5) / n).cos()
                })
                .sum::<f32>();
        }
        coefficients
    }
}

/// Degenerate edge runs collapse to a single full-weight bin.
fn ramp(bin: usize, from: usize, to: usize) -> f32 {
    if to <= from {
        return 1.0;
    }
    (bin - from) as f32 / (to - from) as f32
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}
