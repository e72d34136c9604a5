use std::collections::VecDeque;

use crate::config::BeatConfig;

/// Most recent beat timestamps kept for tempo estimation.
const TEMPO_MEMORY: usize = 8;

/// Beats needed before the tempo estimate is recomputed.
const TEMPO_MIN_BEATS: usize = 4;

/// Per-frame beat verdict.
///
/// `bpm` is the current tempo estimate and is always populated; it stays at
/// the configured default until enough beats have accumulated, and holds its
/// last value between recomputes. On non-beat frames `strength` and
/// `confidence` are 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    pub is_beat: bool,
    /// How far the frame rose above the local average, scaled into [0, 1].
    pub strength: f32,
    pub confidence: f32,
    pub bpm: f32,
}

/// Adaptive energy-flux beat detector.
///
/// Each frame's energy is compared against the mean of a short local window,
/// with the trigger ratio raised in proportion to the window's variance so
/// noisy material needs a stronger transient to fire. A refractory interval
/// suppresses double triggers on sustained hits. The caller supplies the
/// clock, so offline analysis can run a simulated timeline.
pub struct BeatTracker {
    config: BeatConfig,
    energy_history: VecDeque<(f64, f32)>,
    beat_times: VecDeque<f64>,
    last_beat_time: Option<f64>,
    bpm: f32,
}

impl BeatTracker {
    pub fn new(config: BeatConfig) -> Self {
        let capacity = config.energy_history;
        let bpm = config.default_bpm;
        Self {
            config,
            energy_history: VecDeque::with_capacity(capacity),
            beat_times: VecDeque::with_capacity(TEMPO_MEMORY),
            last_beat_time: None,
            bpm,
        }
    }

    /// Feeds one frame of energy at clock time `now` (seconds).
    pub fn update(&mut self, energy: f32, now: f64) -> BeatEvent {
        self.evict_stale(now);

        let ratio = self.trigger_ratio(energy, now);
        self.energy_history.push_back((now, energy));
        while self.energy_history.len() > self.config.energy_history {
            self.energy_history.pop_front();
        }

        let Some(ratio) = ratio else {
            return self.quiet_frame();
        };

        self.last_beat_time = Some(now);
        self.record_beat(now);

        let strength = ((ratio - 1.0) / 4.0).clamp(0.0, 1.0);
        BeatEvent {
            is_beat: true,
            strength,
            confidence: strength,
            bpm: self.bpm,
        }
    }

    /// Current tempo estimate in beats per minute.
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn reset(&mut self) {
        self.energy_history.clear();
        self.beat_times.clear();
        self.last_beat_time = None;
        self.bpm = self.config.default_bpm;
    }

    fn quiet_frame(&self) -> BeatEvent {
        BeatEvent {
            is_beat: false,
            strength: 0.0,
            confidence: 0.0,
            bpm: self.bpm,
        }
    }

    /// Returns the energy ratio when the frame qualifies as a beat.
    fn trigger_ratio(&self, energy: f32, now: f64) -> Option<f32> {
        if self.energy_history.len() < self.config.warmup {
            return None;
        }

        let (mean, variance) = self.local_stats();
        if mean <= 0.0 {
            return None;
        }

        let threshold =
            self.config.base_sensitivity + self.config.variance_weight * variance.sqrt();
        let ratio = energy / mean;
        if ratio <= threshold {
            return None;
        }

        if let Some(last) = self.last_beat_time {
            if now - last < self.config.min_interval_secs {
                return None;
            }
        }

        Some(ratio)
    }

    fn local_stats(&self) -> (f32, f32) {
        let count = self.energy_history.len().min(self.config.local_window);
        if count == 0 {
            return (0.0, 0.0);
        }

        let window = self.energy_history.iter().rev().take(count);
        let mean = window.clone().map(|&(_, e)| e).sum::<f32>() / count as f32;
        if count < 2 {
            return (mean, 0.0);
        }

        let variance = window.map(|&(_, e)| (e - mean) * (e - mean)).sum::<f32>()
            / (count - 1) as f32;
        (mean, variance)
    }

    fn evict_stale(&mut self, now: f64) {
        let horizon = now - self.config.history_horizon_secs;
        while let Some(&(time, _)) = self.energy_history.front() {
            if time >= horizon {
                break;
            }
            self.energy_history.pop_front();
        }
    }

    fn record_beat(&mut self, now: f64) {
        self.beat_times.push_back(now);
        while self.beat_times.len() > TEMPO_MEMORY {
            self.beat_times.pop_front();
        }

        if self.beat_times.len() < TEMPO_MIN_BEATS {
            return;
        }

        let intervals: Vec<f64> = self
            .beat_times
            .iter()
            .zip(self.beat_times.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();
        let average = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if average <= 0.0 {
            return;
        }

        let bpm = (60.0 / average) as f32;
        self.bpm = bpm.clamp(self.config.min_bpm, self.config.max_bpm);
    }
}
