use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Engine tuning, loadable from a TOML file. Every field has a default, so
/// a config file only needs the values it changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub beat: BeatConfig,
    pub onset: OnsetConfig,
    pub classifier: ClassifierConfig,
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate the analyser and feature extractor assume, in Hz.
    pub sample_rate: f32,
    /// FFT window size in samples; spectrum frames carry half this many bins.
    pub fft_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            fft_size: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Maximum retained energy samples.
    pub energy_history: usize,
    /// Maximum retained energy age in seconds.
    pub history_horizon_secs: f64,
    /// Samples required before any beat can fire.
    pub warmup: usize,
    /// Samples in the local mean/variance window.
    pub local_window: usize,
    /// Base trigger ratio over the local mean.
    pub base_sensitivity: f32,
    /// How much local variance raises the trigger ratio.
    pub variance_weight: f32,
    /// Refractory gap between beats, in seconds.
    pub min_interval_secs: f64,
    /// Tempo reported before the first estimate.
    pub default_bpm: f32,
    pub min_bpm: f32,
    pub max_bpm: f32,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            energy_history: 60,
            history_horizon_secs: 3.0,
            warmup: 10,
            local_window: 20,
            base_sensitivity: 1.4,
            variance_weight: 0.4,
            min_interval_secs: 0.12,
            default_bpm: 120.0,
            min_bpm: 60.0,
            max_bpm: 200.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    /// Maximum retained flux samples.
    pub history_len: usize,
    /// Flux samples required before onsets are reported.
    pub min_history: usize,
    /// Flux over the recent average must exceed this to count as an onset.
    pub threshold_ratio: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            history_len: 43,
            min_history: 5,
            threshold_ratio: 1.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Seconds between classification runs.
    pub interval_secs: f64,
    /// Raw predictions retained by the label smoother.
    pub smoothing_window: usize,
    /// Predictions required before smoothing takes over.
    pub smoothing_min: usize,
    /// Run classification on a background thread.
    pub background: bool,
    /// Longest wait for a background result before falling back.
    pub worker_timeout_ms: u64,
    /// Confidence above which a genre change applies its preset.
    pub auto_apply_confidence: f32,
    /// Scoring-model weight file; the heuristic rules run when absent.
    pub model_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.5,
            smoothing_window: 15,
            smoothing_min: 8,
            background: true,
            worker_timeout_ms: 100,
            auto_apply_confidence: 0.75,
            model_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_tuning() {
        let config = EngineConfig::default();
        assert_eq!(config.analysis.fft_size, 1024);
        assert_eq!(config.analysis.sample_rate, 44_100.0);
        assert_eq!(config.beat.energy_history, 60);
        assert_eq!(config.beat.warmup, 10);
        assert_eq!(config.beat.min_interval_secs, 0.12);
        assert_eq!(config.onset.history_len, 43);
        assert_eq!(config.classifier.interval_secs, 2.5);
        assert_eq!(config.classifier.worker_timeout_ms, 100);
        assert!(config.classifier.model_path.is_none());
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        let config: EngineConfig = toml::from_str(
            "[beat]\n\
             base_sensitivity = 1.8\n\
             [classifier]\n\
             background = false\n",
        )
        .unwrap();

        assert_eq!(config.beat.base_sensitivity, 1.8);
        assert!(!config.classifier.background);
        // Everything else keeps its default.
        assert_eq!(config.beat.local_window, 20);
        assert_eq!(config.classifier.smoothing_window, 15);
    }

    #[test]
    fn test_model_path_parses() {
        let config: EngineConfig =
            toml::from_str("[classifier]\nmodel_path = \"weights.json\"\n").unwrap();
        assert_eq!(
            config.classifier.model_path,
            Some(PathBuf::from("weights.json"))
        );
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let result: std::result::Result<EngineConfig, _> = toml::from_str("analysis = 3");
        assert!(result.is_err());
    }
}
