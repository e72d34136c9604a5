use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use log::{debug, info};

use crate::audio::{BandLevels, BeatEvent, BeatTracker, FeatureExtractor, FeatureVector, OnsetTracker};
use crate::config::EngineConfig;
use crate::genre::{
    ClassificationWorker, GenreClassifier, GenrePrediction, HeuristicClassifier,
};
use crate::preset::{library, Algorithm, SettingsError, SettingsPatch, VisualSettings};

/// One frame of analyser output, borrowed for the duration of the update.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub spectrum: &'a [u8],
    pub time_domain: &'a [u8],
}

/// Everything a frame of analysis produced.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub features: FeatureVector,
    pub bands: BandLevels,
    pub beat: BeatEvent,
    pub onset_strength: f32,
    /// Latest (possibly carried-over) genre prediction.
    pub prediction: Option<GenrePrediction>,
    /// True when this frame auto-applied a genre preset.
    pub settings_changed: bool,
    pub render: RenderParams,
}

/// Per-frame visualization state in GPU-uploadable form.
///
/// All fields are 4-byte scalars in declaration order, so the block can be
/// written into a uniform buffer as-is.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RenderParams {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub beat_strength: f32,
    pub bpm: f32,
    pub onset_strength: f32,
    pub sensitivity: f32,
    pub color_intensity: f32,
    pub motion_speed: f32,
    pub particle_count: f32,
    pub algorithm: u32,
    pub palette: u32,
}

/// Contract the external renderer implements.
pub trait VisualSurface {
    fn set_algorithm(&mut self, algorithm: Algorithm);
    fn update_settings(&mut self, settings: &VisualSettings);
    fn update_visualization(&mut self, params: &RenderParams);
    fn resize(&mut self, width: u32, height: u32);
}

/// Orchestrates the per-frame analysis path and the throttled classifier.
///
/// `update` runs extraction, beat tracking, and onset detection
/// synchronously every call. Classification runs only once per configured
/// interval and, when a worker is enabled, on a background thread with a
/// bounded wait; a worker timeout degrades to the stateless heuristic rules
/// for that cycle so the frame is never stalled.
pub struct Engine {
    config: EngineConfig,
    extractor: FeatureExtractor,
    beat: BeatTracker,
    onset: OnsetTracker,
    worker: Option<ClassificationWorker>,
    classifier: Option<GenreClassifier>,
    heuristic: HeuristicClassifier,
    settings: VisualSettings,
    prediction: Option<GenrePrediction>,
    last_classify: Option<f64>,
    session: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let bins = config.analysis.fft_size / 2;
        let extractor = FeatureExtractor::new(config.analysis.sample_rate, bins);
        let beat = BeatTracker::new(config.beat.clone());
        let onset = OnsetTracker::new(config.onset.clone());

        let (worker, classifier) = Self::build_classifier(&config);

        Self {
            config,
            extractor,
            beat,
            onset,
            worker,
            classifier,
            heuristic: HeuristicClassifier::new(),
            settings: VisualSettings::default(),
            prediction: None,
            last_classify: None,
            session: 0,
        }
    }

    fn build_classifier(
        config: &EngineConfig,
    ) -> (Option<ClassificationWorker>, Option<GenreClassifier>) {
        let classifier = GenreClassifier::new(&config.classifier);
        if config.classifier.background {
            let timeout = Duration::from_millis(config.classifier.worker_timeout_ms);
            (Some(ClassificationWorker::spawn(classifier, timeout)), None)
        } else {
            (None, Some(classifier))
        }
    }

    /// Runs one frame at clock time `now_secs`.
    pub fn update(&mut self, input: FrameInput<'_>, now_secs: f64) -> FrameOutput {
        let features = self.extractor.extract(input.spectrum, input.time_domain);
        let bands = BandLevels::from_spectrum(input.spectrum);
        let beat = self.beat.update(bands.beat_energy(), now_secs);
        let onset_strength = self.onset.update(input.spectrum);

        let mut settings_changed = false;
        if self.classification_due(now_secs) {
            self.last_classify = Some(now_secs);
            let fresh = self.classify(&features);
            settings_changed = self.consider_preset(&fresh);
            self.prediction = Some(fresh);
        }

        let render = self.render_params(&bands, &beat, onset_strength);
        FrameOutput {
            features,
            bands,
            beat,
            onset_strength,
            prediction: self.prediction.clone(),
            settings_changed,
            render,
        }
    }

    /// Pushes one frame's output to a renderer, forwarding the settings
    /// update only when a preset was applied this frame.
    pub fn present(&self, output: &FrameOutput, surface: &mut dyn VisualSurface) {
        if output.settings_changed {
            surface.set_algorithm(self.settings.algorithm);
            surface.update_settings(&self.settings);
        }
        surface.update_visualization(&output.render);
    }

    /// Starts a new session (track change): rolling state is dropped and
    /// classification results still in flight for the old session are
    /// ignored when they arrive.
    pub fn begin_session(&mut self) {
        self.session += 1;
        self.extractor.reset();
        self.beat.reset();
        self.onset.reset();
        self.prediction = None;
        self.last_classify = None;

        // The worker thread owns its classifier's rolling history, so a
        // fresh session gets a fresh worker.
        match &mut self.classifier {
            Some(classifier) => classifier.reset(),
            None => {
                let (worker, classifier) = Self::build_classifier(&self.config);
                self.worker = worker;
                self.classifier = classifier;
            }
        }
        debug!("began analysis session {}", self.session);
    }

    pub fn settings(&self) -> &VisualSettings {
        &self.settings
    }

    /// Replaces the settings wholesale, clamping into documented bounds.
    pub fn set_settings(&mut self, settings: VisualSettings) {
        self.settings = settings.clamped();
    }

    /// Applies a validated partial settings update.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) -> Result<(), SettingsError> {
        self.settings.apply_patch(patch)
    }

    pub fn prediction(&self) -> Option<&GenrePrediction> {
        self.prediction.as_ref()
    }

    pub fn bpm(&self) -> f32 {
        self.beat.bpm()
    }

    fn classification_due(&self, now_secs: f64) -> bool {
        match self.last_classify {
            Some(last) => now_secs - last >= self.config.classifier.interval_secs,
            None => true,
        }
    }

    fn classify(&mut self, features: &FeatureVector) -> GenrePrediction {
        if let Some(worker) = &self.worker {
            if let Some(prediction) = worker.classify(features, self.session) {
                return prediction;
            }
            debug!("worker missed its deadline, classifying heuristically");
            return self.heuristic.classify(features);
        }

        match &mut self.classifier {
            Some(classifier) => classifier.classify(features),
            None => self.heuristic.classify(features),
        }
    }

    /// Applies the genre's preset when a fresh prediction is confident
    /// enough and names a different genre than the current one.
    fn consider_preset(&mut self, fresh: &GenrePrediction) -> bool {
        if fresh.confidence <= self.config.classifier.auto_apply_confidence {
            return false;
        }
        if self
            .prediction
            .as_ref()
            .is_some_and(|previous| previous.genre == fresh.genre)
        {
            return false;
        }

        self.settings = library::for_genre(fresh.genre);
        info!(
            "applying {} preset (confidence {:.2})",
            fresh.genre, fresh.confidence
        );
        true
    }

    fn render_params(&self, bands: &BandLevels, beat: &BeatEvent, onset: f32) -> RenderParams {
        RenderParams {
            bass: bands.bass,
            mid: bands.mid,
            treble: bands.treble,
            beat_strength: if beat.is_beat { beat.strength } else { 0.0 },
            bpm: beat.bpm,
            onset_strength: onset,
            sensitivity: self.settings.sensitivity,
            color_intensity: self.settings.color_intensity,
            motion_speed: self.settings.motion_speed,
            particle_count: self.settings.particle_count as f32,
            algorithm: self.settings.algorithm.index() as u32,
            palette: self.settings.palette.index() as u32,
        }
    }
}
