use std::collections::VecDeque;

use super::{GenrePrediction, GENRE_COUNT};

/// Scale applied to the winning vote share before the confidence clamp.
const VOTE_CONFIDENCE_SCALE: f32 = 2.5;

/// Suppresses label flicker by voting over recent raw predictions.
///
/// Each retained prediction votes for its genre, weighted by its
/// confidence. Until the history holds the configured minimum, raw
/// predictions pass through untouched so startup output is not biased
/// toward whichever genre happened to arrive first.
pub struct PredictionSmoother {
    window: usize,
    min_history: usize,
    history: VecDeque<GenrePrediction>,
}

impl PredictionSmoother {
    pub fn new(window: usize, min_history: usize) -> Self {
        Self {
            window,
            min_history,
            history: VecDeque::with_capacity(window),
        }
    }

    pub fn push(&mut self, raw: GenrePrediction) -> GenrePrediction {
        self.history.push_back(raw.clone());
        while self.history.len() > self.window {
            self.history.pop_front();
        }

        if self.history.len() < self.min_history {
            return raw;
        }

        let mut votes = [0.0f32; GENRE_COUNT];
        for prediction in &self.history {
            votes[prediction.genre.index()] += prediction.confidence;
        }
        let total: f32 = votes.iter().sum();
        if total <= 0.0 {
            return raw;
        }

        let mut distribution = votes;
        for share in distribution.iter_mut() {
            *share /= total;
        }
        let mut smoothed = GenrePrediction::from_distribution(distribution);
        smoothed.confidence = (smoothed.confidence * VOTE_CONFIDENCE_SCALE).min(1.0);
        smoothed
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
