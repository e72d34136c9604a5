use log::{debug, warn};

use crate::audio::FeatureVector;
use crate::config::ClassifierConfig;

use super::{
    FeatureProjector, GenreModel, GenrePrediction, HeuristicClassifier, LinearGenreModel,
    PredictionSmoother, GENRE_COUNT,
};

/// Winner margin over the runner-up that triggers confidence boosting.
const BOOST_MARGIN: f32 = 0.25;

/// Multipliers applied to the winner and the rest when boosting.
const BOOST_WINNER: f32 = 1.3;
const BOOST_OTHERS: f32 = 0.85;

/// Full classification pipeline: projection, scoring, fallback, smoothing.
///
/// `classify` is total. A missing or failing model degrades to the
/// heuristic rules, never to an error, so callers can treat the result as
/// always present.
pub struct GenreClassifier {
    projector: FeatureProjector,
    model: Option<Box<dyn GenreModel>>,
    heuristic: HeuristicClassifier,
    smoother: PredictionSmoother,
}

impl GenreClassifier {
    /// Builds the pipeline from configuration. A configured model file that
    /// fails to load is logged and replaced by the heuristic path.
    pub fn new(config: &ClassifierConfig) -> Self {
        let model = config.model_path.as_ref().and_then(|path| {
            match LinearGenreModel::from_file(path) {
                Ok(model) => {
                    debug!("loaded genre model from {}", path.display());
                    Some(Box::new(model) as Box<dyn GenreModel>)
                }
                Err(e) => {
                    warn!("genre model unavailable ({e}), using heuristic rules");
                    None
                }
            }
        });

        Self::with_model(model, config)
    }

    /// Builds the pipeline around an explicit model, or none for the pure
    /// heuristic path.
    pub fn with_model(model: Option<Box<dyn GenreModel>>, config: &ClassifierConfig) -> Self {
        Self {
            projector: FeatureProjector::new(),
            model,
            heuristic: HeuristicClassifier::new(),
            smoother: PredictionSmoother::new(config.smoothing_window, config.smoothing_min),
        }
    }

    /// Classifies one frame: raw prediction, then label smoothing.
    pub fn classify(&mut self, features: &FeatureVector) -> GenrePrediction {
        let raw = self.classify_raw(features);
        self.smoother.push(raw)
    }

    /// Classification without smoothing. Still updates projection history.
    pub fn classify_raw(&mut self, features: &FeatureVector) -> GenrePrediction {
        let input = self.projector.ingest(features);

        match &self.model {
            Some(model) => match model.infer(&input) {
                Ok(mut distribution) => {
                    boost_confident_winner(&mut distribution);
                    GenrePrediction::from_distribution(distribution)
                }
                Err(e) => {
                    debug!("model inference failed ({e}), using heuristic rules");
                    self.heuristic.classify(features)
                }
            },
            None => self.heuristic.classify(features),
        }
    }

    /// Clears projection and smoothing history for a new track.
    pub fn reset(&mut self) {
        self.projector.reset();
        self.smoother.reset();
    }
}

/// Sharpens a decisive distribution: when the winner leads the runner-up
/// by more than [`BOOST_MARGIN`], scale the winner up and the rest down,
/// then renormalize.
fn boost_confident_winner(distribution: &mut [f32; GENRE_COUNT]) {
    let mut winner = 0;
    for (index, &p) in distribution.iter().enumerate() {
        if p > distribution[winner] {
            winner = index;
        }
    }
    let runner_up = distribution
        .iter()
        .enumerate()
        .filter(|&(index, _)| index != winner)
        .map(|(_, &p)| p)
        .fold(0.0f32, f32::max);

    if distribution[winner] - runner_up <= BOOST_MARGIN {
        return;
    }

    for (index, p) in distribution.iter_mut().enumerate() {
        if index == winner {
            *p = (*p * BOOST_WINNER).min(1.0);
        } else {
            *p *= BOOST_OTHERS;
        }
    }
    let total: f32 = distribution.iter().sum();
    if total > 0.0 {
        for p in distribution.iter_mut() {
            *p /= total;
        }
    }
}
