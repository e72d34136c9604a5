use std::fmt;

use serde::{Deserialize, Serialize};

pub mod classifier;
pub mod heuristic;
pub mod model;
pub mod projection;
pub mod smoothing;
pub mod worker;

pub use classifier::GenreClassifier;
pub use heuristic::HeuristicClassifier;
pub use model::{GenreModel, LinearGenreModel, ModelError};
pub use projection::{FeatureProjector, PROJECTION_LEN};
pub use smoothing::PredictionSmoother;
pub use worker::ClassificationWorker;

/// Size of the closed genre vocabulary.
pub const GENRE_COUNT: usize = 16;

/// The closed genre vocabulary. Variant order is the canonical index order
/// used by distributions and model weight rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Rock,
    Electronic,
    Jazz,
    Classical,
    Pop,
    HipHop,
    Ambient,
    Folk,
    Metal,
    Reggae,
    Blues,
    Country,
    Dubstep,
    House,
    Techno,
    Trance,
}

impl Genre {
    pub const ALL: [Genre; GENRE_COUNT] = [
        Genre::Rock,
        Genre::Electronic,
        Genre::Jazz,
        Genre::Classical,
        Genre::Pop,
        Genre::HipHop,
        Genre::Ambient,
        Genre::Folk,
        Genre::Metal,
        Genre::Reggae,
        Genre::Blues,
        Genre::Country,
        Genre::Dubstep,
        Genre::House,
        Genre::Techno,
        Genre::Trance,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Genre> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Rock => "rock",
            Genre::Electronic => "electronic",
            Genre::Jazz => "jazz",
            Genre::Classical => "classical",
            Genre::Pop => "pop",
            Genre::HipHop => "hip-hop",
            Genre::Ambient => "ambient",
            Genre::Folk => "folk",
            Genre::Metal => "metal",
            Genre::Reggae => "reggae",
            Genre::Blues => "blues",
            Genre::Country => "country",
            Genre::Dubstep => "dubstep",
            Genre::House => "house",
            Genre::Techno => "techno",
            Genre::Trance => "trance",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classification result: the winning genre, its confidence, and the
/// full probability distribution over the vocabulary (indexed by
/// [`Genre::index`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenrePrediction {
    pub genre: Genre,
    pub confidence: f32,
    pub distribution: [f32; GENRE_COUNT],
}

impl GenrePrediction {
    /// A prediction with the winner at `confidence` and the remaining
    /// probability mass split evenly across the other genres.
    pub fn concentrated(genre: Genre, confidence: f32) -> Self {
        let remainder = (1.0 - confidence).max(0.0) / (GENRE_COUNT - 1) as f32;
        let mut distribution = [remainder; GENRE_COUNT];
        distribution[genre.index()] = confidence;
        Self {
            genre,
            confidence,
            distribution,
        }
    }

    /// Builds a prediction from a probability distribution by taking the
    /// argmax as the winner.
    pub fn from_distribution(distribution: [f32; GENRE_COUNT]) -> Self {
        let mut winner = 0;
        for (index, &p) in distribution.iter().enumerate() {
            if p > distribution[winner] {
                winner = index;
            }
        }
        Self {
            genre: Genre::ALL[winner],
            confidence: distribution[winner],
            distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_index(genre.index()), Some(genre));
        }
        assert_eq!(Genre::from_index(GENRE_COUNT), None);
    }

    #[test]
    fn test_serde_names_are_kebab_case() {
        let json = serde_json::to_string(&Genre::HipHop).unwrap();
        assert_eq!(json, "\"hip-hop\"");

        let parsed: Genre = serde_json::from_str("\"electronic\"").unwrap();
        assert_eq!(parsed, Genre::Electronic);
    }

    #[test]
    fn test_concentrated_distribution_sums_to_one() {
        let prediction = GenrePrediction::concentrated(Genre::Jazz, 0.7);
        let total: f32 = prediction.distribution.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(prediction.distribution[Genre::Jazz.index()], 0.7);
    }

    #[test]
    fn test_from_distribution_picks_argmax() {
        let mut distribution = [1.0 / GENRE_COUNT as f32; GENRE_COUNT];
        distribution[Genre::Techno.index()] = 0.5;
        let prediction = GenrePrediction::from_distribution(distribution);
        assert_eq!(prediction.genre, Genre::Techno);
        assert_eq!(prediction.confidence, 0.5);
    }
}
