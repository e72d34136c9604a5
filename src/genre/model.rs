use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::{Genre, GENRE_COUNT, PROJECTION_LEN};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model has {found} classes, the vocabulary has {expected}")]
    ClassMismatch { expected: usize, found: usize },
    #[error("model row {row} has {found} inputs, expected {expected}")]
    InputMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("model genre list does not match the built-in vocabulary order")]
    VocabularyOrder,
    #[error("inference produced non-finite scores")]
    NonFinite,
}

/// A scoring model over the projected feature space.
///
/// Implementations must be infallible for well-formed weights; an `Err`
/// from `infer` reroutes the caller to the heuristic rules instead of
/// surfacing anywhere.
pub trait GenreModel: Send {
    fn infer(&self, input: &[f32; PROJECTION_LEN]) -> Result<[f32; GENRE_COUNT], ModelError>;
}

#[derive(Deserialize)]
struct ModelFile {
    genres: Vec<Genre>,
    weights: Vec<Vec<f32>>,
    biases: Vec<f32>,
}

/// Linear scoring model: one weight row and bias per genre, softmax over
/// the class scores. Weights come from a JSON file produced offline.
#[derive(Debug)]
pub struct LinearGenreModel {
    weights: Vec<[f32; PROJECTION_LEN]>,
    biases: Vec<f32>,
}

impl LinearGenreModel {
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_str(text)?;

        if file.genres.len() != GENRE_COUNT {
            return Err(ModelError::ClassMismatch {
                expected: GENRE_COUNT,
                found: file.genres.len(),
            });
        }
        if file.genres.as_slice() != Genre::ALL.as_slice() {
            return Err(ModelError::VocabularyOrder);
        }
        if file.weights.len() != GENRE_COUNT {
            return Err(ModelError::ClassMismatch {
                expected: GENRE_COUNT,
                found: file.weights.len(),
            });
        }
        if file.biases.len() != GENRE_COUNT {
            return Err(ModelError::ClassMismatch {
                expected: GENRE_COUNT,
                found: file.biases.len(),
            });
        }

        let mut weights = Vec::with_capacity(GENRE_COUNT);
        for (row, values) in file.weights.into_iter().enumerate() {
            if values.len() != PROJECTION_LEN {
                return Err(ModelError::InputMismatch {
                    row,
                    expected: PROJECTION_LEN,
                    found: values.len(),
                });
            }
            let mut fixed = [0.0f32; PROJECTION_LEN];
            fixed.copy_from_slice(&values);
            weights.push(fixed);
        }

        Ok(Self {
            weights,
            biases: file.biases,
        })
    }
}

impl GenreModel for LinearGenreModel {
    fn infer(&self, input: &[f32; PROJECTION_LEN]) -> Result<[f32; GENRE_COUNT], ModelError> {
        let mut scores = [0.0f32; GENRE_COUNT];
        for (slot, (row, &bias)) in scores
            .iter_mut()
            .zip(self.weights.iter().zip(self.biases.iter()))
        {
            *slot = row
                .iter()
                .zip(input.iter())
                .map(|(&w, &x)| w * x)
                .sum::<f32>()
                + bias;
        }

        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        Ok(softmax(scores))
    }
}

/// Max-subtracted softmax, stable for large score magnitudes.
fn softmax(mut scores: [f32; GENRE_COUNT]) -> [f32; GENRE_COUNT] {
    let max = scores.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let mut total = 0.0;
    for score in scores.iter_mut() {
        *score = (*score - max).exp();
        total += *score;
    }
    for score in scores.iter_mut() {
        *score /= total;
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre_names() -> String {
        let names: Vec<String> = Genre::ALL
            .iter()
            .map(|g| format!("\"{}\"", g.as_str()))
            .collect();
        names.join(",")
    }

    fn model_json(rows: usize, cols: usize, biases: usize) -> String {
        let row: Vec<String> = (0..cols).map(|_| "0.0".to_string()).collect();
        let row = format!("[{}]", row.join(","));
        let weights: Vec<String> = (0..rows).map(|_| row.clone()).collect();
        let bias: Vec<String> = (0..biases).map(|_| "0.0".to_string()).collect();
        format!(
            "{{\"genres\":[{}],\"weights\":[{}],\"biases\":[{}]}}",
            genre_names(),
            weights.join(","),
            bias.join(",")
        )
    }

    #[test]
    fn test_loads_well_formed_model() {
        let model = LinearGenreModel::from_json(&model_json(16, 40, 16)).unwrap();
        let probabilities = model.infer(&[0.0; PROJECTION_LEN]).unwrap();

        let total: f32 = probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        // Zero weights score every class evenly.
        for &p in probabilities.iter() {
            assert!((p - 1.0 / GENRE_COUNT as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_wrong_class_count() {
        let err = LinearGenreModel::from_json(&model_json(16, 40, 15)).unwrap_err();
        assert!(matches!(err, ModelError::ClassMismatch { found: 15, .. }));
    }

    #[test]
    fn test_rejects_wrong_input_width() {
        let err = LinearGenreModel::from_json(&model_json(16, 39, 16)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InputMismatch {
                row: 0,
                found: 39,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_reordered_vocabulary() {
        let mut json = model_json(16, 40, 16);
        json = json.replace("\"rock\",\"electronic\"", "\"electronic\",\"rock\"");
        let err = LinearGenreModel::from_json(&json).unwrap_err();
        assert!(matches!(err, ModelError::VocabularyOrder));
    }

    #[test]
    fn test_rejects_unknown_genre_name() {
        let json = model_json(16, 40, 16).replace("\"rock\"", "\"polka\"");
        let err = LinearGenreModel::from_json(&json).unwrap_err();
        assert!(matches!(err, ModelError::Parse(_)));
    }

    #[test]
    fn test_softmax_prefers_highest_score() {
        let mut json = model_json(16, 40, 16);
        // Bias the jazz row (index 2) upward.
        json = json.replace(
            "\"biases\":[0.0,0.0,0.0",
            "\"biases\":[0.0,0.0,5.0",
        );
        let model = LinearGenreModel::from_json(&json).unwrap();
        let probabilities = model.infer(&[0.0; PROJECTION_LEN]).unwrap();

        let winner = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index);
        assert_eq!(winner, Some(Genre::Jazz.index()));
    }

    #[test]
    fn test_non_finite_weights_error_instead_of_propagating() {
        let json = model_json(16, 40, 16).replace("\"biases\":[0.0", "\"biases\":[1e39");
        let model = LinearGenreModel::from_json(&json).unwrap();
        // f32 overflow in the bias makes the score infinite.
        let err = model.infer(&[0.0; PROJECTION_LEN]).unwrap_err();
        assert!(matches!(err, ModelError::NonFinite));
    }
}
