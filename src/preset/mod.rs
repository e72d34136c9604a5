use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod codec;
pub mod envelope;
pub mod library;

/// Size of the algorithm and palette vocabularies.
pub const ALGORITHM_COUNT: usize = 12;
pub const PALETTE_COUNT: usize = 12;

/// Numeric bounds for the tunable settings fields.
pub const SENSITIVITY_BOUNDS: (f32, f32) = (0.1, 3.0);
pub const COLOR_INTENSITY_BOUNDS: (f32, f32) = (0.1, 3.0);
pub const MOTION_SPEED_BOUNDS: (f32, f32) = (0.1, 4.0);
pub const PARTICLE_COUNT_BOUNDS: (f32, f32) = (100.0, 10_000.0);

/// Rendering algorithm vocabulary. Variant order is the canonical index
/// order used by the compact preset code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Particles,
    Waveform,
    Fractal,
    Fluid,
    Geometric,
    Neural,
    Dna,
    Quantum,
    Mandelbrot,
    Supershapes,
    Klein,
    Sdf,
}

impl Algorithm {
    pub const ALL: [Algorithm; ALGORITHM_COUNT] = [
        Algorithm::Particles,
        Algorithm::Waveform,
        Algorithm::Fractal,
        Algorithm::Fluid,
        Algorithm::Geometric,
        Algorithm::Neural,
        Algorithm::Dna,
        Algorithm::Quantum,
        Algorithm::Mandelbrot,
        Algorithm::Supershapes,
        Algorithm::Klein,
        Algorithm::Sdf,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Algorithm> {
        Self::ALL.get(index).copied()
    }
}

/// Color palette vocabulary, indexed like [`Algorithm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Rainbow,
    Ocean,
    Fire,
    Neon,
    Monochrome,
    Cyberpunk,
    Sunset,
    Aurora,
    Vaporwave,
    Synthwave,
    Galaxy,
    Matrix,
}

impl Palette {
    pub const ALL: [Palette; PALETTE_COUNT] = [
        Palette::Rainbow,
        Palette::Ocean,
        Palette::Fire,
        Palette::Neon,
        Palette::Monochrome,
        Palette::Cyberpunk,
        Palette::Sunset,
        Palette::Aurora,
        Palette::Vaporwave,
        Palette::Synthwave,
        Palette::Galaxy,
        Palette::Matrix,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Palette> {
        Self::ALL.get(index).copied()
    }
}

/// The six visualization settings a preset captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    pub algorithm: Algorithm,
    pub palette: Palette,
    pub sensitivity: f32,
    pub color_intensity: f32,
    pub motion_speed: f32,
    pub particle_count: u32,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Particles,
            palette: Palette::Rainbow,
            sensitivity: 1.0,
            color_intensity: 1.0,
            motion_speed: 1.0,
            particle_count: 1000,
        }
    }
}

impl VisualSettings {
    /// Clamps every numeric field into its documented bounds.
    pub fn clamped(mut self) -> Self {
        self.sensitivity = self
            .sensitivity
            .clamp(SENSITIVITY_BOUNDS.0, SENSITIVITY_BOUNDS.1);
        self.color_intensity = self
            .color_intensity
            .clamp(COLOR_INTENSITY_BOUNDS.0, COLOR_INTENSITY_BOUNDS.1);
        self.motion_speed = self
            .motion_speed
            .clamp(MOTION_SPEED_BOUNDS.0, MOTION_SPEED_BOUNDS.1);
        self.particle_count = self
            .particle_count
            .clamp(PARTICLE_COUNT_BOUNDS.0 as u32, PARTICLE_COUNT_BOUNDS.1 as u32);
        self
    }

    /// Applies a partial update. The whole patch is validated before any
    /// field changes, so a rejected patch leaves the settings untouched.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) -> Result<(), SettingsError> {
        if let Some(sensitivity) = patch.sensitivity {
            check_range("sensitivity", sensitivity, SENSITIVITY_BOUNDS)?;
        }
        if let Some(color_intensity) = patch.color_intensity {
            check_range("color_intensity", color_intensity, COLOR_INTENSITY_BOUNDS)?;
        }
        if let Some(motion_speed) = patch.motion_speed {
            check_range("motion_speed", motion_speed, MOTION_SPEED_BOUNDS)?;
        }
        if let Some(particle_count) = patch.particle_count {
            check_range("particle_count", particle_count as f32, PARTICLE_COUNT_BOUNDS)?;
        }

        if let Some(algorithm) = patch.algorithm {
            self.algorithm = algorithm;
        }
        if let Some(palette) = patch.palette {
            self.palette = palette;
        }
        if let Some(sensitivity) = patch.sensitivity {
            self.sensitivity = sensitivity;
        }
        if let Some(color_intensity) = patch.color_intensity {
            self.color_intensity = color_intensity;
        }
        if let Some(motion_speed) = patch.motion_speed {
            self.motion_speed = motion_speed;
        }
        if let Some(particle_count) = patch.particle_count {
            self.particle_count = particle_count;
        }
        Ok(())
    }
}

/// Partial settings update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub algorithm: Option<Algorithm>,
    pub palette: Option<Palette>,
    pub sensitivity: Option<f32>,
    pub color_intensity: Option<f32>,
    pub motion_speed: Option<f32>,
    pub particle_count: Option<u32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
}

fn check_range(field: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), SettingsError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

/// Errors from decoding preset codes and envelopes. Encoding never fails
/// for well-formed settings.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset code must be {expected} characters, got {found}")]
    BadLength { expected: usize, found: usize },
    #[error("invalid character {0:?} in preset code")]
    BadCharacter(char),
    #[error("preset envelope is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("preset envelope is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("preset envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("preset envelope is missing required field `{0}`")]
    MissingField(&'static str),
}
