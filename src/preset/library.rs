use crate::genre::Genre;

use super::{Algorithm, Palette, VisualSettings};

/// The preset applied when a genre is detected with enough confidence.
///
/// Every genre in the vocabulary has a hand-tuned entry, so lookups never
/// fall back.
pub fn for_genre(genre: Genre) -> VisualSettings {
    let (algorithm, palette, sensitivity, color_intensity, motion_speed, particle_count) =
        match genre {
            Genre::Rock => (Algorithm::Geometric, Palette::Fire, 2.1, 1.9, 2.4, 2000),
            Genre::Electronic => (Algorithm::Sdf, Palette::Cyberpunk, 1.9, 2.2, 2.8, 2500),
            Genre::Jazz => (Algorithm::Klein, Palette::Sunset, 1.4, 1.6, 1.3, 1500),
            Genre::Classical => (Algorithm::Supershapes, Palette::Aurora, 0.8, 1.4, 0.7, 1200),
            Genre::Pop => (Algorithm::Particles, Palette::Rainbow, 1.5, 1.8, 1.7, 1800),
            Genre::HipHop => (Algorithm::Geometric, Palette::Neon, 2.0, 2.0, 1.9, 2200),
            Genre::Ambient => (Algorithm::Mandelbrot, Palette::Ocean, 0.6, 1.1, 0.5, 800),
            Genre::Folk => (Algorithm::Waveform, Palette::Sunset, 1.2, 1.3, 1.1, 1000),
            Genre::Metal => (Algorithm::Fractal, Palette::Fire, 2.4, 2.1, 2.7, 3000),
            Genre::Reggae => (Algorithm::Dna, Palette::Aurora, 1.3, 1.5, 1.2, 1300),
            Genre::Blues => (Algorithm::Fluid, Palette::Ocean, 1.1, 1.4, 1.0, 1100),
            Genre::Country => (Algorithm::Waveform, Palette::Sunset, 1.2, 1.3, 1.1, 1200),
            Genre::Dubstep => (Algorithm::Sdf, Palette::Cyberpunk, 2.5, 2.3, 3.0, 4000),
            Genre::House => (Algorithm::Quantum, Palette::Neon, 1.8, 2.0, 2.2, 2000),
            Genre::Techno => (Algorithm::Neural, Palette::Matrix, 2.0, 2.1, 2.5, 2500),
            Genre::Trance => (Algorithm::Supershapes, Palette::Vaporwave, 1.7, 1.9, 2.0, 1800),
        };

    VisualSettings {
        algorithm,
        palette,
        sensitivity,
        color_intensity,
        motion_speed,
        particle_count,
    }
}
