use super::{
    Algorithm, Palette, PresetError, VisualSettings, COLOR_INTENSITY_BOUNDS, MOTION_SPEED_BOUNDS,
    PARTICLE_COUNT_BOUNDS, SENSITIVITY_BOUNDS,
};

/// Compact codes are always exactly this many characters.
pub const CODE_LEN: usize = 12;

/// Top quantization step for numeric fields.
const QUANT_STEPS: u32 = 61;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encodes settings as a 12-character shareable code.
///
/// Six two-character base-62 fields: algorithm, palette, then the four
/// numeric settings quantized linearly into their bounds. Out-of-range
/// numerics are clamped before quantization, so encoding never fails.
pub fn encode(settings: &VisualSettings) -> String {
    let fields = [
        settings.algorithm.index() as u32,
        settings.palette.index() as u32,
        quantize(settings.sensitivity, SENSITIVITY_BOUNDS),
        quantize(settings.color_intensity, COLOR_INTENSITY_BOUNDS),
        quantize(settings.motion_speed, MOTION_SPEED_BOUNDS),
        quantize(settings.particle_count as f32, PARTICLE_COUNT_BOUNDS),
    ];

    let mut code = String::with_capacity(CODE_LEN);
    for value in fields {
        code.push(ALPHABET[(value / 62) as usize % 62] as char);
        code.push(ALPHABET[(value % 62) as usize] as char);
    }
    code
}

/// Decodes a 12-character code back into settings.
///
/// Unknown algorithm or palette indices fall back to the defaults rather
/// than erroring; numeric fields are clamped into their bounds. Only a bad
/// length or a character outside the alphabet is an error.
pub fn decode(code: &str) -> Result<VisualSettings, PresetError> {
    let chars: Vec<char> = code.chars().collect();
    if chars.len() != CODE_LEN {
        return Err(PresetError::BadLength {
            expected: CODE_LEN,
            found: chars.len(),
        });
    }

    let mut fields = [0u32; 6];
    for (field, pair) in fields.iter_mut().zip(chars.chunks(2)) {
        *field = digit(pair[0])? * 62 + digit(pair[1])?;
    }

    Ok(VisualSettings {
        algorithm: Algorithm::from_index(fields[0] as usize).unwrap_or_default(),
        palette: Palette::from_index(fields[1] as usize).unwrap_or_default(),
        sensitivity: unquantize(fields[2], SENSITIVITY_BOUNDS),
        color_intensity: unquantize(fields[3], COLOR_INTENSITY_BOUNDS),
        motion_speed: unquantize(fields[4], MOTION_SPEED_BOUNDS),
        particle_count: unquantize(fields[5], PARTICLE_COUNT_BOUNDS).round() as u32,
    })
}

fn quantize(value: f32, (lo, hi): (f32, f32)) -> u32 {
    let clamped = value.clamp(lo, hi);
    ((clamped - lo) / (hi - lo) * QUANT_STEPS as f32).round() as u32
}

fn unquantize(step: u32, (lo, hi): (f32, f32)) -> f32 {
    lo + step.min(QUANT_STEPS) as f32 / QUANT_STEPS as f32 * (hi - lo)
}

fn digit(c: char) -> Result<u32, PresetError> {
    match c {
        '0'..='9' => Ok(c as u32 - '0' as u32),
        'A'..='Z' => Ok(c as u32 - 'A' as u32 + 10),
        'a'..='z' => Ok(c as u32 - 'a' as u32 + 36),
        _ => Err(PresetError::BadCharacter(c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(bounds: (f32, f32)) -> f32 {
        (bounds.1 - bounds.0) / QUANT_STEPS as f32
    }

    #[test]
    fn test_code_is_twelve_chars() {
        let code = encode(&VisualSettings::default());
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_default_settings_round_trip() {
        let settings = VisualSettings::default();
        let decoded = decode(&encode(&settings)).unwrap();

        assert_eq!(decoded.algorithm, Algorithm::Particles);
        assert_eq!(decoded.palette, Palette::Rainbow);
        assert!((decoded.sensitivity - 1.0).abs() <= step(SENSITIVITY_BOUNDS));
        assert!((decoded.color_intensity - 1.0).abs() <= step(COLOR_INTENSITY_BOUNDS));
        assert!((decoded.motion_speed - 1.0).abs() <= step(MOTION_SPEED_BOUNDS));
        let count_error = (decoded.particle_count as f32 - 1000.0).abs();
        assert!(count_error <= step(PARTICLE_COUNT_BOUNDS));
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let cases = [
            VisualSettings {
                algorithm: Algorithm::Sdf,
                palette: Palette::Cyberpunk,
                sensitivity: 1.9,
                color_intensity: 2.2,
                motion_speed: 2.8,
                particle_count: 2500,
            },
            VisualSettings {
                algorithm: Algorithm::Mandelbrot,
                palette: Palette::Ocean,
                sensitivity: 0.1,
                color_intensity: 3.0,
                motion_speed: 4.0,
                particle_count: 100,
            },
            VisualSettings {
                algorithm: Algorithm::Klein,
                palette: Palette::Matrix,
                sensitivity: 2.37,
                color_intensity: 0.42,
                motion_speed: 1.05,
                particle_count: 9999,
            },
        ];

        for settings in cases {
            let decoded = decode(&encode(&settings)).unwrap();
            assert_eq!(decoded.algorithm, settings.algorithm);
            assert_eq!(decoded.palette, settings.palette);
            assert!((decoded.sensitivity - settings.sensitivity).abs() <= step(SENSITIVITY_BOUNDS));
            assert!(
                (decoded.color_intensity - settings.color_intensity).abs()
                    <= step(COLOR_INTENSITY_BOUNDS)
            );
            assert!(
                (decoded.motion_speed - settings.motion_speed).abs() <= step(MOTION_SPEED_BOUNDS)
            );
            let count_error = (decoded.particle_count as f32 - settings.particle_count as f32).abs();
            assert!(count_error <= step(PARTICLE_COUNT_BOUNDS));
        }
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert!(matches!(
            decode("0000"),
            Err(PresetError::BadLength { found: 4, .. })
        ));
        assert!(matches!(
            decode("0000000000000"),
            Err(PresetError::BadLength { found: 13, .. })
        ));
        assert!(matches!(decode(""), Err(PresetError::BadLength { .. })));
    }

    #[test]
    fn test_invalid_character_is_rejected() {
        assert!(matches!(
            decode("00!000000000"),
            Err(PresetError::BadCharacter('!'))
        ));
        assert!(matches!(
            decode("0000000000é0"),
            Err(PresetError::BadCharacter('é'))
        ));
    }

    #[test]
    fn test_unknown_algorithm_index_falls_back_to_default() {
        let mut code = encode(&VisualSettings {
            algorithm: Algorithm::Klein,
            ..VisualSettings::default()
        });
        // Overwrite the algorithm field with index 61, outside the vocabulary.
        code.replace_range(0..2, "0z");

        let decoded = decode(&code).unwrap();
        assert_eq!(decoded.algorithm, Algorithm::Particles);
    }

    #[test]
    fn test_oversized_numeric_field_clamps() {
        let mut code = encode(&VisualSettings::default());
        // "zz" decodes to 3843, far beyond the top quantization step.
        code.replace_range(4..6, "zz");

        let decoded = decode(&code).unwrap();
        assert_eq!(decoded.sensitivity, SENSITIVITY_BOUNDS.1);
    }

    #[test]
    fn test_out_of_range_settings_clamp_on_encode() {
        let settings = VisualSettings {
            sensitivity: 50.0,
            particle_count: 1_000_000,
            ..VisualSettings::default()
        };

        let decoded = decode(&encode(&settings)).unwrap();
        assert_eq!(decoded.sensitivity, SENSITIVITY_BOUNDS.1);
        assert_eq!(decoded.particle_count, PARTICLE_COUNT_BOUNDS.1 as u32);
    }
}
