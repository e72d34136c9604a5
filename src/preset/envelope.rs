use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::genre::GENRE_COUNT;
use crate::genre::PROJECTION_LEN;

use super::{PresetError, VisualSettings};

/// Version written by [`export`].
pub const CURRENT_VERSION: &str = "3.0";

/// Versions accepted without a warning.
const KNOWN_VERSIONS: [&str; 3] = ["3.0", "2.0", "1.0"];

#[derive(Serialize)]
struct Envelope<'a> {
    settings: &'a VisualSettings,
    timestamp: u64,
    version: &'static str,
    metadata: Metadata,
}

#[derive(Serialize)]
struct Metadata {
    feature_count: usize,
    genre_count: usize,
    model: &'static str,
}

#[derive(Deserialize)]
struct RawEnvelope {
    settings: Option<VisualSettings>,
    version: Option<String>,
}

/// Exports settings as a self-describing base64 JSON envelope.
pub fn export(settings: &VisualSettings) -> Result<String, PresetError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0);

    let envelope = Envelope {
        settings,
        timestamp,
        version: CURRENT_VERSION,
        metadata: Metadata {
            feature_count: PROJECTION_LEN,
            genre_count: GENRE_COUNT,
            model: "advanced",
        },
    };

    let json = serde_json::to_string(&envelope)?;
    Ok(BASE64.encode(json.as_bytes()))
}

/// Imports a base64 JSON envelope.
///
/// `settings` and `version` are required. An unknown version is logged and
/// imported anyway so older exports keep working; numeric settings are
/// clamped into their bounds.
pub fn import(encoded: &str) -> Result<VisualSettings, PresetError> {
    let bytes = BASE64.decode(encoded.trim())?;
    let json = String::from_utf8(bytes)?;
    let envelope: RawEnvelope = serde_json::from_str(&json)?;

    let version = envelope
        .version
        .ok_or(PresetError::MissingField("version"))?;
    let settings = envelope
        .settings
        .ok_or(PresetError::MissingField("settings"))?;

    if !KNOWN_VERSIONS.contains(&version.as_str()) {
        warn!("unknown preset version {version:?}, importing anyway");
    }

    Ok(settings.clamped())
}
