use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use resona::audio::decode::decode_file;
use resona::audio::SpectrumAnalyser;
use resona::genre::Genre;
use resona::{Engine, EngineConfig, FrameInput, FrameOutput};

#[derive(Parser)]
#[command(name = "resona-analyzer")]
#[command(about = "Runs an audio file through the full analysis pipeline and writes a JSON report")]
struct Args {
    /// Audio file to analyze (WAV, MP3, OGG, M4A)
    audio_file: PathBuf,

    /// Report destination; stdout when omitted
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// TOML engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// FFT window size override
    #[arg(long)]
    fft_size: Option<usize>,

    /// Genre scoring model weight file override
    #[arg(long)]
    model: Option<PathBuf>,

    /// Simulated frame cadence in frames per second
    #[arg(long, default_value = "60.0")]
    frame_rate: f64,
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    file: FileInfo,
    beats: BeatSummary,
    genre_timeline: Vec<GenreSegment>,
    features: BTreeMap<&'static str, FeatureStats>,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    filename: String,
    duration_secs: f64,
    sample_rate: u32,
    total_frames: usize,
    frame_rate: f64,
}

#[derive(Debug, Serialize)]
struct BeatSummary {
    total_beats: usize,
    final_bpm: f32,
    events: Vec<BeatRecord>,
}

#[derive(Debug, Serialize)]
struct BeatRecord {
    time_secs: f64,
    strength: f32,
    bpm: f32,
}

/// One entry per detected genre change.
#[derive(Debug, Serialize)]
struct GenreSegment {
    time_secs: f64,
    genre: Genre,
    confidence: f32,
}

#[derive(Debug, Serialize)]
struct FeatureStats {
    min: f32,
    mean: f32,
    max: f32,
}

#[derive(Default)]
struct StatCollector {
    min: f32,
    max: f32,
    sum: f64,
    count: usize,
}

impl StatCollector {
    fn push(&mut self, value: f32) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value as f64;
        self.count += 1;
    }

    fn finish(&self) -> FeatureStats {
        FeatureStats {
            min: self.min,
            mean: if self.count == 0 {
                0.0
            } else {
                (self.sum / self.count as f64) as f32
            },
            max: self.max,
        }
    }
}

struct ReportBuilder {
    beats: Vec<BeatRecord>,
    timeline: Vec<GenreSegment>,
    stats: BTreeMap<&'static str, StatCollector>,
}

impl ReportBuilder {
    fn new() -> Self {
        Self {
            beats: Vec::new(),
            timeline: Vec::new(),
            stats: BTreeMap::new(),
        }
    }

    fn record(&mut self, output: &FrameOutput, now: f64) {
        if output.beat.is_beat {
            self.beats.push(BeatRecord {
                time_secs: now,
                strength: output.beat.strength,
                bpm: output.beat.bpm,
            });
        }

        if let Some(prediction) = &output.prediction {
            let changed = self
                .timeline
                .last()
                .map_or(true, |segment| segment.genre != prediction.genre);
            if changed {
                self.timeline.push(GenreSegment {
                    time_secs: now,
                    genre: prediction.genre,
                    confidence: prediction.confidence,
                });
            }
        }

        let features = &output.features;
        for (name, value) in [
            ("spectral_centroid", features.spectral_centroid),
            ("spectral_rolloff", features.spectral_rolloff),
            ("spectral_flux", features.spectral_flux),
            ("energy", features.energy),
            ("zero_crossing_rate", features.zero_crossing_rate),
            ("rms", features.rms),
            ("brightness", features.brightness),
            ("roughness", features.roughness),
            ("harmonicity", features.harmonicity),
            ("onset_strength", output.onset_strength),
        ] {
            self.stats.entry(name).or_default().push(value);
        }
    }

    fn finish(self, file: FileInfo, final_bpm: f32) -> AnalysisReport {
        AnalysisReport {
            file,
            beats: BeatSummary {
                total_beats: self.beats.len(),
                final_bpm,
                events: self.beats,
            },
            genre_timeline: self.timeline,
            features: self
                .stats
                .iter()
                .map(|(&name, collector)| (name, collector.finish()))
                .collect(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(fft_size) = args.fft_size {
        config.analysis.fft_size = fft_size;
    }
    if let Some(model) = &args.model {
        config.classifier.model_path = Some(model.clone());
    }

    let audio = decode_file(&args.audio_file)?;
    config.analysis.sample_rate = audio.sample_rate as f32;

    let samples_per_frame = (audio.sample_rate as f64 / args.frame_rate).round() as usize;
    let total_frames = audio.samples.len() / samples_per_frame.max(1);
    info!(
        "analyzing {} frames at {:.0} fps ({} samples each)",
        total_frames, args.frame_rate, samples_per_frame
    );

    let mut analyser = SpectrumAnalyser::new(config.analysis.fft_size);
    let mut engine = Engine::new(config);
    let mut builder = ReportBuilder::new();

    for (index, chunk) in audio.samples.chunks(samples_per_frame.max(1)).enumerate() {
        analyser.feed(chunk);
        let frame = analyser.process();
        let now = index as f64 / args.frame_rate;

        let output = engine.update(
            FrameInput {
                spectrum: &frame.spectrum,
                time_domain: &frame.time_domain,
            },
            now,
        );
        builder.record(&output, now);

        if (index + 1) % 1000 == 0 {
            info!(
                "processed {} frames ({:.1}s of {:.1}s)",
                index + 1,
                now,
                audio.duration_secs()
            );
        }
    }

    let final_bpm = engine.bpm();
    let report = builder.finish(
        FileInfo {
            filename: args.audio_file.display().to_string(),
            duration_secs: audio.duration_secs(),
            sample_rate: audio.sample_rate,
            total_frames,
            frame_rate: args.frame_rate,
        },
        final_bpm,
    );

    info!(
        "analysis complete: {} beats, {:.1} bpm, {} genre segment(s)",
        report.beats.total_beats,
        final_bpm,
        report.genre_timeline.len()
    );
    if let Some(segment) = report.genre_timeline.last() {
        info!(
            "final genre: {} (confidence {:.2})",
            segment.genre, segment.confidence
        );
    }

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    match &args.output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
