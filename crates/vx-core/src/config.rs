use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Complete runtime configuration.
///
/// Serialisable to TOML. Every field has a sane default.
///
/// # Example
/// ```
/// use vx_core::config::VoxConfig;
/// let config = VoxConfig::default();
/// assert_eq!(config.audio.sample_rate, 16_000);
/// assert_eq!(config.training.retrain_every, 100);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VoxConfig {
    pub audio: AudioConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
}

/// Audio normalisation settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AudioConfig {
    /// Canonical analysis sample rate in Hz.
    pub sample_rate: u32,
    /// External transcoder used when symphonia cannot decode the input.
    pub ffmpeg_path: PathBuf,
}

/// STFT and pitch-tracking settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FeatureConfig {
    /// FFT window length in samples. Rounded up to a power of two.
    pub n_fft: usize,
    /// Hop between consecutive frames in samples.
    pub hop_length: usize,
    /// Lower bound of the voice pitch band (Hz).
    pub pitch_min_hz: f32,
    /// Upper bound of the voice pitch band (Hz).
    pub pitch_max_hz: f32,
}

/// Training log, model persistence and retraining settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TrainingConfig {
    /// Append-only JSON-Lines training log.
    pub store_path: PathBuf,
    /// Serialized model bundle, replaced wholesale on each retrain.
    pub model_path: PathBuf,
    /// A background retrain is triggered every time the sample count reaches a multiple of this.
    pub retrain_every: u64,
    /// Minimum number of stored samples required to retrain.
    pub min_samples: usize,
    /// Share of samples held out for validation [0.05, 0.5].
    pub validation_fraction: f64,
    /// Shuffle seed for the train/validation split.
    pub seed: u64,
    /// Gradient-descent epochs.
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on classifier weights.
    pub l2: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            pitch_min_hz: 75.0,
            pitch_max_hz: 400.0,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/training_samples.jsonl"),
            model_path: PathBuf::from("data/emotion_model.bin"),
            retrain_every: 100,
            min_samples: 50,
            validation_fraction: 0.2,
            seed: 42,
            epochs: 400,
            learning_rate: 0.5,
            l2: 1e-3,
        }
    }
}

impl VoxConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.audio.sample_rate = self.audio.sample_rate.clamp(8_000, 48_000);

        self.features.n_fft = self.features.n_fft.clamp(256, 8192).next_power_of_two();
        self.features.hop_length = self.features.hop_length.clamp(64, self.features.n_fft);
        self.features.pitch_min_hz = self.features.pitch_min_hz.clamp(40.0, 300.0);
        self.features.pitch_max_hz = self
            .features
            .pitch_max_hz
            .clamp(self.features.pitch_min_hz + 10.0, 1000.0);

        self.training.retrain_every = self.training.retrain_every.max(1);
        self.training.min_samples = self.training.min_samples.max(2);
        self.training.validation_fraction = self.training.validation_fraction.clamp(0.05, 0.5);
        self.training.epochs = self.training.epochs.clamp(1, 100_000);
        self.training.learning_rate = self.training.learning_rate.clamp(1e-5, 10.0);
        self.training.l2 = self.training.l2.clamp(0.0, 10.0);
    }
}

/// Intermediate TOML structure, every section optional.
#[derive(Deserialize)]
struct ConfigFile {
    audio: Option<AudioSection>,
    features: Option<FeatureSection>,
    training: Option<TrainingSection>,
}

#[derive(Deserialize)]
struct AudioSection {
    sample_rate: Option<u32>,
    ffmpeg_path: Option<PathBuf>,
}

#[derive(Deserialize)]
struct FeatureSection {
    n_fft: Option<usize>,
    hop_length: Option<usize>,
    pitch_min_hz: Option<f32>,
    pitch_max_hz: Option<f32>,
}

#[derive(Deserialize)]
struct TrainingSection {
    store_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    retrain_every: Option<u64>,
    min_samples: Option<usize>,
    validation_fraction: Option<f64>,
    seed: Option<u64>,
    epochs: Option<usize>,
    learning_rate: Option<f64>,
    l2: Option<f64>,
}

/// Load a TOML file and merge it over the defaults.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use vx_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/voxaffect.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<VoxConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    parse_config(&content).with_context(|| format!("TOML parse error in {}", path.display()))
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
pub fn parse_config(content: &str) -> Result<VoxConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = VoxConfig::default();

    if let Some(a) = file.audio {
        if let Some(v) = a.sample_rate {
            config.audio.sample_rate = v;
        }
        if let Some(v) = a.ffmpeg_path {
            config.audio.ffmpeg_path = v;
        }
    }

    if let Some(f) = file.features {
        if let Some(v) = f.n_fft {
            config.features.n_fft = v;
        }
        if let Some(v) = f.hop_length {
            config.features.hop_length = v;
        }
        if let Some(v) = f.pitch_min_hz {
            config.features.pitch_min_hz = v;
        }
        if let Some(v) = f.pitch_max_hz {
            config.features.pitch_max_hz = v;
        }
    }

    if let Some(t) = file.training {
        if let Some(v) = t.store_path {
            config.training.store_path = v;
        }
        if let Some(v) = t.model_path {
            config.training.model_path = v;
        }
        if let Some(v) = t.retrain_every {
            config.training.retrain_every = v;
        }
        if let Some(v) = t.min_samples {
            config.training.min_samples = v;
        }
        if let Some(v) = t.validation_fraction {
            config.training.validation_fraction = v;
        }
        if let Some(v) = t.seed {
            config.training.seed = v;
        }
        if let Some(v) = t.epochs {
            config.training.epochs = v;
        }
        if let Some(v) = t.learning_rate {
            config.training.learning_rate = v;
        }
        if let Some(v) = t.l2 {
            config.training.l2 = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults.
///
/// # Errors
/// Returns an error only if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<VoxConfig> {
    if path.exists() {
        load_config(path)
    } else {
        log::warn!("Config not found: {}. Using defaults.", path.display());
        Ok(VoxConfig::default())
    }
}
