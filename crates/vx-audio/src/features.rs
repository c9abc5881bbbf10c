use std::fmt;

use vx_core::config::FeatureConfig;
use vx_core::features::{FeatureVector, N_MFCC, index};

use crate::error::FeatureError;
use crate::fft::Spectrogram;
use crate::mel::{MelFilterbank, N_MELS, mel_db_frames, mfcc_stats};
use crate::pitch::PitchTracker;
use crate::signal::CanonicalSignal;
use crate::spectral::{centroid_rolloff, chroma_stats, contrast_stats, energy_stats, zcr_stats};
use crate::stats::skew_kurtosis;
use crate::tempo::{estimate_tempo, onset_envelope};

/// Independently computed slice of the feature vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureGroup {
    Pitch,
    Energy,
    Zcr,
    Spectral,
    Tempo,
    Contrast,
    Chroma,
    Mfcc,
    Moments,
}

impl FeatureGroup {
    /// Extraction order, which is also vector order.
    pub const ALL: [Self; 9] = [
        Self::Pitch,
        Self::Energy,
        Self::Zcr,
        Self::Spectral,
        Self::Tempo,
        Self::Contrast,
        Self::Chroma,
        Self::Mfcc,
        Self::Moments,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Pitch => "pitch",
            Self::Energy => "energy",
            Self::Zcr => "zcr",
            Self::Spectral => "spectral",
            Self::Tempo => "tempo",
            Self::Contrast => "contrast",
            Self::Chroma => "chroma",
            Self::Mfcc => "mfcc",
            Self::Moments => "moments",
        }
    }

    /// First vector slot owned by this group.
    #[must_use]
    pub fn start(self) -> usize {
        match self {
            Self::Pitch => index::PITCH_MEAN,
            Self::Energy => index::ENERGY_MEAN,
            Self::Zcr => index::ZCR_MEAN,
            Self::Spectral => index::CENTROID_MEAN,
            Self::Tempo => index::TEMPO,
            Self::Contrast => index::CONTRAST_MEAN,
            Self::Chroma => index::CHROMA_MEAN,
            Self::Mfcc => index::MFCC_START,
            Self::Moments => index::SKEWNESS,
        }
    }

    /// Values substituted when the group cannot be computed.
    #[must_use]
    pub fn defaults(self) -> Vec<f32> {
        match self {
            Self::Pitch => vec![150.0, 20.0],
            Self::Energy | Self::Zcr => vec![0.05, 0.01],
            Self::Spectral => vec![2000.0, 1000.0, 3000.0],
            Self::Tempo => vec![120.0],
            Self::Contrast => vec![0.5, 0.2],
            Self::Chroma => vec![0.5, 0.1],
            Self::Mfcc => vec![0.0; 2 * N_MFCC],
            Self::Moments => vec![0.0, 0.0],
        }
    }
}

impl fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a group was measured or fell back to its defaults.
#[derive(Clone, Debug, PartialEq)]
pub enum GroupOutcome {
    Computed,
    Defaulted { reason: FeatureError },
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupReport {
    pub group: FeatureGroup,
    pub outcome: GroupOutcome,
}

/// Result of one extraction: the vector plus how each group was filled.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub vector: FeatureVector,
    pub groups: Vec<GroupReport>,
}

impl Extraction {
    /// Groups that fell back to their defaults.
    pub fn defaulted(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups
            .iter()
            .filter(|r| matches!(r.outcome, GroupOutcome::Defaulted { .. }))
    }

    #[must_use]
    pub fn outcome(&self, group: FeatureGroup) -> Option<&GroupOutcome> {
        self.groups
            .iter()
            .find(|r| r.group == group)
            .map(|r| &r.outcome)
    }
}

/// Turns a [`CanonicalSignal`] into a fixed-length [`FeatureVector`].
///
/// Never fails: every group that cannot be computed is replaced by its
/// defaults and reported in [`Extraction::groups`].
///
/// # Example
/// ```
/// use vx_audio::features::FeatureExtractor;
/// use vx_audio::signal::CanonicalSignal;
/// use vx_core::config::FeatureConfig;
/// use vx_core::features::FEATURE_DIM;
///
/// let extractor = FeatureExtractor::new(&FeatureConfig::default(), 16_000);
/// let extraction = extractor.extract(&CanonicalSignal::new(Vec::new(), 16_000));
/// assert_eq!(extraction.vector.as_slice().len(), FEATURE_DIM);
/// assert_eq!(extraction.defaulted().count(), 9);
/// ```
pub struct FeatureExtractor {
    n_fft: usize,
    hop: usize,
    sample_rate: u32,
    pitch: PitchTracker,
    mel: MelFilterbank,
}

impl FeatureExtractor {
    #[must_use]
    pub fn new(config: &FeatureConfig, sample_rate: u32) -> Self {
        Self {
            n_fft: config.n_fft,
            hop: config.hop_length,
            sample_rate,
            pitch: PitchTracker::new(sample_rate, config.pitch_min_hz, config.pitch_max_hz),
            mel: MelFilterbank::new(sample_rate, config.n_fft, N_MELS),
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn extract(&self, signal: &CanonicalSignal) -> Extraction {
        let samples = signal.samples();
        let spec = Spectrogram::compute(samples, self.sample_rate, self.n_fft, self.hop);
        let mel_db = mel_db_frames(&spec, &self.mel);

        let mut vector = FeatureVector::zeros();
        let mut groups = Vec::with_capacity(FeatureGroup::ALL.len());

        for group in FeatureGroup::ALL {
            let computed = match group {
                FeatureGroup::Pitch => self.pitch.pitch_stats(samples).map(pair),
                FeatureGroup::Energy => energy_stats(samples, self.n_fft, self.hop).map(pair),
                FeatureGroup::Zcr => zcr_stats(samples, self.n_fft, self.hop).map(pair),
                FeatureGroup::Spectral => centroid_rolloff(&spec).map(|(c, s, r)| vec![c, s, r]),
                FeatureGroup::Tempo => {
                    estimate_tempo(&onset_envelope(&mel_db), spec.frame_rate()).map(|t| vec![t])
                }
                FeatureGroup::Contrast => contrast_stats(&spec).map(pair),
                FeatureGroup::Chroma => chroma_stats(&spec).map(pair),
                FeatureGroup::Mfcc => mfcc_stats(&mel_db, N_MFCC),
                FeatureGroup::Moments => skew_kurtosis(samples).map(pair),
            };

            let (values, outcome) = match computed {
                Ok(values) => (values, GroupOutcome::Computed),
                Err(reason) => {
                    log::debug!("Feature group {group} defaulted: {reason}");
                    (group.defaults(), GroupOutcome::Defaulted { reason })
                }
            };
            for (offset, value) in values.into_iter().enumerate() {
                vector.set(group.start() + offset, value);
            }
            groups.push(GroupReport { group, outcome });
        }

        Extraction { vector, groups }
    }
}

fn pair((a, b): (f32, f32)) -> Vec<f32> {
    vec![a, b]
}
