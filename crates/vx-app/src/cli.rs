use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// voxaffect: speech emotion inference from short voice recordings.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file. Defaults are used when it does not exist.
    #[arg(short, long, global = true, default_value = "config/voxaffect.toml")]
    pub config: PathBuf,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse a recording and print the result as JSON.
    Analyze {
        /// Audio file (WAV, MP3, FLAC, OGG, M4A; anything else through ffmpeg).
        file: PathBuf,

        /// Declared clip duration in seconds; measured when absent or not positive.
        #[arg(long)]
        duration: Option<f64>,

        /// Also append the result to the training log.
        #[arg(long, default_value_t = false)]
        record: bool,
    },

    /// Append a training sample from JSON arguments.
    Record {
        /// Feature vector as a JSON array of 42 numbers.
        #[arg(long)]
        features: String,

        /// Emotion weights as a JSON object, e.g. '{"sadness": 70, "neutral": 30}'.
        #[arg(long)]
        emotions: String,

        /// Clip duration in seconds.
        #[arg(long, default_value_t = 0.0)]
        duration: f64,
    },

    /// Print training-log statistics as JSON.
    Stats,

    /// Retrain the model now and print the result as JSON.
    Retrain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "voxaffect",
            "analyze",
            "clip.wav",
            "--duration",
            "2.5",
            "--record",
            "--log-level",
            "debug",
        ])
        .expect("parse");
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Analyze {
                file,
                duration,
                record,
            } => {
                assert_eq!(file, PathBuf::from("clip.wav"));
                assert_eq!(duration, Some(2.5));
                assert!(record);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::try_parse_from(["voxaffect", "stats"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from("config/voxaffect.toml"));
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn record_requires_features() {
        assert!(Cli::try_parse_from(["voxaffect", "record", "--emotions", "{}"]).is_err());
    }
}
