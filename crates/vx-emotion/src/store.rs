use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use vx_core::sample::TrainingSample;

use crate::error::StoreError;

struct StoreState {
    file: File,
    count: u64,
    /// The last append failed midway and left an unterminated fragment.
    torn: bool,
}

/// Append-only JSON-Lines training log.
///
/// Appends are serialised by a mutex, and each append returns the new
/// total, so every total is observed by exactly one caller.
pub struct TrainingStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl TrainingStore {
    /// Open (creating if needed) the log at `path` and count its entries.
    ///
    /// A trailing fragment left by an interrupted append is terminated so
    /// the next record starts on its own line.
    ///
    /// # Errors
    /// Fails if the file or its parent directory cannot be created or read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                log::warn!("Terminating torn last line in {}", path.display());
                file.write_all(b"\n")?;
                file.flush()?;
            }
        }

        let mut count = 0u64;
        for line in BufReader::new(File::open(&path)?).lines() {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        log::info!("Training log {} holds {count} samples", path.display());

        Ok(Self {
            path,
            state: Mutex::new(StoreState {
                file,
                count,
                torn: false,
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one sample and return the new total.
    ///
    /// # Errors
    /// Fails on serialisation or write errors; the count is unchanged then.
    pub fn record(&self, sample: &TrainingSample) -> Result<u64, StoreError> {
        let mut line = serde_json::to_string(sample)?;
        line.push('\n');

        let mut state = self.lock();
        if state.torn {
            line.insert(0, '\n');
        }
        let written = state.file.write_all(line.as_bytes());
        if let Err(e) = written.and_then(|()| state.file.flush()) {
            state.torn = true;
            return Err(e.into());
        }
        state.torn = false;
        state.count += 1;
        Ok(state.count)
    }

    /// Number of entries, including any that fail to parse.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.lock().count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read every parseable sample. Corrupt lines are logged and skipped.
    ///
    /// Only the bytes present when the call starts are read, so appends are
    /// not blocked while the log is parsed.
    ///
    /// # Errors
    /// Fails only if the file cannot be read.
    pub fn load_all(&self) -> Result<Vec<TrainingSample>, StoreError> {
        let snapshot = self.lock().file.metadata()?.len();
        let reader = BufReader::new(File::open(&self.path)?.take(snapshot));

        let mut samples = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TrainingSample>(&line) {
                Ok(sample) => samples.push(sample),
                Err(e) => log::warn!(
                    "Skipping corrupt line {} in {}: {e}",
                    number + 1,
                    self.path.display()
                ),
            }
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vx_core::emotion::{Emotion, EmotionDistribution};
    use vx_core::features::FeatureVector;

    fn sample(label: Emotion) -> TrainingSample {
        let emotions = EmotionDistribution::from_weights(&[(label, 1.0)]).expect("weights");
        TrainingSample::new(FeatureVector::zeros(), emotions, 2.0)
    }

    #[test]
    fn record_returns_running_total_and_reopen_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("log.jsonl");
        let store = TrainingStore::open(&path).expect("open");
        assert!(store.is_empty());
        assert_eq!(store.record(&sample(Emotion::Anger)).expect("record"), 1);
        assert_eq!(store.record(&sample(Emotion::Fear)).expect("record"), 2);
        drop(store);

        let reopened = TrainingStore::open(&path).expect("reopen");
        assert_eq!(reopened.len(), 2);
        let samples = reopened.load_all().expect("load");
        assert_eq!(samples[1].label(), Some(Emotion::Fear));
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("log.jsonl");
        let good = serde_json::to_string(&sample(Emotion::Sadness)).expect("json");
        fs::write(&path, format!("{good}\n{{not json\n\n{good}\n")).expect("write");

        let store = TrainingStore::open(&path).expect("open");
        assert_eq!(store.len(), 3);
        assert_eq!(store.load_all().expect("load").len(), 2);
    }

    #[test]
    fn concurrent_appends_get_unique_totals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(TrainingStore::open(dir.path().join("log.jsonl")).expect("open"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| store.record(&sample(Emotion::Neutral)).expect("record"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut totals: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("join"))
            .collect();
        totals.sort_unstable();
        assert_eq!(totals, (1..=200).collect::<Vec<_>>());
        assert_eq!(store.load_all().expect("load").len(), 200);
    }

    #[test]
    fn torn_tail_does_not_swallow_next_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("log.jsonl");
        let good = serde_json::to_string(&sample(Emotion::Sadness)).expect("json");
        fs::write(&path, format!("{good}\n{}", &good[..20])).expect("write");

        let store = TrainingStore::open(&path).expect("open");
        assert_eq!(store.len(), 2);
        assert_eq!(store.record(&sample(Emotion::Anger)).expect("record"), 3);

        let samples = store.load_all().expect("load");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].label(), Some(Emotion::Anger));
    }

    #[test]
    fn reads_alongside_appends_see_whole_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(TrainingStore::open(dir.path().join("log.jsonl")).expect("open"));

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    store.record(&sample(Emotion::Fear)).expect("record");
                }
            })
        };
        let mut seen = 0;
        while !writer.is_finished() {
            let loaded = store.load_all().expect("load").len();
            assert!(loaded >= seen);
            assert!(loaded as u64 <= store.len());
            seen = loaded;
        }
        writer.join().expect("join");
        assert_eq!(store.load_all().expect("load").len(), 100);
    }
}
