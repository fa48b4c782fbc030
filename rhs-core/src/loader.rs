//! Loading of one-file-per-channel recording directories.
//!
//! A recording directory holds one header file, one `time.dat` file of raw
//! int32 sample ticks, and one file per channel. Every file is memory-mapped
//! read-only and converted to calibrated `f64` samples.

use crate::error::{Result, RhsError};
use crate::scaling::DataFileKind;
use crate::types::{Header, RecordingSet};
use byteorder::{ByteOrder, LittleEndian};
use glob::Pattern;
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Progress callbacks for a load.
///
/// All methods default to no-ops. With the `parallel` feature enabled,
/// `data_file_loaded` may be called from worker threads in any order.
pub trait LoadObserver: Sync {
    fn header_decoded(&self, _header: &Header) {}

    fn data_files_found(&self, _count: usize) {}

    fn data_file_loaded(&self, _stem: &str, _samples: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {}

/// File selection settings for [`RecordingLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Glob for data files, matched against file names
    pub pattern: String,
    pub header_pattern: String,
    pub timestamp_pattern: String,
    /// Scale data files on a rayon pool (requires the `parallel` feature)
    pub parallel: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            pattern: "*.dat".to_string(),
            header_pattern: "*.rhs".to_string(),
            timestamp_pattern: "time.dat".to_string(),
            parallel: false,
        }
    }
}

impl LoadOptions {
    pub fn with_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_header_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.header_pattern = pattern.into();
        self
    }

    pub fn with_timestamp_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.timestamp_pattern = pattern.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Loads recording directories into [`RecordingSet`]s.
#[derive(Debug, Clone, Default)]
pub struct RecordingLoader {
    options: LoadOptions,
}

impl RecordingLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Loads `dir` without progress reporting.
    pub fn load<P: AsRef<Path>>(&self, dir: P) -> Result<RecordingSet> {
        self.load_with_observer(dir, &NoopObserver)
    }

    /// Loads `dir`, reporting progress to `observer`.
    ///
    /// The header is decoded first because timestamp and stimulation scaling
    /// depend on it. Any failure aborts the whole load.
    pub fn load_with_observer<P: AsRef<Path>>(
        &self,
        dir: P,
        observer: &dyn LoadObserver,
    ) -> Result<RecordingSet> {
        let dir = dir.as_ref();
        let data_pattern = Pattern::new(&self.options.pattern)?;
        let header_pattern = Pattern::new(&self.options.header_pattern)?;
        let timestamp_pattern = Pattern::new(&self.options.timestamp_pattern)?;

        let entries = list_files(dir)?;

        let header_path = match select_unique(&entries, &header_pattern) {
            Selection::One(path) => path,
            Selection::None => {
                return Err(RhsError::HeaderNotFound {
                    dir: dir.to_path_buf(),
                    pattern: self.options.header_pattern.clone(),
                })
            }
            Selection::Many(candidates) => {
                return Err(RhsError::AmbiguousHeader {
                    dir: dir.to_path_buf(),
                    candidates,
                })
            }
        };
        debug!(path = %header_path.display(), "Decoding header");
        let header = Header::read_file(&header_path)?;
        observer.header_decoded(&header);

        let timestamp_path = match select_unique(&entries, &timestamp_pattern) {
            Selection::One(path) => path,
            Selection::None => {
                return Err(RhsError::TimestampsNotFound {
                    dir: dir.to_path_buf(),
                    pattern: self.options.timestamp_pattern.clone(),
                })
            }
            Selection::Many(candidates) => {
                return Err(RhsError::AmbiguousTimestamps {
                    dir: dir.to_path_buf(),
                    candidates,
                })
            }
        };
        let timestamps = read_timestamps(
            &timestamp_path,
            header.frequency_parameters.amplifier_sample_rate,
        )?;
        debug!(samples = timestamps.len(), "Read timestamps");

        let data_files: Vec<&PathBuf> = entries
            .iter()
            .filter(|p| *p != &timestamp_path && *p != &header_path)
            .filter(|p| matches_name(&data_pattern, p))
            .collect();
        debug!(count = data_files.len(), pattern = %self.options.pattern, "Selected data files");
        observer.data_files_found(data_files.len());

        let stim_step_size = header.stim.stim_step_size;
        let load_one = |path: &PathBuf| -> Result<(String, Vec<f64>)> {
            let (stem, samples) = read_data_file(path, stim_step_size)?;
            observer.data_file_loaded(&stem, samples.len());
            Ok((stem, samples))
        };

        let recordings: BTreeMap<String, Vec<f64>> = if self.options.parallel {
            load_parallel(&data_files, &load_one)?
        } else {
            data_files
                .iter()
                .map(|p| load_one(*p))
                .collect::<Result<_>>()?
        };

        Ok(RecordingSet {
            header,
            timestamps,
            recordings,
        })
    }
}

/// Loads `dir` with default options and the given data-file pattern.
pub fn load_recording<P: AsRef<Path>>(dir: P, pattern: &str) -> Result<RecordingSet> {
    RecordingLoader::new(LoadOptions::default().with_pattern(pattern)).load(dir)
}

#[cfg(feature = "parallel")]
fn load_parallel<F>(files: &[&PathBuf], load_one: &F) -> Result<BTreeMap<String, Vec<f64>>>
where
    F: Fn(&PathBuf) -> Result<(String, Vec<f64>)> + Sync,
{
    use rayon::prelude::*;

    files.par_iter().map(|p| load_one(*p)).collect()
}

#[cfg(not(feature = "parallel"))]
fn load_parallel<F>(files: &[&PathBuf], load_one: &F) -> Result<BTreeMap<String, Vec<f64>>>
where
    F: Fn(&PathBuf) -> Result<(String, Vec<f64>)> + Sync,
{
    files.iter().map(|p| load_one(*p)).collect()
}

enum Selection {
    None,
    One(PathBuf),
    Many(Vec<PathBuf>),
}

fn select_unique(entries: &[PathBuf], pattern: &Pattern) -> Selection {
    let mut matches: Vec<PathBuf> = entries
        .iter()
        .filter(|p| matches_name(pattern, p))
        .cloned()
        .collect();
    match matches.len() {
        0 => Selection::None,
        1 => Selection::One(matches.remove(0)),
        _ => Selection::Many(matches),
    }
}

fn matches_name(pattern: &Pattern, path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| pattern.matches(n))
        .unwrap_or(false)
}

/// Regular files directly inside `dir`, sorted by path.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| RhsError::io(dir, e))? {
        let entry = entry.map_err(|e| RhsError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    trace!(count = files.len(), dir = %dir.display(), "Listed directory");
    Ok(files)
}

/// Memory-maps `path` read-only. Empty files yield `None`.
fn map_file(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path).map_err(|e| RhsError::io(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| RhsError::io(path, e))?
        .len();
    if len == 0 {
        return Ok(None);
    }
    // SAFETY: the map is only read, and recording files are not modified
    // while a load is in progress.
    let map = unsafe { Mmap::map(&file) }.map_err(|e| RhsError::io(path, e))?;
    Ok(Some(map))
}

fn check_whole_samples(path: &Path, len: usize, width: usize) -> Result<()> {
    if len % width != 0 {
        return Err(RhsError::PartialSample {
            path: path.to_path_buf(),
            len,
            width,
        });
    }
    Ok(())
}

/// Reads int32 ticks and converts them to seconds.
fn read_timestamps(path: &Path, sample_rate: f32) -> Result<Vec<f64>> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(RhsError::InvalidSampleRate(sample_rate));
    }
    let Some(map) = map_file(path)? else {
        return Ok(Vec::new());
    };
    check_whole_samples(path, map.len(), 4)?;

    let mut ticks = vec![0i32; map.len() / 4];
    LittleEndian::read_i32_into(&map, &mut ticks);
    let rate = f64::from(sample_rate);
    Ok(ticks.into_iter().map(|t| f64::from(t) / rate).collect())
}

/// Classifies, maps and scales one data file, keyed by its stem.
fn read_data_file(path: &Path, stim_step_size: f32) -> Result<(String, Vec<f64>)> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let kind = DataFileKind::classify(name).ok_or_else(|| RhsError::UnclassifiedDataFile {
        path: path.to_path_buf(),
    })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let samples = match map_file(path)? {
        Some(map) => {
            check_whole_samples(path, map.len(), kind.sample_width())?;
            kind.scale(&map, stim_step_size)
        }
        None => Vec::new(),
    };
    trace!(file = %name, ?kind, samples = samples.len(), "Scaled data file");
    Ok((stem, samples))
}
