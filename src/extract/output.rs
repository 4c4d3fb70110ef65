//! Destinations of extracted records
//!
//! A single-output run shares one [`OutputPair`] behind one mutex. A
//! demultiplexed run keeps a map from query key to its own mutex-guarded pair;
//! the map-level lock is only taken for writing when a new key shows up.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::buffer::RecordPair;
use crate::{
    error::{Result, WriteError},
    file::naming,
    FileFormat, SequenceWriter,
};

/// One output file, plus its mate in paired mode
pub struct OutputPair {
    first: SequenceWriter,
    second: Option<SequenceWriter>,
}
impl OutputPair {
    /// Creates `path`, or its `_R1` / `_R2` variants when `paired`
    pub fn create(path: &Path, format: FileFormat, paired: bool) -> Result<Self> {
        if paired {
            let (first, second) = naming::mate_paths(path);
            Ok(Self {
                first: SequenceWriter::create(first, format)?,
                second: Some(SequenceWriter::create(second, format)?),
            })
        } else {
            Ok(Self {
                first: SequenceWriter::create(path, format)?,
                second: None,
            })
        }
    }

    pub fn write_batch(&mut self, batch: &[RecordPair]) -> Result<()> {
        for (first, second) in batch {
            self.first.write(first)?;
            if let (Some(writer), Some(mate)) = (self.second.as_mut(), second) {
                writer.write(mate)?;
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        self.first.finish()?;
        if let Some(second) = self.second.as_mut() {
            second.finish()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.first.path().to_path_buf()];
        if let Some(second) = &self.second {
            paths.push(second.path().to_path_buf());
        }
        paths
    }
}

/// Where demultiplexed files are placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemuxTarget {
    /// `<dir>/<key>.<ext>`
    Directory(PathBuf),
    /// `<parent>/<stem>_<key>.<ext>`
    Prefix { parent: PathBuf, stem: String },
}
impl DemuxTarget {
    /// An existing directory is used as is; any other path is a name prefix
    #[must_use]
    pub fn from_output(output: &Path) -> Self {
        if output.is_dir() {
            Self::Directory(output.to_path_buf())
        } else {
            Self::Prefix {
                parent: parent_dir(output),
                stem: naming::file_stem(output),
            }
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        match self {
            Self::Directory(dir) => dir,
            Self::Prefix { parent, .. } => parent,
        }
    }

    /// Path of the output for `key` (before any mate suffix)
    #[must_use]
    pub fn path_for(&self, key: &str, format: FileFormat) -> PathBuf {
        let key = naming::sanitize_key(key);
        match self {
            Self::Directory(dir) => dir.join(format!("{key}{}", format.extension())),
            Self::Prefix { parent, stem } => {
                parent.join(format!("{stem}_{key}{}", format.extension()))
            }
        }
    }

    /// Fails unless the target directory exists and is writable
    pub fn check_writable(&self) -> Result<()> {
        let dir = self.directory();
        let writable = std::fs::metadata(dir)
            .map(|meta| meta.is_dir() && !meta.permissions().readonly())
            .unwrap_or(false);
        if writable {
            Ok(())
        } else {
            Err(WriteError::DirectoryNotWritable(dir.to_path_buf()).into())
        }
    }
}

/// The directory holding `path`, `.` for a bare file name
#[must_use]
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Keys seen so far and the files they own
#[derive(Default)]
struct DemuxState {
    by_key: HashMap<String, Arc<Mutex<OutputPair>>>,
    claimed: HashSet<PathBuf>,
}

/// Lazily created per-key outputs
///
/// Distinct keys never share a file: when a sanitised name is already taken
/// the newcomer gets a numbered variant (`AA_AA.fastq`, `AA_AA_2.fastq`, ...).
pub struct DemuxOutputs {
    target: DemuxTarget,
    format: FileFormat,
    paired: bool,
    state: RwLock<DemuxState>,
    created: Mutex<Vec<PathBuf>>,
}
impl DemuxOutputs {
    #[must_use]
    pub fn new(target: DemuxTarget, format: FileFormat, paired: bool) -> Self {
        Self {
            target,
            format,
            paired,
            state: RwLock::new(DemuxState::default()),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Returns the output for `key`, creating its file(s) on first use
    pub fn get_or_create(&self, key: &str) -> Result<Arc<Mutex<OutputPair>>> {
        if let Some(output) = self.state.read().by_key.get(key) {
            return Ok(output.clone());
        }
        let mut state = self.state.write();
        // another worker may have inserted the key between the two locks
        if let Some(output) = state.by_key.get(key) {
            return Ok(output.clone());
        }

        let base = self.target.path_for(key, self.format);
        let mut path = base.clone();
        let mut variant = 1;
        while self.file_paths(&path).iter().any(|p| state.claimed.contains(p)) {
            variant += 1;
            path = naming::numbered(&base, variant);
        }

        let pair = OutputPair::create(&path, self.format, self.paired)?;
        let paths = pair.paths();
        state.claimed.extend(paths.iter().cloned());
        self.created.lock().extend(paths);
        let output = Arc::new(Mutex::new(pair));
        state.by_key.insert(key.to_string(), output.clone());
        Ok(output)
    }

    /// Concrete files written for an output rooted at `path`
    fn file_paths(&self, path: &Path) -> Vec<PathBuf> {
        if self.paired {
            let (first, second) = naming::mate_paths(path);
            vec![first, second]
        } else {
            vec![path.to_path_buf()]
        }
    }

    /// Number of distinct keys seen so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes every output and returns the created paths in creation order
    pub fn finish(&self) -> Result<Vec<PathBuf>> {
        for output in self.state.read().by_key.values() {
            output.lock().finish()?;
        }
        Ok(self.created.lock().clone())
    }
}

/// The destinations of one extraction run
pub enum Sinks {
    Single(Mutex<OutputPair>),
    Demux(DemuxOutputs),
}
impl Sinks {
    /// Appends one drained batch to the destination of `key`
    pub fn write_batch(&self, key: &str, batch: &[RecordPair]) -> Result<()> {
        match self {
            Self::Single(output) => output.lock().write_batch(batch),
            Self::Demux(outputs) => outputs.get_or_create(key)?.lock().write_batch(batch),
        }
    }

    pub fn finish(&self) -> Result<Vec<PathBuf>> {
        match self {
            Self::Single(output) => {
                let mut output = output.lock();
                output.finish()?;
                Ok(output.paths())
            }
            Self::Demux(outputs) => outputs.finish(),
        }
    }
}
