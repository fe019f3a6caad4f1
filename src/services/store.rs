//! Versioned extract store
//!
//! Each upstream source is refreshed out of band and dropped into the store
//! directory as `{source}_{YYYY-MM-DD}.{csv|json}`. Readers always take the
//! newest version; older versions are kept until pruned.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use directories::BaseDirs;
use fs2::FileExt;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::types::{CheckinError, Result};

const EXTENSIONS: [&str; 2] = ["csv", "json"];

/// One version of one source's raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extract {
    pub source: String,
    pub version: NaiveDate,
    pub data: Vec<u8>,
}

/// Read side of the store, shared by the loader and tests
pub trait ExtractStore: Sync {
    /// Newest version of `source`, or `NoDataAvailable`
    fn latest(&self, source: &str) -> Result<Extract>;

    /// All versions of `source`, oldest first
    fn versions(&self, source: &str) -> Result<Vec<NaiveDate>>;
}

/// Directory-backed store
pub struct FileExtractStore {
    dir: PathBuf,
}

impl FileExtractStore {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| CheckinError::Store("Cannot determine home directory".into()))?;
        let dir = base_dirs.home_dir().join(".checkin").join("cache");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name_pattern(source: &str) -> Result<Regex> {
        Regex::new(&format!(
            r"^{}_(\d{{4}}-\d{{2}}-\d{{2}})\.(?:csv|json)$",
            regex::escape(source)
        ))
        .map_err(|e| CheckinError::Store(format!("Bad source name '{}': {}", source, e)))
    }

    /// Version files of `source`, sorted by version
    fn entries(&self, source: &str) -> Result<Vec<(NaiveDate, PathBuf)>> {
        let pattern = format!(
            "{}/{}_*",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            glob::Pattern::escape(source)
        );
        let name_re = Self::file_name_pattern(source)?;

        let paths = glob::glob(&pattern)
            .map_err(|e| CheckinError::Store(format!("Invalid glob pattern: {}", e)))?;

        let mut entries = Vec::new();
        for path in paths {
            let path = match path {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "unreadable store entry");
                    continue;
                }
            };
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(caps) = name_re.captures(name) else {
                continue;
            };
            match NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
                Ok(version) => entries.push((version, path)),
                Err(_) => debug!(file = name, "ignoring file with invalid date suffix"),
            }
        }

        entries.sort();
        Ok(entries)
    }

    /// Write a new version atomically (temp file + rename). Writers of the same
    /// source serialize on a `{source}.lock` file beside the extracts.
    pub fn put(&self, source: &str, version: NaiveDate, ext: &str, data: &[u8]) -> Result<PathBuf> {
        if !EXTENSIONS.contains(&ext) {
            return Err(CheckinError::Store(format!(
                "Unsupported extract extension '{}': expected csv or json",
                ext
            )));
        }
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(format!("{}_{}.{}", source, version, ext));
        let temp_path = path.with_extension(format!("{}.tmp", ext));

        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(format!("{}.lock", source)))?;
        lock.lock_exclusive()
            .map_err(|e| CheckinError::Store(format!("Failed to acquire write lock: {}", e)))?;

        let written = Self::write_then_rename(&temp_path, &path, data);
        let _ = lock.unlock();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        debug!(source, %version, "stored extract");
        Ok(path)
    }

    fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = File::create(temp_path)
            .map_err(|e| CheckinError::Store(format!("Failed to create temp file: {}", e)))?;
        file.write_all(data)
            .map_err(|e| CheckinError::Store(format!("Failed to write temp file: {}", e)))?;
        file.sync_all()
            .map_err(|e| CheckinError::Store(format!("Failed to sync temp file: {}", e)))?;
        drop(file);

        fs::rename(temp_path, path)
            .map_err(|e| CheckinError::Store(format!("Failed to rename temp file: {}", e)))
    }

    /// Delete every version of `source` older than the latest. Returns the removed paths.
    pub fn prune(&self, source: &str) -> Result<Vec<PathBuf>> {
        let entries = self.entries(source)?;
        let Some(latest) = entries.last().map(|(v, _)| *v) else {
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        for (version, path) in entries {
            if version < latest {
                fs::remove_file(&path)?;
                removed.push(path);
            }
        }
        if !removed.is_empty() {
            info!(source, count = removed.len(), %latest, "pruned old extracts");
        }
        Ok(removed)
    }

    /// Every source in the directory with its versions
    pub fn catalog(&self) -> Result<BTreeMap<String, Vec<NaiveDate>>> {
        let name_re = Regex::new(r"^(.+)_(\d{4}-\d{2}-\d{2})\.(?:csv|json)$")
            .map_err(|e| CheckinError::Store(e.to_string()))?;

        let mut catalog: BTreeMap<String, Vec<NaiveDate>> = BTreeMap::new();
        if !self.dir.exists() {
            return Ok(catalog);
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(caps) = name_re.captures(name) else {
                continue;
            };
            if let Ok(version) = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d") {
                catalog.entry(caps[1].to_string()).or_default().push(version);
            }
        }
        for versions in catalog.values_mut() {
            versions.sort();
            versions.dedup();
        }
        Ok(catalog)
    }
}

impl ExtractStore for FileExtractStore {
    fn latest(&self, source: &str) -> Result<Extract> {
        let (version, path) = self
            .entries(source)?
            .pop()
            .ok_or_else(|| CheckinError::NoDataAvailable(source.to_string()))?;
        debug!(source, %version, path = %path.display(), "selected extract version");
        Ok(Extract {
            source: source.to_string(),
            version,
            data: fs::read(&path)?,
        })
    }

    fn versions(&self, source: &str) -> Result<Vec<NaiveDate>> {
        let mut versions: Vec<NaiveDate> = self.entries(source)?.into_iter().map(|(v, _)| v).collect();
        versions.dedup();
        Ok(versions)
    }
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryExtractStore {
    extracts: BTreeMap<String, BTreeMap<NaiveDate, Vec<u8>>>,
}

impl MemoryExtractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: &str, version: NaiveDate, data: impl Into<Vec<u8>>) {
        self.extracts
            .entry(source.to_string())
            .or_default()
            .insert(version, data.into());
    }

    pub fn with(mut self, source: &str, version: NaiveDate, data: impl Into<Vec<u8>>) -> Self {
        self.insert(source, version, data);
        self
    }
}

impl ExtractStore for MemoryExtractStore {
    fn latest(&self, source: &str) -> Result<Extract> {
        self.extracts
            .get(source)
            .and_then(|versions| versions.iter().next_back())
            .map(|(version, data)| Extract {
                source: source.to_string(),
                version: *version,
                data: data.clone(),
            })
            .ok_or_else(|| CheckinError::NoDataAvailable(source.to_string()))
    }

    fn versions(&self, source: &str) -> Result<Vec<NaiveDate>> {
        Ok(self
            .extracts
            .get(source)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default())
    }
}
