use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info, warn};

use super::alias::AliasMap;
use super::cache;
use super::loader::{RawTable, RAW_EXTENSION};
use super::model::{CacheTable, SampleMetadata, SampleRecord};
use super::scatter::{remove_scatter, ScatterParams};
use crate::config::{AppConfig, CorrectionMode};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Source enumeration
// ---------------------------------------------------------------------------

/// A raw export found in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Raw exports in `dir`, ordered by modification time, then by name.
pub fn source_files(dir: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_raw = path.extension().and_then(|e| e.to_str()) == Some(RAW_EXTENSION);
        if !is_raw || !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            warn!("skipping non UTF-8 file name {}", path.display());
            continue;
        };
        // Microseconds, the resolution of the artifact's timestamp column.
        let modified = DateTime::<Utc>::from(entry.metadata()?.modified()?).trunc_subsecs(6);
        files.push(SourceFile {
            name,
            path,
            modified,
        });
    }
    files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

// ---------------------------------------------------------------------------
// IngestionManager
// ---------------------------------------------------------------------------

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files_found: usize,
    /// New files, in processing order.
    pub new_files: Vec<String>,
    pub records_added: usize,
    pub persisted: bool,
}

/// Owns the cache table of one source directory in one correction mode.
///
/// A file is ingested once: files already represented in the table are
/// never re-read, even if they change on disk, and records of files removed
/// from disk are kept.
#[derive(Debug)]
pub struct IngestionManager {
    source_dir: PathBuf,
    mode: CorrectionMode,
    config: AppConfig,
    cache_path: PathBuf,
    table: CacheTable,
}

impl IngestionManager {
    /// Load the persisted table of `source_dir` (deleting it first when
    /// `purge` is set) without scanning for new files.
    pub fn open(
        source_dir: &Path,
        mode: CorrectionMode,
        config: &AppConfig,
        purge: bool,
    ) -> Result<Self> {
        let cache_path = source_dir.join(config.cache_filename_for(mode));
        if purge {
            purge_artifact(&cache_path)?;
        }
        let table = cache::load(&cache_path)?.unwrap_or_default();
        info!(
            "{:?} cache of {}: {} records",
            mode,
            source_dir.display(),
            table.len()
        );
        Ok(IngestionManager {
            source_dir: source_dir.to_path_buf(),
            mode,
            config: config.clone(),
            cache_path,
            table,
        })
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn mode(&self) -> CorrectionMode {
        self.mode
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn table(&self) -> &CacheTable {
        &self.table
    }

    pub fn into_table(self) -> CacheTable {
        self.table
    }

    /// Ingest every source file not yet in the table.
    ///
    /// Either all new files are parsed and the merged table is persisted in
    /// one atomic write, or the first failure is returned and neither the
    /// in-memory table nor the artifact changes.
    pub fn ingest(&mut self) -> Result<IngestReport> {
        let files = source_files(&self.source_dir)?;
        info!("{} files are found.", files.len());

        let cached: BTreeSet<&str> = self.table.cached_files();
        let new_files: Vec<&SourceFile> = files
            .iter()
            .filter(|f| !cached.contains(f.name.as_str()))
            .collect();
        info!("{} new files are found.", new_files.len());

        let mut report = IngestReport {
            files_found: files.len(),
            new_files: new_files.iter().map(|f| f.name.clone()).collect(),
            ..IngestReport::default()
        };
        if new_files.is_empty() {
            return Ok(report);
        }

        let aliases = AliasMap::load(&self.source_dir.join(&self.config.rename_filename))?;
        let scatter = match self.mode {
            CorrectionMode::Raw => None,
            CorrectionMode::Corrected => Some(&self.config.scatter),
        };

        let mut buffer = Vec::new();
        for file in new_files {
            let records = process_file(file, &aliases, scatter)?;
            debug!("{}: {} samples", file.name, records.len());
            buffer.extend(records);
        }

        report.records_added = buffer.len();
        let mut merged = self.table.clone();
        merged.extend(buffer);
        cache::persist(&merged, &self.cache_path)?;
        self.table = merged;
        report.persisted = true;
        Ok(report)
    }

    /// Re-read the artifact (optionally purging it first) and ingest.
    pub fn reload(&mut self, purge: bool) -> Result<IngestReport> {
        if purge {
            purge_artifact(&self.cache_path)?;
        }
        self.table = cache::load(&self.cache_path)?.unwrap_or_default();
        self.ingest()
    }
}

fn purge_artifact(path: &Path) -> Result<()> {
    if path.exists() {
        warn!("Deleting the cache {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Build the records of every sample in one raw export.
fn process_file(
    file: &SourceFile,
    aliases: &AliasMap,
    scatter: Option<&ScatterParams>,
) -> Result<Vec<SampleRecord>> {
    info!("Processing {}", file.name);
    let raw = RawTable::read(&file.path)?;

    raw.sample_names()
        .into_iter()
        .map(|sample| {
            let (data, excitation, emission) = raw.build_eem(&sample)?;
            let data = match scatter {
                Some(params) => remove_scatter(&data, &excitation, &emission, params)?,
                None => data,
            };
            Ok(SampleRecord {
                batch: file.name.clone(),
                name: aliases.resolve(&file.name, &sample).to_string(),
                metadata: SampleMetadata {
                    acquisition_time: file.modified,
                    excitation,
                    emission,
                },
                data,
            })
        })
        .collect()
}

/// Ingest `source_dir` with the default configuration and return the
/// resulting table.
pub fn load(source_dir: &Path, mode: CorrectionMode, purge: bool) -> Result<CacheTable> {
    load_with(source_dir, mode, purge, &AppConfig::default())
}

pub fn load_with(
    source_dir: &Path,
    mode: CorrectionMode,
    purge: bool,
    config: &AppConfig,
) -> Result<CacheTable> {
    let mut manager = IngestionManager::open(source_dir, mode, config, purge)?;
    manager.ingest()?;
    Ok(manager.into_table())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_csv_files_are_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x").unwrap();
        std::fs::write(dir.path().join("b.CSV"), "x").unwrap();
        std::fs::write(dir.path().join("rename.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let names: Vec<_> = source_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a.csv"]);
    }

    #[test]
    fn empty_directory_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager =
            IngestionManager::open(dir.path(), CorrectionMode::Raw, &AppConfig::default(), false)
                .unwrap();
        let report = manager.ingest().unwrap();
        assert_eq!(report, IngestReport::default());
        assert!(!manager.cache_path().exists());
    }
}
