use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::{AppConfig, CorrectionMode};
use crate::data::filter::Selection;
use crate::data::ingest::{IngestReport, IngestionManager};
use crate::data::model::{CacheTable, SampleKey};
use crate::data::range_cut::WavelengthRange;
use crate::error::Result;
use crate::query::{self, ColorbarMode, GridSet, LineSeriesSet};

// ---------------------------------------------------------------------------
// Workspace state
// ---------------------------------------------------------------------------

/// One data directory with a raw and a scatter-corrected cache, each owned by
/// its own ingestion manager and loaded on first use.
pub struct Workspace {
    data_dir: PathBuf,
    config: AppConfig,
    managers: HashMap<CorrectionMode, IngestionManager>,
}

impl Workspace {
    pub fn new(data_dir: impl Into<PathBuf>, config: AppConfig) -> Self {
        Workspace {
            data_dir: data_dir.into(),
            config,
            managers: HashMap::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the cache of `mode` and ingest new files; repeated calls are
    /// served from memory.
    pub fn open(&mut self, mode: CorrectionMode) -> Result<&IngestionManager> {
        if !self.managers.contains_key(&mode) {
            let mut manager = IngestionManager::open(&self.data_dir, mode, &self.config, false)?;
            let report = manager.ingest()?;
            info!(
                "{:?}: {} new files, {} records added",
                mode,
                report.new_files.len(),
                report.records_added
            );
            self.managers.insert(mode, manager);
        }
        Ok(&self.managers[&mode])
    }

    pub fn table(&mut self, mode: CorrectionMode) -> Result<&CacheTable> {
        Ok(self.open(mode)?.table())
    }

    /// Re-read the artifact of `mode` and ingest, purging it first when
    /// `purge` is set.
    pub fn reload_mode(&mut self, mode: CorrectionMode, purge: bool) -> Result<IngestReport> {
        if let Some(manager) = self.managers.get_mut(&mode) {
            return manager.reload(purge);
        }
        let mut manager = IngestionManager::open(&self.data_dir, mode, &self.config, purge)?;
        let report = manager.ingest()?;
        self.managers.insert(mode, manager);
        Ok(report)
    }

    /// [`Workspace::reload_mode`] for the raw and then the corrected cache.
    pub fn reload(&mut self, purge: bool) -> Result<Vec<(CorrectionMode, IngestReport)>> {
        let mut reports = Vec::new();
        for mode in [CorrectionMode::Raw, CorrectionMode::Corrected] {
            reports.push((mode, self.reload_mode(mode, purge)?));
        }
        Ok(reports)
    }

    /// Positions of the (Batch, Name) keys in the table of `mode`.
    ///
    /// Raw and corrected tables may order records differently, so the
    /// positions are only valid for queries against the same mode.
    pub fn indices_of(&mut self, mode: CorrectionMode, keys: &[SampleKey]) -> Result<Vec<usize>> {
        Ok(self.table(mode)?.indices_of(keys))
    }

    pub fn line_series(
        &mut self,
        mode: CorrectionMode,
        selection: &Selection,
        range: &WavelengthRange,
    ) -> Result<LineSeriesSet> {
        query::line_series(self.table(mode)?, selection, range)
    }

    pub fn grids(
        &mut self,
        mode: CorrectionMode,
        selection: &Selection,
        range: &WavelengthRange,
        colorbar: ColorbarMode,
    ) -> Result<GridSet> {
        query::grids(self.table(mode)?, selection, range, colorbar)
    }
}
