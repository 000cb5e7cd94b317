use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::debug;

use super::model::EemMatrix;
use crate::error::{EemError, Result};

/// Token separating the sample label from the excitation wavelength in a
/// column header: `<label>_EX_<wavelength>[.suffix]`.
pub const EX_TOKEN: &str = "_EX_";

/// Extension of raw instrument exports.
pub const RAW_EXTENSION: &str = "csv";

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Where the intensities of a `<label>_EX_<wl>` column live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// The labelled column itself holds intensities; column 0 holds the
    /// emission wavelengths.
    Inline,
    /// Every labelled column is followed by an unlabelled one holding the
    /// intensities (scan-pair exports). The first pair's wavelength column
    /// doubles as the emission axis.
    Paired,
}

// ---------------------------------------------------------------------------
// RawTable – one parsed instrument export
// ---------------------------------------------------------------------------

/// Header and data rows of one raw export.
///
/// Expected layout:
/// ```text
/// Wavelength,S1_EX_250,S1_EX_260,S2_EX_250,S2_EX_260
/// nm,a.u.,a.u.,a.u.,a.u.        <- optional units row
/// 300,0.12,0.11,0.40,0.38
/// 302,0.14,0.12,0.41,0.39
/// ```
#[derive(Debug, Clone)]
pub struct RawTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
    layout: ColumnLayout,
}

impl RawTable {
    /// Read a raw export from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(path, file)
    }

    /// Parse a raw export; `path` only names the source in errors.
    pub fn from_reader<R: Read>(path: &Path, mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        // The data block ends at the first blank line; instrument trailers
        // (method and acquisition logs) follow it.
        let block = text
            .lines()
            .take_while(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(block.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if !headers.iter().any(|h| h.contains(EX_TOKEN)) {
            return Err(EemError::parse(
                path,
                format!("header has no '{EX_TOKEN}' columns"),
            ));
        }

        let mut rows = Vec::new();
        for (row_no, result) in reader.records().enumerate() {
            let record = result?;
            let first = record.get(0).unwrap_or("").trim();
            if first.is_empty() {
                break;
            }
            if row_no == 0 && first.parse::<f64>().is_err() {
                // Units row.
                continue;
            }
            rows.push(record);
        }

        let layout = match headers.get(1) {
            Some(h) if h.is_empty() => ColumnLayout::Paired,
            _ => ColumnLayout::Inline,
        };

        debug!(
            "{}: {} columns, {} data rows, {:?} layout",
            path.display(),
            headers.len(),
            rows.len(),
            layout
        );

        Ok(RawTable {
            path: path.to_path_buf(),
            headers,
            rows,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Distinct sample labels in order of first appearance in the header.
    pub fn sample_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for header in &self.headers {
            if let Some((label, _)) = header.split_once(EX_TOKEN) {
                if !names.iter().any(|n| n == label) {
                    names.push(label.to_string());
                }
            }
        }
        names
    }

    /// Build the EEM of `sample`: `(data, excitation, emission)` with
    /// `data` indexed `[excitation][emission]`.
    ///
    /// Excitation wavelengths keep their column order; they are not sorted.
    pub fn build_eem(&self, sample: &str) -> Result<(EemMatrix, Vec<i32>, Vec<i32>)> {
        let offset = match self.layout {
            ColumnLayout::Inline => 0,
            ColumnLayout::Paired => 1,
        };

        let mut columns = Vec::new();
        let mut excitation = Vec::new();
        for (idx, header) in self.headers.iter().enumerate() {
            match header.split_once(EX_TOKEN) {
                Some((label, _)) if label == sample => {
                    excitation.push(self.excitation_of(header)?);
                    columns.push(idx + offset);
                }
                _ => {}
            }
        }

        if columns.is_empty() {
            return Err(EemError::parse(
                &self.path,
                format!("no '{sample}{EX_TOKEN}<wavelength>' columns"),
            ));
        }

        let emission = self
            .rows
            .iter()
            .map(|row| self.emission_of(row))
            .collect::<Result<Vec<_>>>()?;

        // Emission along rows, excitation along columns, as exported.
        let mut values = Vec::with_capacity(emission.len() * columns.len());
        for (row_no, row) in self.rows.iter().enumerate() {
            for &col in &columns {
                values.push(self.intensity(row, row_no, col)?);
            }
        }

        let exported = EemMatrix::new(emission.len(), columns.len(), values)
            .ok_or_else(|| EemError::parse(&self.path, "ragged intensity block"))?;

        Ok((exported.transpose(), excitation, emission))
    }

    fn excitation_of(&self, header: &str) -> Result<i32> {
        let token = header
            .rsplit_once(EX_TOKEN)
            .map(|(_, wl)| wl)
            .unwrap_or_default();
        let token = token.split('.').next().unwrap_or_default().trim();
        token.parse::<i32>().map_err(|_| {
            EemError::parse(
                &self.path,
                format!("column '{header}': excitation '{token}' is not a number"),
            )
        })
    }

    fn emission_of(&self, row: &StringRecord) -> Result<i32> {
        let cell = row.get(0).unwrap_or("").trim();
        cell.parse::<f64>()
            .map(|wl| wl as i32)
            .map_err(|_| {
                EemError::parse(
                    &self.path,
                    format!("emission wavelength '{cell}' is not a number"),
                )
            })
    }

    fn intensity(&self, row: &StringRecord, row_no: usize, col: usize) -> Result<f32> {
        let cell = row.get(col).unwrap_or("").trim();
        if cell.is_empty() {
            return Ok(f32::NAN);
        }
        cell.parse::<f32>().map_err(|_| {
            EemError::parse(
                &self.path,
                format!("data row {row_no}, column {col}: '{cell}' is not a number"),
            )
        })
    }
}
