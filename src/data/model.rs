use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EemMatrix – dense 2D intensity grid
// ---------------------------------------------------------------------------

/// Row-major single-precision matrix. For a sample record the rows are
/// indexed by excitation and the columns by emission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EemMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl EemMatrix {
    /// Wrap a flat row-major buffer. Returns `None` when the buffer length
    /// does not match `rows * cols`.
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> Option<Self> {
        (rows * cols == values.len()).then_some(EemMatrix { rows, cols, values })
    }

    /// Matrix of `rows × cols` filled with `value`.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        EemMatrix {
            rows,
            cols,
            values: vec![value; rows * cols],
        }
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n_rows = rows.len();
        let values = rows.into_iter().flatten().collect();
        Some(EemMatrix {
            rows: n_rows,
            cols,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.values[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn transpose(&self) -> EemMatrix {
        let mut values = Vec::with_capacity(self.values.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                values.push(self.get(r, c));
            }
        }
        EemMatrix {
            rows: self.cols,
            cols: self.rows,
            values,
        }
    }

    /// Copy of the inclusive index window `rows × cols`.
    pub fn window(&self, rows: RangeInclusive<usize>, cols: RangeInclusive<usize>) -> EemMatrix {
        let n_rows = rows.clone().count();
        let n_cols = cols.clone().count();
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for r in rows {
            values.extend_from_slice(&self.row(r)[cols.clone()]);
        }
        EemMatrix {
            rows: n_rows,
            cols: n_cols,
            values,
        }
    }

    /// Rows as owned vectors, for serialisation to the rendering side.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }
}

// ---------------------------------------------------------------------------
// SampleRecord – one sample of one instrument export
// ---------------------------------------------------------------------------

/// Acquisition metadata and wavelength axes of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMetadata {
    /// Modification time of the source file.
    pub acquisition_time: DateTime<Utc>,
    /// Excitation wavelengths (nm), in the order the export lists them.
    pub excitation: Vec<i32>,
    /// Emission wavelengths (nm).
    pub emission: Vec<i32>,
}

/// One cached sample. `data.shape() == (excitation.len(), emission.len())`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// Source file name.
    pub batch: String,
    /// Sample label, after alias resolution.
    pub name: String,
    pub metadata: SampleMetadata,
    pub data: EemMatrix,
}

impl SampleRecord {
    pub fn key(&self) -> SampleKey {
        SampleKey::new(&self.batch, &self.name)
    }

    /// Legend label used by the line-series view.
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.batch)
    }

    /// Whether both axes match `other`'s axes exactly.
    pub fn same_axes(&self, other: &SampleRecord) -> bool {
        self.metadata.excitation == other.metadata.excitation
            && self.metadata.emission == other.metadata.emission
    }
}

// ---------------------------------------------------------------------------
// SampleKey – (Batch, Name) identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SampleKey {
    pub batch: String,
    pub name: String,
}

impl SampleKey {
    pub fn new(batch: impl Into<String>, name: impl Into<String>) -> Self {
        SampleKey {
            batch: batch.into(),
            name: name.into(),
        }
    }

    /// Parse a `"<Name> FROM <Batch>"` search entry.
    pub fn parse_search_label(label: &str) -> Option<Self> {
        let (name, batch) = label.split_once("FROM")?;
        let (name, batch) = (name.trim(), batch.trim());
        if name.is_empty() || batch.is_empty() {
            return None;
        }
        Some(SampleKey::new(batch, name))
    }

    pub fn search_label(&self) -> String {
        format!("{} FROM {}", self.name, self.batch)
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.search_label())
    }
}

// ---------------------------------------------------------------------------
// CacheTable – the ordered record collection
// ---------------------------------------------------------------------------

/// Ordered collection of sample records; the in-memory form of the
/// persisted cache artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheTable {
    records: Vec<SampleRecord>,
}

/// Wide view of a table: one row per sample, one column per
/// (excitation, emission) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub keys: Vec<SampleKey>,
    pub rows: Vec<Vec<f32>>,
}

impl CacheTable {
    pub fn from_records(records: Vec<SampleRecord>) -> Self {
        CacheTable { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&SampleRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleRecord> {
        self.records.iter()
    }

    /// Append records produced by one ingestion pass.
    pub(crate) fn extend(&mut self, records: Vec<SampleRecord>) {
        self.records.extend(records);
    }

    /// Names of the source files already represented in the table.
    pub fn cached_files(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.batch.as_str()).collect()
    }

    /// Distinct batches in first-appearance order.
    pub fn batches(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.records
            .iter()
            .map(|r| r.batch.as_str())
            .filter(|b| seen.insert(*b))
            .collect()
    }

    /// Sample names recorded for `batch`, in table order.
    pub fn names_in_batch(&self, batch: &str) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.batch == batch)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// `"<Name> FROM <Batch>"` entry for every record.
    pub fn search_labels(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().search_label()).collect()
    }

    /// Indices of the records matching each key, in key order.
    pub fn indices_of(&self, keys: &[SampleKey]) -> Vec<usize> {
        keys.iter()
            .flat_map(|key| {
                self.records
                    .iter()
                    .enumerate()
                    .filter(move |(_, r)| r.batch == key.batch && r.name == key.name)
                    .map(|(i, _)| i)
            })
            .collect()
    }

    /// Wide table of every record sharing the axes of the first record with
    /// non-empty axes. Columns are `"<ex>EX/<em>EM"`, excitation-major.
    pub fn flattened(&self) -> FlatTable {
        let reference = self
            .records
            .iter()
            .find(|r| !r.metadata.excitation.is_empty() && !r.metadata.emission.is_empty());

        let Some(reference) = reference else {
            return FlatTable {
                columns: Vec::new(),
                keys: Vec::new(),
                rows: Vec::new(),
            };
        };

        let columns = reference
            .metadata
            .excitation
            .iter()
            .flat_map(|ex| {
                reference
                    .metadata
                    .emission
                    .iter()
                    .map(move |em| format!("{ex}EX/{em}EM"))
            })
            .collect();

        let (keys, rows) = self
            .records
            .iter()
            .filter(|r| r.same_axes(reference))
            .map(|r| (r.key(), r.data.as_slice().to_vec()))
            .unzip();

        FlatTable {
            columns,
            keys,
            rows,
        }
    }
}
