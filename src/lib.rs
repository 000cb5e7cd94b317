//! Ingestion, caching and querying of excitation-emission matrices (EEMs)
//! exported by fluorescence spectrophotometers.
//!
//! Raw exports in a directory are parsed into per-sample matrices, optionally
//! scatter-corrected, and kept in an append-only Parquet cache next to them.
//! Queries cut a consistent selection of samples to a wavelength window and
//! return line series or contour grids.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod query;
pub mod state;

pub use config::{AppConfig, CorrectionMode};
pub use data::filter::Selection;
pub use data::model::{CacheTable, EemMatrix, SampleKey, SampleMetadata, SampleRecord};
pub use data::range_cut::WavelengthRange;
pub use error::{EemError, Result};
pub use state::Workspace;
