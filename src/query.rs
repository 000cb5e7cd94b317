//! Presentation-agnostic views over a cache table: flattened line series
//! and per-sample 2D grids. Both are read-only with respect to the table.

use serde::{Deserialize, Serialize};

use crate::color::LegendColors;
use crate::data::filter::{consistent_records, Selection};
use crate::data::model::{CacheTable, SampleRecord};
use crate::data::range_cut::{slice, SlicedStack, WavelengthRange};
use crate::error::Result;

/// Panels per row in the grid layout.
pub const GRID_COLUMNS: usize = 3;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// Emission spectrum of one sample at one excitation wavelength.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    /// `"<Name> <Batch>"`.
    pub label: String,
    pub excitation: i32,
    pub color: [u8; 3],
    pub y: Vec<f32>,
}

/// Line series sharing one emission axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeriesSet {
    pub emission: Vec<i32>,
    pub series: Vec<LineSeries>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorbarMode {
    /// Every panel carries its own colour scale.
    #[default]
    Individual,
    Hide,
}

/// Contour grid of one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPanel {
    pub title: String,
    /// Zero-based position in the panel layout.
    pub row: usize,
    pub column: usize,
    /// Emission axis.
    pub x: Vec<i32>,
    /// Excitation axis.
    pub y: Vec<i32>,
    /// `z[excitation][emission]`.
    pub z: Vec<Vec<f32>>,
    pub show_scale: bool,
    pub color_axis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSet {
    pub rows: usize,
    pub columns: usize,
    pub panels: Vec<GridPanel>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn select_and_cut<'a>(
    table: &'a CacheTable,
    selection: &Selection,
    range: &WavelengthRange,
) -> Result<(Vec<&'a SampleRecord>, SlicedStack)> {
    let records = consistent_records(table, selection)?;
    let axes = &records[0].metadata;
    let stack = slice(
        &axes.excitation,
        &axes.emission,
        records.iter().map(|r| &r.data),
        range,
    )?;
    Ok((records, stack))
}

/// One series per (sample, excitation) pair over the cut emission axis.
pub fn line_series(
    table: &CacheTable,
    selection: &Selection,
    range: &WavelengthRange,
) -> Result<LineSeriesSet> {
    let (records, stack) = select_and_cut(table, selection, range)?;
    let labels: Vec<String> = records.iter().map(|r| r.label()).collect();
    let legend = LegendColors::new(labels.iter().map(String::as_str));

    let mut series = Vec::with_capacity(records.len() * stack.excitation.len());
    for (label, matrix) in labels.iter().zip(&stack.data) {
        let color = legend.color_for(label);
        for (row, &excitation) in stack.excitation.iter().enumerate() {
            series.push(LineSeries {
                label: label.clone(),
                excitation,
                color,
                y: matrix.row(row).to_vec(),
            });
        }
    }

    Ok(LineSeriesSet {
        emission: stack.emission,
        series,
    })
}

/// One contour panel per sample, laid out [`GRID_COLUMNS`] to a row.
pub fn grids(
    table: &CacheTable,
    selection: &Selection,
    range: &WavelengthRange,
    colorbar: ColorbarMode,
) -> Result<GridSet> {
    let (records, stack) = select_and_cut(table, selection, range)?;

    let panels = records
        .iter()
        .zip(&stack.data)
        .enumerate()
        .map(|(i, (record, matrix))| GridPanel {
            title: record.name.clone(),
            row: i / GRID_COLUMNS,
            column: i % GRID_COLUMNS,
            x: stack.emission.clone(),
            y: stack.excitation.clone(),
            z: matrix.to_rows(),
            show_scale: colorbar == ColorbarMode::Individual,
            color_axis: match colorbar {
                ColorbarMode::Individual => Some(format!("coloraxis{}", i + 1)),
                ColorbarMode::Hide => None,
            },
        })
        .collect::<Vec<_>>();

    Ok(GridSet {
        rows: panels.len().div_ceil(GRID_COLUMNS),
        columns: GRID_COLUMNS,
        panels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use crate::data::model::SampleKey;
    use crate::error::EemError;

    fn table() -> CacheTable {
        let ex = vec![250, 260, 270];
        let em = vec![300, 310, 320, 330];
        CacheTable::from_records(vec![
            record("a.csv", "S1", ex.clone(), em.clone()),
            record("a.csv", "S2", ex.clone(), em.clone()),
            record("b.csv", "S3", ex.clone(), em.clone()),
            record("b.csv", "S4", ex.clone(), em.clone()),
            record("c.csv", "Short", ex, vec![300, 310, 320]),
        ])
    }

    #[test]
    fn line_series_repeat_label_per_excitation() {
        let range = WavelengthRange {
            emission: (310.0, 330.0),
            excitation: (260.0, 270.0),
        };
        let set = line_series(&table(), &Selection::Indices(vec![1, 2]), &range).unwrap();

        assert_eq!(set.emission, vec![310, 320, 330]);
        let labels: Vec<_> = set.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["S2 a.csv", "S2 a.csv", "S3 b.csv", "S3 b.csv"]);
        let excitations: Vec<_> = set.series.iter().map(|s| s.excitation).collect();
        assert_eq!(excitations, vec![260, 270, 260, 270]);
        // record() fills 0..12 row-major: excitation 260 is row 1.
        assert_eq!(set.series[0].y, vec![5.0, 6.0, 7.0]);
        assert_eq!(set.series[0].color, set.series[1].color);
        assert_ne!(set.series[0].color, set.series[2].color);
    }

    #[test]
    fn line_series_by_sample_key() {
        let set = line_series(
            &table(),
            &Selection::Sample(SampleKey::new("b.csv", "S4")),
            &WavelengthRange::default(),
        )
        .unwrap();
        assert_eq!(set.series.len(), 3);
        assert!(set.series.iter().all(|s| s.label == "S4 b.csv"));
    }

    #[test]
    fn mismatched_emission_lengths_yield_no_output() {
        let table = table();
        let selection = Selection::Indices(vec![0, 4]);
        let err = line_series(&table, &selection, &WavelengthRange::default()).unwrap_err();
        assert!(matches!(err, EemError::Consistency(_)));
        let err = grids(&table, &selection, &WavelengthRange::default(), ColorbarMode::Hide)
            .unwrap_err();
        assert!(matches!(err, EemError::Consistency(_)));
    }

    #[test]
    fn grids_use_three_columns() {
        let set = grids(
            &table(),
            &Selection::Indices(vec![0, 1, 2, 3]),
            &WavelengthRange::default(),
            ColorbarMode::Individual,
        )
        .unwrap();
        assert_eq!((set.rows, set.columns), (2, 3));
        let positions: Vec<_> = set.panels.iter().map(|p| (p.row, p.column)).collect();
        assert_eq!(positions, vec![(0, 0), (0, 1), (0, 2), (1, 0)]);
        assert_eq!(set.panels[3].title, "S4");
        assert_eq!(set.panels[3].color_axis.as_deref(), Some("coloraxis4"));
        assert!(set.panels.iter().all(|p| p.show_scale));
        assert_eq!(set.panels[0].z.len(), set.panels[0].y.len());
        assert_eq!(set.panels[0].z[0].len(), set.panels[0].x.len());
    }

    #[test]
    fn hidden_colorbar_drops_scales() {
        let set = grids(
            &table(),
            &Selection::Indices(vec![0]),
            &WavelengthRange::default(),
            ColorbarMode::Hide,
        )
        .unwrap();
        assert_eq!(set.rows, 1);
        assert!(!set.panels[0].show_scale);
        assert_eq!(set.panels[0].color_axis, None);
    }

    #[test]
    fn queries_leave_the_table_untouched() {
        let table = table();
        let before = table.clone();
        let range = WavelengthRange {
            emission: (305.0, 315.0),
            excitation: (250.0, 250.0),
        };
        assert!(line_series(&table, &Selection::All, &range).is_err());
        let mut set = line_series(&table, &Selection::Indices(vec![0, 1]), &range).unwrap();
        set.series[0].y[0] = -1.0;
        assert_eq!(table, before);
    }
}
