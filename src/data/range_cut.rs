use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::model::EemMatrix;
use crate::error::{EemError, Result};

/// Requested `[min, max]` wavelength bounds (nm) per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavelengthRange {
    pub emission: (f64, f64),
    pub excitation: (f64, f64),
}

impl Default for WavelengthRange {
    fn default() -> Self {
        WavelengthRange {
            emission: (200.0, 800.0),
            excitation: (200.0, 800.0),
        }
    }
}

/// Index of the axis value closest to `target`; the lowest index wins ties.
/// `None` only for an empty axis.
pub fn nearest_index(axis: &[i32], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &value) in axis.iter().enumerate() {
        let distance = (value as f64 - target).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// Inclusive index window spanning the values nearest to both bounds.
///
/// Bounds outside the axis clamp to its ends. Reversed bounds are swapped;
/// on a descending axis the window still runs from the lower index.
pub fn axis_window(axis: &[i32], bounds: (f64, f64)) -> Option<RangeInclusive<usize>> {
    let (lo, hi) = if bounds.0 <= bounds.1 {
        bounds
    } else {
        (bounds.1, bounds.0)
    };
    let a = nearest_index(axis, lo)?;
    let b = nearest_index(axis, hi)?;
    Some(a.min(b)..=a.max(b))
}

// ---------------------------------------------------------------------------
// RangeCut – one window applied to a whole stack
// ---------------------------------------------------------------------------

/// Index windows resolved against a pair of axes, reusable for every matrix
/// sharing those axes.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCut {
    excitation: RangeInclusive<usize>,
    emission: RangeInclusive<usize>,
    axes: (usize, usize),
}

impl RangeCut {
    pub fn fit(excitation: &[i32], emission: &[i32], range: &WavelengthRange) -> Result<Self> {
        let ex = axis_window(excitation, range.excitation)
            .ok_or_else(|| EemError::Consistency("excitation axis is empty".into()))?;
        let em = axis_window(emission, range.emission)
            .ok_or_else(|| EemError::Consistency("emission axis is empty".into()))?;
        Ok(RangeCut {
            excitation: ex,
            emission: em,
            axes: (excitation.len(), emission.len()),
        })
    }

    /// `(excitation, emission)` axes after the cut.
    pub fn cut_axes(&self, excitation: &[i32], emission: &[i32]) -> (Vec<i32>, Vec<i32>) {
        (
            excitation[self.excitation.clone()].to_vec(),
            emission[self.emission.clone()].to_vec(),
        )
    }

    /// Apply the window to one `[excitation][emission]` matrix.
    pub fn apply(&self, data: &EemMatrix) -> Result<EemMatrix> {
        if data.shape() != self.axes {
            return Err(EemError::Consistency(format!(
                "matrix is {:?}, expected {:?}",
                data.shape(),
                self.axes
            )));
        }
        Ok(data.window(self.excitation.clone(), self.emission.clone()))
    }
}

/// Axes and matrices of a stack after a range cut.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicedStack {
    pub excitation: Vec<i32>,
    pub emission: Vec<i32>,
    pub data: Vec<EemMatrix>,
}

/// Cut every matrix of `stack` (all sharing `excitation`/`emission`) to the
/// requested wavelength rectangle.
pub fn slice<'a>(
    excitation: &[i32],
    emission: &[i32],
    stack: impl IntoIterator<Item = &'a EemMatrix>,
    range: &WavelengthRange,
) -> Result<SlicedStack> {
    let cut = RangeCut::fit(excitation, emission, range)?;
    let data = stack
        .into_iter()
        .map(|m| cut.apply(m))
        .collect::<Result<Vec<_>>>()?;
    let (excitation, emission) = cut.cut_axes(excitation, emission);
    Ok(SlicedStack {
        excitation,
        emission,
        data,
    })
}
