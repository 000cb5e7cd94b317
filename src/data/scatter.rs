use serde::{Deserialize, Serialize};

use super::interpolate::fill_linear;
use super::model::EemMatrix;
use crate::error::{EemError, Result};

// ---------------------------------------------------------------------------
// Scatter band models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Rayleigh,
    Raman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    First,
    Second,
}

/// A scattering ridge: predicted peak emission wavelength as a quadratic in
/// the excitation wavelength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterBand {
    pub band: Band,
    pub order: Order,
    /// `[c2, c1, c0]` of `em = c2·ex² + c1·ex + c0`.
    pub coefficients: [f64; 3],
}

impl ScatterBand {
    /// Peak emission wavelength (nm) at excitation `ex` (nm).
    pub fn peak(&self, ex: f64) -> f64 {
        let [c2, c1, c0] = self.coefficients;
        (c2 * ex + c1) * ex + c0
    }
}

pub static SCATTER_BANDS: [ScatterBand; 4] = [
    ScatterBand {
        band: Band::Rayleigh,
        order: Order::First,
        coefficients: [0.0, 1.0, 0.0],
    },
    ScatterBand {
        band: Band::Raman,
        order: Order::First,
        coefficients: [0.0006, 0.8711, 18.7770],
    },
    ScatterBand {
        band: Band::Rayleigh,
        order: Order::Second,
        coefficients: [0.0, 2.0, 0.0],
    },
    ScatterBand {
        band: Band::Raman,
        order: Order::Second,
        coefficients: [-0.0001, 2.4085, -47.2238],
    },
];

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandSelector {
    Rayleigh,
    Raman,
    #[default]
    Both,
}

impl BandSelector {
    fn accepts(self, band: Band) -> bool {
        matches!(
            (self, band),
            (BandSelector::Both, _)
                | (BandSelector::Rayleigh, Band::Rayleigh)
                | (BandSelector::Raman, Band::Raman)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSelector {
    First,
    Second,
    #[default]
    Both,
}

impl OrderSelector {
    fn accepts(self, order: Order) -> bool {
        matches!(
            (self, order),
            (OrderSelector::Both, _)
                | (OrderSelector::First, Order::First)
                | (OrderSelector::Second, Order::Second)
        )
    }
}

/// Which side of a ridge is excised without limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateMode {
    /// Everything below first-order ridges.
    Below,
    /// Everything above second-order ridges.
    Above,
    /// Both of the above.
    Both,
    #[default]
    Symmetric,
}

/// What excised cells become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// `NaN`; for display of the removed region only.
    None,
    #[serde(rename = "zeros")]
    Zero,
    #[default]
    Interpolate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterParams {
    pub bands: BandSelector,
    pub orders: OrderSelector,
    /// Full excision width (nm), centred on each ridge.
    pub excision_width: f64,
    pub truncate: TruncateMode,
    pub fill: FillMode,
}

impl Default for ScatterParams {
    fn default() -> Self {
        ScatterParams {
            bands: BandSelector::Both,
            orders: OrderSelector::Both,
            excision_width: 20.0,
            truncate: TruncateMode::Symmetric,
            fill: FillMode::Interpolate,
        }
    }
}

impl ScatterParams {
    /// Settings applied to corrected caches during ingestion.
    pub fn ingestion() -> Self {
        ScatterParams {
            excision_width: 25.0,
            truncate: TruncateMode::Below,
            ..ScatterParams::default()
        }
    }

    /// Active band models.
    pub fn active_bands(&self) -> impl Iterator<Item = &'static ScatterBand> + '_ {
        SCATTER_BANDS
            .iter()
            .filter(|b| self.bands.accepts(b.band) && self.orders.accepts(b.order))
    }

    /// Excision distances `(below, above)` around the peak of `band`.
    fn reach(&self, band: &ScatterBand) -> (f64, f64) {
        let r = self.excision_width / 2.0;
        let open_below = matches!(self.truncate, TruncateMode::Below | TruncateMode::Both)
            && band.order == Order::First;
        let open_above = matches!(self.truncate, TruncateMode::Above | TruncateMode::Both)
            && band.order == Order::Second;
        (
            if open_below { f64::INFINITY } else { r },
            if open_above { f64::INFINITY } else { r },
        )
    }
}

// ---------------------------------------------------------------------------
// Removal
// ---------------------------------------------------------------------------

/// Row-major `[excitation][emission]` mask of cells inside any active ridge.
pub fn excision_mask(excitation: &[i32], emission: &[i32], params: &ScatterParams) -> Vec<bool> {
    let mut mask = vec![false; excitation.len() * emission.len()];
    for band in params.active_bands() {
        let (below, above) = params.reach(band);
        for (i, &ex) in excitation.iter().enumerate() {
            let peak = band.peak(ex as f64);
            for (j, &em) in emission.iter().enumerate() {
                let offset = em as f64 - peak;
                if offset >= -below && offset <= above {
                    mask[i * emission.len() + j] = true;
                }
            }
        }
    }
    mask
}

/// Remove scattering ridges from a `[excitation][emission]` matrix.
///
/// Retained finite cells are never modified. With
/// [`FillMode::Interpolate`], non-finite retained cells are filled along
/// with the excised ones and cells outside the hull of the finite retained
/// data become 0.
pub fn remove_scatter(
    data: &EemMatrix,
    excitation: &[i32],
    emission: &[i32],
    params: &ScatterParams,
) -> Result<EemMatrix> {
    if data.shape() != (excitation.len(), emission.len()) {
        return Err(EemError::Consistency(format!(
            "matrix is {:?} but axes are {} × {}",
            data.shape(),
            excitation.len(),
            emission.len()
        )));
    }

    let mask = excision_mask(excitation, emission, params);
    let cols = emission.len();
    let mut out = data.clone();

    match params.fill {
        FillMode::None | FillMode::Zero => {
            let value = if params.fill == FillMode::Zero { 0.0 } else { f32::NAN };
            for (idx, &excised) in mask.iter().enumerate() {
                if excised {
                    out.set(idx / cols, idx % cols, value);
                }
            }
        }
        FillMode::Interpolate => {
            let sources: Vec<bool> = mask
                .iter()
                .zip(data.as_slice())
                .map(|(&m, v)| !m && v.is_finite())
                .collect();
            let targets: Vec<bool> = sources.iter().map(|s| !s).collect();
            fill_linear(&mut out, &sources, &targets, 0.0);
        }
    }
    Ok(out)
}
