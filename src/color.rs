use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct sRGB colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<[u8; 3]> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Legend colours: series label → colour
// ---------------------------------------------------------------------------

/// One colour per distinct legend label, assigned in first-appearance order
/// so every excitation trace of a sample shares its sample's colour.
#[derive(Debug, Clone)]
pub struct LegendColors {
    mapping: BTreeMap<String, [u8; 3]>,
}

impl LegendColors {
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut distinct: Vec<&str> = Vec::new();
        for label in labels {
            if !distinct.contains(&label) {
                distinct.push(label);
            }
        }
        let palette = generate_palette(distinct.len());
        let mapping = distinct
            .into_iter()
            .zip(palette)
            .map(|(label, color)| (label.to_string(), color))
            .collect();
        LegendColors { mapping }
    }

    /// Colour of `label`; grey for labels the legend was not built from.
    pub fn color_for(&self, label: &str) -> [u8; 3] {
        self.mapping.get(label).copied().unwrap_or([128, 128, 128])
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
