use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| to_color32(Hsl::new(i as f32 / n as f32 * 360.0, 0.65, 0.50)))
        .collect()
}

/// Lighten a colour for nested treemap tiles; `depth` 0 is unchanged.
///
/// Works in HSL so hue and saturation of the group colour are kept.
pub fn shade(color: Color32, depth: usize) -> Color32 {
    if depth == 0 {
        return color;
    }
    let channel = |c: u8| c as f32 / 255.0;
    let rgb = Srgb::new(channel(color.r()), channel(color.g()), channel(color.b()));
    let mut hsl: Hsl = rgb.into_color();
    hsl.lightness = (hsl.lightness + depth as f32 * 0.12).min(0.92);
    to_color32(hsl)
}

fn to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgb(byte(rgb.red), byte(rgb.green), byte(rgb.blue))
}

// ---------------------------------------------------------------------------
// Color mapping: category label → Color32
// ---------------------------------------------------------------------------

/// Maps the labels of one grouping level to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from labels; duplicates share one colour.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut unique: Vec<&str> = labels.into_iter().collect();
        unique.sort_unstable();
        unique.dedup();

        let palette = generate_palette(unique.len());
        let mapping: BTreeMap<String, Color32> = unique
            .into_iter()
            .zip(palette)
            .map(|(label, c)| (label.to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}
