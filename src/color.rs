use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};
use serde::Serialize;

use crate::data::model::CellValue;

/// House palette used for the first hues of every grouped view.
const BASE_PALETTE: [(u8, u8, u8); 6] = [
    (0x19, 0x84, 0xc5),
    (0x63, 0xbf, 0xf0),
    (0xa7, 0xd5, 0xed),
    (0xde, 0x6e, 0x56),
    (0xe1, 0x4b, 0x31),
    (0xc2, 0x37, 0x28),
];

const DEFAULT_COLOR: (u8, u8, u8) = (0x80, 0x80, 0x80);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// `n` colours: the house palette first, then evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    let mut colors: Vec<Srgb<u8>> = BASE_PALETTE
        .iter()
        .take(n)
        .map(|&(r, g, b)| Srgb::new(r, g, b))
        .collect();

    let extra = n.saturating_sub(colors.len());
    colors.extend((0..extra).map(|i| {
        let hue = (i as f32 / extra as f32) * 360.0;
        let hsl = Hsl::new(hue, 0.75, 0.55);
        let rgb: Srgb = hsl.into_color();
        rgb.into_format::<u8>()
    }));
    colors
}

pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

// ---------------------------------------------------------------------------
// Color mapping: hue value → colour
// ---------------------------------------------------------------------------

/// One legend row handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Maps the distinct values of a view's hue key to distinct colours, in the
/// order the values first appear.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub column: String,
    order: Vec<CellValue>,
    mapping: BTreeMap<CellValue, Srgb<u8>>,
}

impl ColorMap {
    pub fn new<'a>(column: &str, values: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let mut order: Vec<CellValue> = Vec::new();
        for v in values {
            if !order.contains(v) {
                order.push(v.clone());
            }
        }
        let mapping = order
            .iter()
            .cloned()
            .zip(generate_palette(order.len()))
            .collect();

        ColorMap {
            column: column.to_string(),
            order,
            mapping,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &CellValue) -> Srgb<u8> {
        self.mapping.get(value).copied().unwrap_or_else(|| {
            let (r, g, b) = DEFAULT_COLOR;
            Srgb::new(r, g, b)
        })
    }

    /// Legend entries (value label → hex colour) in first-seen order.
    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        self.order
            .iter()
            .map(|v| LegendEntry {
                label: v.to_string(),
                color: to_hex(self.color_for(v)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn house_palette_comes_first() {
        let colors = generate_palette(8);
        assert_eq!(colors.len(), 8);
        assert_eq!(to_hex(colors[0]), "#1984c5");
        assert_eq!(to_hex(colors[5]), "#c23728");
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn legend_follows_first_seen_order() {
        let values = [
            CellValue::String("3D".into()),
            CellValue::String("2D".into()),
            CellValue::String("3D".into()),
        ];
        let map = ColorMap::new("dimension", &values);
        let legend = map.legend_entries();
        assert_eq!(legend.len(), 2);
        assert_eq!(legend[0].label, "3D");
        assert_eq!(legend[0].color, "#1984c5");
        assert_eq!(legend[1].color, "#63bff0");
        assert_eq!(to_hex(map.color_for(&CellValue::Missing)), "#808080");
    }
}
