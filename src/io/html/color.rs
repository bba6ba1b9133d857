//! Color palettes for map overlays and choropleths.

use std::fmt;

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl fmt::Display for Rgb {
    /// Format as CSS hex: #rrggbb
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Categorical palette cycled across overlays (matplotlib tab10).
pub(crate) const PALETTE: [Rgb; 10] = [
    Rgb { r: 0x1f, g: 0x77, b: 0xb4 },
    Rgb { r: 0xff, g: 0x7f, b: 0x0e },
    Rgb { r: 0x2c, g: 0xa0, b: 0x2c },
    Rgb { r: 0xd6, g: 0x27, b: 0x28 },
    Rgb { r: 0x94, g: 0x67, b: 0xbd },
    Rgb { r: 0x8c, g: 0x56, b: 0x4b },
    Rgb { r: 0xe3, g: 0x77, b: 0xc2 },
    Rgb { r: 0x7f, g: 0x7f, b: 0x7f },
    Rgb { r: 0xbc, g: 0xbd, b: 0x22 },
    Rgb { r: 0x17, g: 0xbe, b: 0xcf },
];

/// Outline color for the overlay at `index`.
#[inline]
pub(crate) fn palette_color(index: usize) -> Rgb { PALETTE[index % PALETTE.len()] }

/// ColorBrewer YlOrRd, 6 classes.
const YL_OR_RD: [Rgb; 6] = [
    Rgb { r: 0xff, g: 0xff, b: 0xb2 },
    Rgb { r: 0xfe, g: 0xd9, b: 0x76 },
    Rgb { r: 0xfe, g: 0xb2, b: 0x4c },
    Rgb { r: 0xfd, g: 0x8d, b: 0x3c },
    Rgb { r: 0xf0, g: 0x3b, b: 0x20 },
    Rgb { r: 0xbd, g: 0x00, b: 0x26 },
];

/// Fill for features without a value.
pub(crate) const MISSING: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Equal-width binned color scale over `[min, max]`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ColorScale {
    min: f64,
    max: f64,
    colors: &'static [Rgb],
}

impl ColorScale {
    pub(crate) fn yl_or_rd(min: f64, max: f64) -> Self {
        Self { min, max, colors: &YL_OR_RD }
    }

    #[inline] pub(crate) fn colors(&self) -> &'static [Rgb] { self.colors }

    /// Bin edges, `colors().len() + 1` of them.
    pub(crate) fn breaks(&self) -> Vec<f64> {
        let n = self.colors.len();
        (0..=n).map(|i| self.min + (self.max - self.min) * i as f64 / n as f64).collect()
    }

    /// Color of a value; missing and non-finite values get the missing fill.
    pub(crate) fn color(&self, value: Option<f64>) -> Rgb {
        let Some(v) = value.filter(|v| v.is_finite()) else { return MISSING };
        let span = self.max - self.min;
        if span <= 0.0 { return self.colors[self.colors.len() - 1] }

        let t = ((v - self.min) / span).clamp(0.0, 1.0);
        let idx = ((t * self.colors.len() as f64) as usize).min(self.colors.len() - 1);
        self.colors[idx]
    }
}
