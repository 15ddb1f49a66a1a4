use plotters::style::RGBColor;

/// Qualitative palette for series and slices, cycled when exhausted
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: vec![
                RGBColor(99, 110, 250),
                RGBColor(239, 85, 59),
                RGBColor(0, 204, 150),
                RGBColor(171, 99, 250),
                RGBColor(255, 161, 90),
                RGBColor(25, 211, 243),
                RGBColor(255, 102, 146),
                RGBColor(182, 232, 128),
                RGBColor(255, 151, 255),
                RGBColor(254, 203, 82),
            ],
        }
    }
}

impl ColorPalette {
    pub fn nth(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }
}
