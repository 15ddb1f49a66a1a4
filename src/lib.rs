// Library exports for salesdash

pub mod classify;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod ir;
pub mod navigator;
pub mod palette;
pub mod parser;
pub mod selector;
pub mod session;
pub mod shell;
pub mod transform;
pub mod view;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    /// Bin count for histograms over numerical columns
    #[serde(default = "default_bins")]
    pub bins: usize,
    /// Rows shown in the "Data Overview" preview of the analysis pages
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

/// Largest accepted width or height in pixels
pub const MAX_DIMENSION: u32 = 10_000;

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_bins() -> usize { 20 }
fn default_preview_rows() -> usize { 5 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
            bins: default_bins(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl RenderOptions {
    /// Parse options from a JSON object; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: RenderOptions =
            serde_json::from_str(json).context("Invalid render options JSON")?;
        options.validate()?;
        Ok(options)
    }

    /// Reject sizes that are zero or too large to allocate a pixel buffer for
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("Render width and height must be positive");
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            anyhow::bail!(
                "Render size {}x{} exceeds the {}px limit",
                self.width,
                self.height,
                MAX_DIMENSION
            );
        }
        if self.bins == 0 {
            anyhow::bail!("Histogram bin count must be positive");
        }
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&json)
    }
}
