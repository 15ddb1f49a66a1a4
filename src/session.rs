// Dashboard session: the loaded table plus render options

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::dataset::Table;
use crate::graph;
use crate::ir::{Figure, PageRequest};
use crate::navigator::page_for;
use crate::view::PageView;
use crate::RenderOptions;

/// Read-only context shared by every page render
pub struct Session {
    table: Table,
    options: RenderOptions,
}

impl Session {
    pub fn new(table: Table, options: RenderOptions) -> Self {
        Self { table, options }
    }

    /// Load the dataset at `path`
    pub fn open(path: impl AsRef<Path>, options: RenderOptions) -> Result<Self> {
        let path = path.as_ref();
        let table = Table::load(path)
            .with_context(|| format!("Failed to load dataset {}", path.display()))?;
        Ok(Self::new(table, options))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the page a request points at
    pub fn handle(&self, request: &PageRequest) -> PageView {
        debug!(mode = %request.mode, selection = ?request.selection, "handling request");
        page_for(request.mode).render(&self.table, &request.selection, &self.options)
    }

    /// Encode a figure in the configured output format
    pub fn encode(&self, figure: &Figure) -> Result<Vec<u8>> {
        graph::render_figure(figure, &self.options)
    }
}
