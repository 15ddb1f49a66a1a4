//! Page output: ordered sections the presentation shell lays out.

use std::fmt;
use std::io::{self, Write};

use crate::dataset::Table;
use crate::ir::{AnalysisMode, Figure};

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Title(String),
    Heading(String),
    Text(String),
    Preview(Preview),
    Chart(Figure),
    Warning(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub mode: AnalysisMode,
    pub sections: Vec<Section>,
}

impl PageView {
    pub fn new(mode: AnalysisMode) -> Self {
        Self {
            mode,
            sections: vec![
                Section::Title("Supermarket Sales Analysis".to_string()),
                Section::Text("An interactive analysis of supermarket sales data".to_string()),
            ],
        }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn heading(&mut self, text: &str) {
        self.push(Section::Heading(text.to_string()));
    }

    pub fn text(&mut self, text: &str) {
        self.push(Section::Text(text.to_string()));
    }

    pub fn figures(&self) -> impl Iterator<Item = &Figure> {
        self.sections.iter().filter_map(|s| match s {
            Section::Chart(f) => Some(f),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().filter_map(|s| match s {
            Section::Warning(w) => Some(w.as_str()),
            _ => None,
        })
    }

    /// Write every section as plain text; charts appear as a placeholder line
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for section in &self.sections {
            match section {
                Section::Title(t) => {
                    writeln!(out, "{}", t)?;
                    writeln!(out, "{}", "=".repeat(t.chars().count()))?;
                }
                Section::Heading(h) => {
                    writeln!(out)?;
                    writeln!(out, "## {}", h)?;
                }
                Section::Text(t) => writeln!(out, "{}", t)?,
                Section::Preview(p) => write!(out, "{}", p)?,
                Section::Chart(f) => writeln!(out, "[chart] {}", f.title)?,
                Section::Warning(w) => writeln!(out, "WARNING: {}", w)?,
            }
        }
        Ok(())
    }
}

/// Tabular preview of the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl Preview {
    /// First `n` rows
    pub fn head(table: &Table, n: usize) -> Self {
        Self {
            headers: table.headers().map(str::to_string).collect(),
            rows: (0..n.min(table.len())).map(|i| table.row(i)).collect(),
            total_rows: table.len(),
        }
    }

    pub fn all(table: &Table) -> Self {
        Self::head(table, table.len())
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
        };

        writeln!(f, "{}", line(&self.headers))?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &self.rows {
            writeln!(f, "{}", line(row))?;
        }
        if self.rows.len() < self.total_rows {
            writeln!(f, "({} of {} rows)", self.rows.len(), self.total_rows)?;
        }
        Ok(())
    }
}
