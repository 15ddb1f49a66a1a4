// Interactive line-oriented shell over a session

use anyhow::{Context, Result};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ir::{AnalysisMode, PageRequest};
use crate::navigator::offered_columns;
use crate::parser::{parse_command, ShellCommand};
use crate::session::Session;

const HELP: &str = "\
Requests:
  home()
  uni(column: \"Gender\", chart: \"Pie Chart\")
  bi(first: \"Unit price\", second: \"Quantity\", chart: \"Line Chart\")
  multi(first: \"Total\", second: \"Rating\", color: \"Branch\", chart: \"Box Plot\")
Every argument is optional; unset selections use the page defaults.
Commands:
  help              show this message
  modes             list pages and their chart types
  columns <page>    list the columns a page offers
  quit | exit       leave the shell";

/// Read requests from `input` until EOF or `quit`, writing page text to
/// `output` and chart files into `out_dir`
pub fn run_shell<R: BufRead, W: Write>(
    session: &Session,
    input: R,
    mut output: W,
    out_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let view = session.handle(&PageRequest::home());
    view.write_text(&mut output)?;

    let mut charts = 0usize;
    write!(output, "\n> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            write!(output, "> ")?;
            output.flush()?;
            continue;
        }

        match parse_command(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(ShellCommand::Help) => writeln!(output, "{}", HELP)?,
            Ok(ShellCommand::Modes) => write_modes(&mut output)?,
            Ok(ShellCommand::Columns(mode)) => {
                let columns = offered_columns(session.table(), mode);
                if columns.is_empty() || mode == AnalysisMode::Home {
                    writeln!(output, "{} has no column selectors", mode)?;
                } else {
                    writeln!(output, "{}", columns.join(", "))?;
                }
            }
            Ok(ShellCommand::Show(request)) => {
                let view = session.handle(&request);
                view.write_text(&mut output)?;
                for figure in view.figures() {
                    charts += 1;
                    let path = chart_path(out_dir, charts, session.options().format.extension());
                    let saved = session.encode(figure).and_then(|bytes| {
                        fs::write(&path, bytes)
                            .with_context(|| format!("Failed to write {}", path.display()))
                    });
                    match saved {
                        Ok(()) => {
                            info!(path = %path.display(), title = %figure.title, "wrote chart");
                            writeln!(output, "Saved {}", path.display())?;
                        }
                        Err(e) => writeln!(output, "Error: {:#}", e)?,
                    }
                }
            }
            Err(e) => {
                debug!(line = %line, error = %e, "rejected shell input");
                writeln!(output, "Error: {}", e)?;
            }
        }

        write!(output, "> ")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(())
}

fn write_modes<W: Write>(output: &mut W) -> Result<()> {
    for mode in AnalysisMode::ALL {
        let charts: Vec<&str> = mode.chart_kinds().iter().map(|c| c.label()).collect();
        if charts.is_empty() {
            writeln!(output, "{}", mode)?;
        } else {
            writeln!(output, "{}: {}", mode, charts.join(", "))?;
        }
    }
    Ok(())
}

fn chart_path(dir: &Path, n: usize, extension: &str) -> PathBuf {
    dir.join(format!("chart-{}.{}", n, extension))
}
