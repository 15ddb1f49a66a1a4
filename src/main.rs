use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use salesdash::parser::parse_request;
use salesdash::session::Session;
use salesdash::shell::run_shell;
use salesdash::{OutputFormat, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "salesdash")]
#[command(about = "Explore supermarket sales data with uni-, bi- and multi-variate charts", long_about = None)]
struct Args {
    /// Sales dataset (CSV with the standard header row)
    #[arg(long, default_value = "supermarket_sales_analysis.csv")]
    data: PathBuf,

    /// JSON render options (width, height, type, bins, preview_rows)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one page; text goes to stderr, the chart to -o or stdout
    Render {
        /// Page request, e.g. 'uni(column: "Gender", chart: "Pie Chart")'
        request: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read requests line by line
    Shell {
        #[arg(long, default_value = "charts")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // stdout may carry chart bytes, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let options = load_options(&args)?;
    let session = Session::open(&args.data, options)?;

    match args.command {
        Command::Render { request, output } => render(&session, &request, output),
        Command::Shell { out_dir } => {
            let stdin = io::stdin();
            run_shell(&session, stdin.lock(), io::stdout(), &out_dir)
        }
    }
}

fn load_options(args: &Args) -> Result<RenderOptions> {
    let mut options = match &args.config {
        Some(path) => RenderOptions::from_json_file(path)?,
        None => RenderOptions::default(),
    };
    if let Some(width) = args.width {
        options.width = width;
    }
    if let Some(height) = args.height {
        options.height = height;
    }
    if let Some(format) = args.format {
        options.format = format;
    }
    options.validate()?;
    Ok(options)
}

fn render(session: &Session, request: &str, output: Option<PathBuf>) -> Result<()> {
    let request = parse_request(request)?;
    let view = session.handle(&request);

    let stderr = io::stderr();
    view.write_text(&mut stderr.lock())
        .context("Failed to write page text")?;

    // A rejected combination is a warning, not a failure
    let Some(figure) = view.figures().next() else {
        return Ok(());
    };
    let bytes = session.encode(figure).context("Failed to render chart")?;

    match output {
        Some(path) => {
            fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "wrote chart");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write chart to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
