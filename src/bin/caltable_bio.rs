use anyhow::{Context, Result, anyhow};
use caltable_bio::{DATA_UNITS, IoType, RawValue, TypeEngine, ViewOptions, create_engine};
use clap::{Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "caltable_bio",
    about = "Preview, render and export CalTable bioinformatics data kinds.",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// Column name used as the default title and export file name.
    /// Defaults to the input file stem.
    #[arg(long, global = true)]
    name: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered data kinds.
    Kinds,
    /// Print the short preview string.
    Preview { kind: String, input: PathBuf },
    /// Print the rich markdown/HTML representation.
    Markdown { kind: String, input: PathBuf },
    /// Render the HTML fragment with view options.
    Html {
        kind: String,
        input: PathBuf,
        /// View options as inline JSON or @file.json
        #[arg(long)]
        options: Option<String>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Write the vector chart of a chart-drawing kind.
    Svg {
        kind: String,
        input: PathBuf,
        /// View options as inline JSON or @file.json
        #[arg(long)]
        options: Option<String>,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Serialize the value to a file in DIR.
    Export {
        kind: String,
        input: PathBuf,
        dir: PathBuf,
        #[arg(long)]
        ext: Option<String>,
    },
}

fn load_json_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("could not read JSON file '{path}'"))
        }
        None => Ok(value.to_string()),
    }
}

fn parse_options(options: Option<&str>) -> Result<ViewOptions> {
    match options {
        Some(arg) => {
            let text = load_json_arg(arg)?;
            serde_json::from_str(&text).context("could not parse view options")
        }
        None => Ok(ViewOptions::default()),
    }
}

fn load_engine(kind: &str, input: &Path, name: Option<&str>) -> Result<Box<dyn TypeEngine>> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("could not read input '{}'", input.display()))?;
    let name = match name {
        Some(name) => name.to_string(),
        None => input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.to_string()),
    };
    let io_type = IoType::new(&name).with_kind(kind);
    create_engine(kind, &RawValue::Text(text), &io_type)
        .with_context(|| format!("could not load '{}' as {kind}", input.display()))
}

fn write_or_print(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("could not write '{}'", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let name = cli.name.as_deref();
    match cli.command {
        Command::Kinds => {
            for kind in DATA_UNITS.kinds() {
                println!("{kind}");
            }
        }
        Command::Preview { kind, input } => {
            println!("{}", load_engine(&kind, &input, name)?.preview());
        }
        Command::Markdown { kind, input } => {
            let engine = load_engine(&kind, &input, name)?;
            println!("{}", engine.repr_markdown()?);
        }
        Command::Html {
            kind,
            input,
            options,
            output,
        } => {
            let options = parse_options(options.as_deref())?;
            let html = load_engine(&kind, &input, name)?.view_html(&options)?;
            write_or_print(&html, output.as_deref())?;
        }
        Command::Svg {
            kind,
            input,
            options,
            output,
        } => {
            let options = parse_options(options.as_deref())?;
            let svg = load_engine(&kind, &input, name)?
                .figure_svg(&options)?
                .ok_or_else(|| anyhow!("data kind '{kind}' does not draw a chart"))?;
            write_or_print(&svg, Some(&output))?;
        }
        Command::Export {
            kind,
            input,
            dir,
            ext,
        } => {
            let engine = load_engine(&kind, &input, name)?;
            let unit = engine.file(name, ext.as_deref())?;
            let path = unit
                .write_to_dir(&dir)
                .with_context(|| format!("could not export into '{}'", dir.display()))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
