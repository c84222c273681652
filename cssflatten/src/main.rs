use anyhow::{Context, Result};
use clap::Parser;
use cssflatten_lib::{FlattenError, FlattenOptions, Flattener};
use log::info;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cssflatten")]
#[command(about = "Inline CSS stylesheets into HTML style attributes")]
struct Args {
    /// Input HTML file.
    input: PathBuf,

    /// Stylesheet to inline. Repeat to apply several, in order.
    #[arg(short, long = "css")]
    css: Vec<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also inline the document's own <style> elements.
    #[arg(long)]
    embedded: bool,

    /// Fail on malformed declarations instead of skipping them.
    #[arg(long)]
    strict: bool,

    /// Log rule-by-rule progress (same as RUST_LOG=debug).
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run(args: &Args) -> Result<()> {
    if args.css.is_empty() && !args.embedded {
        return Err(FlattenError::InvalidArgument { name: "css" })
            .context("pass --css <FILE> or --embedded");
    }

    let html = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    info!("read {} bytes of html from {}", html.len(), args.input.display());

    let mut css = String::new();
    for path in &args.css {
        let sheet =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        css.push_str(&sheet);
        css.push('\n');
    }

    let options = FlattenOptions::new()
        .strict(args.strict)
        .include_embedded_styles(args.embedded);
    let output = Flattener::new(options).flatten(&html, &css)?;

    match &args.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", output),
    }
    Ok(())
}
