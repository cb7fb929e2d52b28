use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use proposal_pdf::{Assembler, GenpdfEngine};

/// Builds a PDF report with a title page and a page-numbered table of contents.
///
/// The input is a markdown file starting with a YAML front matter block. Without `--output`, the
/// PDF is written to `Output/HHN_<name>.pdf` next to the input. Fonts are searched in the
/// `PROPOSAL_PDF_FONTS_DIR` directory first.
#[derive(Parser)]
#[command(name = "proposal-pdf", author, version)]
struct Cli {
    /// Markdown file with YAML front matter
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output PDF path; a bare file name is placed in the `Output` directory
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Logo image shown at the top of the title page
    #[arg(long, value_name = "PATH")]
    logo: Option<PathBuf>,

    /// Log per-component details
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let mut engine = GenpdfEngine::new();
    if let Some(logo) = &cli.logo {
        engine = engine.with_logo(logo);
    }

    let mut assembler = Assembler::new(engine);
    match assembler.build_file(&cli.input, cli.output.as_deref()) {
        Ok(path) => println!("{}", path.display()),
        Err(err) => {
            eprintln!("Error: {}", err);
            print_error_sources(&err);
            std::process::exit(1);
        }
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
