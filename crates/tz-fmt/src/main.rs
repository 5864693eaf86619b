use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tz_core::{FormatConfig, Indent, ParseError, format_picture, format_styles};

#[derive(Parser)]
#[command(
    name = "tz-fmt",
    version,
    about = "Format TikZ pictures and style files into canonical layout"
)]
struct Cli {
    /// Input file (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// Indent with N spaces instead of tabs
    #[arg(long, value_name = "N")]
    spaces: Option<usize>,

    /// Do not wrap nodes and edges in pgfonlayer environments
    #[arg(long)]
    no_layers: bool,

    /// Treat the input as a style file (implied by a .tikzstyles extension)
    #[arg(long)]
    styles: bool,

    /// Exit with status 1 if the input is not already formatted
    #[arg(long)]
    check: bool,

    /// Log parser activity to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> FormatConfig {
        FormatConfig {
            indent: self.spaces.map_or(Indent::Tab, Indent::Spaces),
            layers: !self.no_layers,
        }
    }

    fn is_style_file(&self) -> bool {
        self.styles
            || self
                .file
                .as_ref()
                .and_then(|p| p.extension())
                .is_some_and(|ext| ext == "tikzstyles")
    }

    fn source_name(&self) -> String {
        self.file
            .as_ref()
            .map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string())
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<String, Box<dyn Error>> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()).into()),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

fn report(source: &str, errors: &[ParseError]) {
    for err in errors {
        eprintln!("{source}:{err}");
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn Error>> {
    let input = read_input(cli.file.as_ref())?;
    let source = cli.source_name();

    let formatted = if cli.is_style_file() {
        format_styles(&input)
    } else {
        format_picture(&input, &cli.config())
    };
    let formatted = match formatted {
        Ok(text) => text,
        Err(errors) => {
            report(&source, &errors);
            return Ok(ExitCode::FAILURE);
        }
    };

    if cli.check {
        if formatted == input {
            log::debug!("{source} is formatted");
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("{source}: not formatted");
        return Ok(ExitCode::FAILURE);
    }

    print!("{formatted}");
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
