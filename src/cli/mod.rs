//! CLI module for classmap

mod args;

pub use args::{Args, Command};

use crate::analysis::{AnalysisResult, Analyzer};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{init_logging, LoggingError};
use crate::output::Report;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "classmap.toml";

/// Parse failures listed individually before the rest are counted
const MAX_LISTED_FAILURES: usize = 5;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Execute a parsed command
pub fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Analyze {
            path,
            format,
            max_classes,
            group_by_module,
            flat,
            public_only,
            config,
            exclude,
            output,
            json,
            log_level,
            log_format,
            verbose,
        } => {
            // Load config file if it exists
            let mut cfg = match &config {
                Some(config_path) => Config::load(config_path)?,
                None => Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
            };

            // Merge CLI arguments (CLI takes precedence)
            cfg.merge_cli(
                exclude,
                format.as_deref(),
                max_classes,
                Command::grouping(group_by_module, flat),
                public_only,
            )?;
            cfg.validate()?;

            let level = log_level.as_deref().or(Some(cfg.logging.level.as_str()));
            let fmt = log_format.as_deref().or(Some(cfg.logging.format.as_str()));
            match init_logging(level, fmt) {
                // Already installed when embedded or run twice in-process
                Ok(()) | Err(LoggingError::AlreadyInstalled(_)) => {}
                Err(e) => return Err(Error::config_validation(e.to_string())),
            }

            if verbose {
                eprintln!("Analyzing: {}", path.display());
                eprintln!("Format: {}", cfg.diagram.format);
                eprintln!("Max classes: {}", cfg.diagram.max_classes);
                eprintln!("Group by module: {}", cfg.diagram.group_by_module);
                eprintln!("Public only: {}", cfg.diagram.public_only);
                eprintln!("Exclude: {:?}", cfg.analysis.exclude);
            }

            if !path.exists() {
                return Err(Error::PathNotFound(path));
            }

            let analyzer = Analyzer::new(cfg)?.with_verbose(verbose);
            let result = analyzer.analyze(&path)?;

            if verbose {
                eprintln!(
                    "Analysis complete: {} modules, {} classes, {} relationships",
                    result.stats.modules, result.stats.types, result.stats.relationships
                );
            }
            report_parse_failures(&result);

            let text = if json {
                let mut text = Report::new(&result, &path).to_json()?;
                text.push('\n');
                text
            } else {
                result.diagram.text.clone()
            };

            match output {
                Some(output_path) => {
                    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&output_path, text)?;
                    info!(path = %output_path.display(), "output written");
                    if verbose {
                        eprintln!("Written to: {}", output_path.display());
                    }
                }
                None => print!("{}", text),
            }

            Ok(())
        }

        Command::Version => {
            println!("classmap {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Summarize parse failures on stderr
fn report_parse_failures(result: &AnalysisResult) {
    let failures: Vec<_> = result.model.parse_failures().collect();
    if failures.is_empty() {
        return;
    }

    eprintln!("Parse failures ({}):", failures.len());
    for diagnostic in failures.iter().take(MAX_LISTED_FAILURES) {
        eprintln!("  {}", diagnostic);
    }
    if failures.len() > MAX_LISTED_FAILURES {
        eprintln!("  ... and {} more", failures.len() - MAX_LISTED_FAILURES);
    }
}
