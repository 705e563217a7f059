// Analysis pipeline: extraction, assembly, ranking and rendering

pub mod assembler;
pub mod model;
pub mod ranking;

pub use assembler::ModelAssembler;
pub use model::*;
pub use ranking::{DiagramView, RankOptions, SignificanceRanker, TypeView, BASE_BONUS};

use crate::config::Config;
use crate::error::Result;
use crate::output::{renderer_for, Diagram, DiagramFormat, RenderOptions};
use crate::parser::{SourceUnit, UnitDeclarations, UnitExtractor};
use crate::source::{module_path, FileScanner, SourceText};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options recognized by the core pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisOptions {
    pub format: DiagramFormat,
    /// 0 for no limit
    pub max_classes: usize,
    pub group_by_module: bool,
    pub public_only: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            format: DiagramFormat::default(),
            max_classes: 40,
            group_by_module: true,
            public_only: false,
        }
    }
}

impl AnalysisOptions {
    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            max_types: self.max_classes,
            public_only: self.public_only,
            group_by_module: self.group_by_module,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            group_by_module: self.group_by_module,
        }
    }
}

/// Result of analyzing a codebase
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// The full assembled model
    pub model: ProjectModel,
    /// Run statistics
    pub stats: ModelStats,
    /// Rendered diagram
    pub diagram: Diagram,
    /// Options the run used
    pub options: AnalysisOptions,
}

/// Run the pipeline on units that are already in memory
///
/// The result does not depend on the order of `units`.
pub fn analyze_units(units: &[SourceUnit], options: &AnalysisOptions) -> Result<AnalysisResult> {
    // Fail on a broken grammar before fanning out
    UnitExtractor::new()?;
    let declarations = extract_all(units, None);
    Ok(build(declarations, options))
}

/// Extract every unit in parallel, one extractor per worker
fn extract_all(units: &[SourceUnit], progress: Option<&ProgressBar>) -> Vec<UnitDeclarations> {
    units
        .par_iter()
        .map_init(UnitExtractor::new, |extractor, unit| {
            let decls = match extractor {
                Ok(extractor) => extractor.extract(unit),
                Err(e) => UnitDeclarations::failed(unit, None, e.to_string()),
            };
            if let Some(pb) = progress {
                pb.inc(1);
            }
            decls
        })
        .collect()
}

fn build(declarations: Vec<UnitDeclarations>, options: &AnalysisOptions) -> AnalysisResult {
    let model = ModelAssembler::new().assemble(declarations);
    let stats = model.stats();

    let view = SignificanceRanker::new(options.rank_options()).select(&model);
    let text = renderer_for(options.format).render(&view, &options.render_options());
    let diagram = Diagram {
        format: options.format,
        text,
    };

    info!(
        types = stats.types,
        rendered = view.types.len(),
        format = %options.format,
        "diagram rendered"
    );

    AnalysisResult {
        model,
        stats,
        diagram,
        options: *options,
    }
}

/// Main analyzer that orchestrates the analysis pipeline
pub struct Analyzer {
    options: AnalysisOptions,
    scanner: FileScanner,
    verbose: bool,
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    ///
    /// Configuration errors surface here, before any file is touched.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let options = config.diagram.options()?;
        let ignore = config
            .analysis
            .ignore_backend
            .build(&config.analysis.exclude)?;
        let scanner = FileScanner::new(&config.analysis.include, ignore)?;
        UnitExtractor::new()?;

        Ok(Self {
            options,
            scanner,
            verbose: false,
        })
    }

    /// Create analyzer with verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Analyze a codebase at the given path
    pub fn analyze(&self, root: &Path) -> Result<AnalysisResult> {
        let files = self.discover_files(root)?;
        info!(root = %root.display(), files = files.len(), "analyzing");

        let (units, mut failed) = self.load_units(root, &files);

        let progress = self.progress_bar(units.len());
        let mut declarations = extract_all(&units, progress.as_ref());
        if let Some(pb) = progress {
            pb.finish_with_message("Parsing complete");
        }

        declarations.append(&mut failed);
        Ok(build(declarations, &self.options))
    }

    /// Discover all Python files in the directory
    pub fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        self.scanner.scan(root)
    }

    /// Get the file count for reporting
    pub fn file_count(&self, root: &Path) -> Result<usize> {
        self.discover_files(root).map(|f| f.len())
    }

    /// Read files into units; unreadable files become failed declarations
    fn load_units(&self, root: &Path, files: &[PathBuf]) -> (Vec<SourceUnit>, Vec<UnitDeclarations>) {
        let mut units = Vec::with_capacity(files.len());
        let mut failed = Vec::new();

        for path in files {
            let module = module_path(path, root);
            match SourceText::load(path) {
                Ok(source) => {
                    if source.used_fallback {
                        debug!(path = %path.display(), "decoded with replacement characters");
                    }
                    units.push(SourceUnit::new(module, path.clone(), source.text));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read file");
                    let unit = SourceUnit::new(module, path.clone(), String::new());
                    failed.push(UnitDeclarations::failed(&unit, None, format!("cannot read file: {}", e)));
                }
            }
        }

        (units, failed)
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.verbose {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Parsing");
        Some(pb)
    }
}
