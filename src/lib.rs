//! Classmap - Generate class diagrams from Python codebases
//!
//! Extracts classes, methods and attribute assignments from Python sources,
//! assembles them into a project model, ranks the types by significance and
//! renders the most significant ones as a PlantUML or Mermaid class diagram.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod parser;
pub mod source;

// Re-export main types
pub use analysis::{
    analyze_units, AnalysisOptions, AnalysisResult, Analyzer, ModelAssembler, ProjectModel,
    SignificanceRanker,
};
pub use config::Config;
pub use error::{Error, Result};
pub use output::{Diagram, DiagramFormat, DiagramRenderer};
pub use parser::{SourceUnit, UnitExtractor};
