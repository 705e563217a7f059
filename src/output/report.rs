// JSON report of an analysis run

use crate::analysis::{AnalysisOptions, AnalysisResult, ModelStats, ProjectModel};
use crate::error::Result;
use crate::output::Diagram;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Machine-readable summary of one run
///
/// Carries no timestamp, so two runs over the same tree produce identical
/// reports.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub meta: ReportMeta,
    pub summary: ModelStats,
    pub project_model: &'a ProjectModel,
    pub diagram: &'a Diagram,
}

#[derive(Debug, Serialize)]
pub struct ReportMeta {
    pub project_path: PathBuf,
    pub options: AnalysisOptions,
}

impl<'a> Report<'a> {
    pub fn new(result: &'a AnalysisResult, project_path: &Path) -> Self {
        Self {
            meta: ReportMeta {
                project_path: project_path.to_path_buf(),
                options: result.options,
            },
            summary: result.stats,
            project_model: &result.model,
            diagram: &result.diagram,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
