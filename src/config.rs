use crate::analysis::AnalysisOptions;
use crate::error::{Error, Result};
use crate::logging::LogFormat;
use crate::output::DiagramFormat;
use crate::source::IgnoreBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub analysis: AnalysisConfig,
    pub diagram: DiagramConfig,
    pub logging: LoggingConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

/// Source discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub ignore_backend: IgnoreBackend,
}

/// Diagram settings
///
/// `max_classes` is signed so that a negative value in a config file reaches
/// validation instead of failing deserialization with a less useful message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub format: DiagramFormat,
    pub max_classes: i64,
    pub group_by_module: bool,
    pub public_only: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "*.egg-info/**".to_string(),
                "build/**".to_string(),
                "dist/**".to_string(),
            ],
            include: vec!["**/*.py".to_string()],
            ignore_backend: IgnoreBackend::default(),
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            format: DiagramFormat::default(),
            max_classes: 40,
            group_by_module: true,
            public_only: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl DiagramConfig {
    /// Convert into validated pipeline options
    pub fn options(&self) -> Result<AnalysisOptions> {
        let max_classes = usize::try_from(self.max_classes).map_err(|_| {
            Error::config_validation(format!(
                "max_classes must not be negative (got {})",
                self.max_classes
            ))
        })?;

        Ok(AnalysisOptions {
            format: self.format,
            max_classes,
            group_by_module: self.group_by_module,
            public_only: self.public_only,
        })
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file, or return defaults when the file does not exist
    ///
    /// A file that exists but is malformed is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        exclude: Vec<String>,
        format: Option<&str>,
        max_classes: Option<i64>,
        group_by_module: Option<bool>,
        public_only: bool,
    ) -> Result<()> {
        if !exclude.is_empty() {
            self.analysis.exclude.extend(exclude);
        }

        if let Some(fmt) = format {
            self.diagram.format = DiagramFormat::from_str(fmt)?;
        }

        if let Some(max) = max_classes {
            self.diagram.max_classes = max;
        }

        if let Some(group) = group_by_module {
            self.diagram.group_by_module = group;
        }

        if public_only {
            self.diagram.public_only = true;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.diagram.options()?;

        if self.analysis.include.is_empty() {
            return Err(Error::config_validation("at least one include pattern required"));
        }

        LogFormat::from_str(&self.logging.format).map_err(Error::config_validation)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.name, "Untitled Project");
        assert_eq!(config.diagram.format, DiagramFormat::PlantUml);
        assert_eq!(config.diagram.max_classes, 40);
        assert!(config.diagram.group_by_module);
        assert!(!config.diagram.public_only);
        assert_eq!(config.analysis.ignore_backend, IgnoreBackend::Glob);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[project]
name = "Shop"

[analysis]
ignore_backend = "naive"

[diagram]
format = "mermaid"
max_classes = 10
group_by_module = false
public_only = true
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.project.name, "Shop");
        assert_eq!(config.analysis.ignore_backend, IgnoreBackend::Naive);
        assert_eq!(config.diagram.format, DiagramFormat::Mermaid);
        assert_eq!(config.diagram.max_classes, 10);
        assert!(!config.diagram.group_by_module);
        assert!(config.diagram.public_only);
    }

    #[test]
    fn test_load_unknown_format_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[diagram]\nformat = \"graphviz\"").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_load_negative_max_classes_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[diagram]\nmax_classes = -5").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/classmap.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/classmap.toml")).unwrap();
        assert_eq!(config.diagram.max_classes, 40);
    }

    #[test]
    fn test_validation_empty_include() {
        let mut config = Config::default();
        config.analysis.include.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_options_zero_means_unlimited() {
        let mut config = Config::default();
        config.diagram.max_classes = 0;
        let options = config.diagram.options().unwrap();
        assert_eq!(options.max_classes, 0);
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = Config::default();
        config
            .merge_cli(
                vec!["migrations/**".to_string()],
                Some("mermaid"),
                Some(7),
                Some(false),
                true,
            )
            .unwrap();

        assert!(config.analysis.exclude.contains(&"migrations/**".to_string()));
        assert_eq!(config.diagram.format, DiagramFormat::Mermaid);
        assert_eq!(config.diagram.max_classes, 7);
        assert!(!config.diagram.group_by_module);
        assert!(config.diagram.public_only);
    }

    #[test]
    fn test_merge_cli_unsupported_format() {
        let mut config = Config::default();
        let err = config
            .merge_cli(vec![], Some("dot"), None, None, false)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_merge_cli_keeps_defaults() {
        let mut config = Config::default();
        config.merge_cli(vec![], None, None, None, false).unwrap();
        assert_eq!(config.diagram.format, DiagramFormat::PlantUml);
        assert!(config.diagram.group_by_module);
        assert!(!config.diagram.public_only);
    }
}
