// Output generation: diagram renderers and the JSON report

pub mod mermaid;
pub mod plantuml;
pub mod report;

pub use mermaid::MermaidRenderer;
pub use plantuml::PlantUmlRenderer;
pub use report::Report;

use crate::analysis::{CallableMember, DiagramView, TypeView};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// Diagram grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    #[default]
    PlantUml,
    Mermaid,
}

impl DiagramFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["plantuml", "mermaid"]
    }
}

impl FromStr for DiagramFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plantuml" => Ok(DiagramFormat::PlantUml),
            "mermaid" => Ok(DiagramFormat::Mermaid),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagramFormat::PlantUml => write!(f, "plantuml"),
            DiagramFormat::Mermaid => write!(f, "mermaid"),
        }
    }
}

/// Rendered diagram text tagged with its grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagram {
    pub format: DiagramFormat,
    pub text: String,
}

/// Rendering options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// One package/namespace block per module
    pub group_by_module: bool,
}

/// Renders a diagram view in one grammar
///
/// Members are rendered exactly as the view lists them.
pub trait DiagramRenderer {
    fn format(&self) -> DiagramFormat;

    fn render(&self, view: &DiagramView<'_>, options: &RenderOptions) -> String;
}

/// Get the renderer for a format
pub fn renderer_for(format: DiagramFormat) -> Box<dyn DiagramRenderer> {
    match format {
        DiagramFormat::PlantUml => Box::new(PlantUmlRenderer::new()),
        DiagramFormat::Mermaid => Box::new(MermaidRenderer::new()),
    }
}

/// Member visibility marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn of(member: &CallableMember) -> Self {
        if member.is_public() {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Private => '-',
        }
    }
}

/// Method classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    Abstract,
    Static,
}

impl Classifier {
    /// Abstract wins when both apply
    pub fn of(member: &CallableMember) -> Option<Self> {
        if member.is_abstract {
            Some(Classifier::Abstract)
        } else if member.is_static {
            Some(Classifier::Static)
        } else {
            None
        }
    }
}

/// Sanitize a string for use as a diagram node ID
///
/// Non-ASCII characters are spelled out as `_uXXXX` so that distinct names
/// stay distinct.
pub fn sanitize_id(s: &str) -> String {
    let mut id = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            id.push(c);
        } else if c.is_ascii() {
            id.push('_');
        } else {
            id.push_str(&format!("_u{:04x}", c as u32));
        }
    }
    if id.is_empty() || id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    id
}

/// Diagram ID per selected type: the local name when it is unique in the
/// view, otherwise the sanitized qualified name
///
/// IDs are unique within the view; a clash gets a numeric suffix, assigned
/// in selection order.
pub fn diagram_ids<'m>(view: &DiagramView<'m>) -> HashMap<&'m str, String> {
    let mut local_counts: HashMap<&str, usize> = HashMap::new();
    for t in &view.types {
        *local_counts.entry(t.entity.name.as_str()).or_default() += 1;
    }

    let mut used: HashSet<String> = HashSet::with_capacity(view.types.len());
    let mut ids = HashMap::with_capacity(view.types.len());
    for t in &view.types {
        let base = if local_counts[t.entity.name.as_str()] == 1 {
            sanitize_id(&t.entity.name)
        } else {
            sanitize_id(&t.entity.qualified_name)
        };

        let mut id = base.clone();
        let mut n = 2;
        while !used.insert(id.clone()) {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        ids.insert(t.entity.qualified_name.as_str(), id);
    }
    ids
}

/// Selected types grouped by module, modules sorted, selection order kept
pub fn group_by_module<'v, 'm>(view: &'v DiagramView<'m>) -> BTreeMap<&'m str, Vec<&'v TypeView<'m>>> {
    let mut groups: BTreeMap<&'m str, Vec<&'v TypeView<'m>>> = BTreeMap::new();
    for t in &view.types {
        groups.entry(t.entity.module.as_str()).or_default().push(t);
    }
    groups
}

/// `name(a, b)`
pub fn member_signature(member: &CallableMember) -> String {
    format!("{}({})", member.name, member.parameters.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{RankOptions, SignificanceRanker};

    #[test]
    fn test_format_parse() {
        assert_eq!(DiagramFormat::from_str("plantuml").unwrap(), DiagramFormat::PlantUml);
        assert_eq!(DiagramFormat::from_str("Mermaid").unwrap(), DiagramFormat::Mermaid);
        assert!(matches!(
            DiagramFormat::from_str("graphviz"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_display_and_serde() {
        assert_eq!(DiagramFormat::PlantUml.to_string(), "plantuml");
        assert_eq!(serde_json::to_string(&DiagramFormat::PlantUml).unwrap(), "\"plantuml\"");
        assert_eq!(serde_json::to_string(&DiagramFormat::Mermaid).unwrap(), "\"mermaid\"");
        let parsed: DiagramFormat = serde_json::from_str("\"plantuml\"").unwrap();
        assert_eq!(parsed, DiagramFormat::PlantUml);
        assert_eq!(DiagramFormat::variants().len(), 2);
    }

    #[test]
    fn test_renderer_for() {
        assert_eq!(renderer_for(DiagramFormat::PlantUml).format(), DiagramFormat::PlantUml);
        assert_eq!(renderer_for(DiagramFormat::Mermaid).format(), DiagramFormat::Mermaid);
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("shop.cart.Cart"), "shop_cart_Cart");
        assert_eq!(sanitize_id("my-module"), "my_module");
        assert_eq!(sanitize_id("2fa.Token"), "_2fa_Token");
        assert_eq!(sanitize_id(""), "_");
        assert_eq!(sanitize_id("Café"), "Caf_u00e9");
        assert_ne!(sanitize_id("Café"), sanitize_id("Cafë"));
    }

    fn model(units: &[(&str, &str)]) -> crate::analysis::ProjectModel {
        let mut extractor = crate::parser::UnitExtractor::new().unwrap();
        let decls = units
            .iter()
            .map(|(m, t)| extractor.extract(&crate::parser::SourceUnit::new(*m, format!("{}.py", m), *t)))
            .collect();
        crate::analysis::ModelAssembler::new().assemble(decls)
    }

    #[test]
    fn test_diagram_ids_are_unique() {
        let model = model(&[
            ("a", "class Config:\n    pass\n"),
            ("b", "class Config:\n    pass\n"),
            ("c", "class a_Config:\n    pass\n"),
        ]);
        let view = SignificanceRanker::new(RankOptions {
            max_types: 0,
            public_only: false,
            group_by_module: false,
        })
        .select(&model);
        let ids = diagram_ids(&view);

        assert_eq!(ids["a.Config"], "a_Config");
        assert_eq!(ids["b.Config"], "b_Config");
        assert_eq!(ids["c.a_Config"], "a_Config_2");
        let distinct: HashSet<&String> = ids.values().collect();
        assert_eq!(distinct.len(), 3);
    }
}
