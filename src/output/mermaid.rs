// Mermaid class diagram rendering

use crate::analysis::{CallableMember, DiagramView, TypeView};
use crate::output::{
    diagram_ids, group_by_module, member_signature, sanitize_id, Classifier, DiagramFormat,
    DiagramRenderer, RenderOptions, Visibility,
};
use crate::parser::RelationshipKind;
use std::collections::HashMap;

/// Renders fenced `classDiagram` blocks
#[derive(Debug, Default)]
pub struct MermaidRenderer;

impl MermaidRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_type(
        &self,
        t: &TypeView<'_>,
        ids: &HashMap<&str, String>,
        indent: &str,
        lines: &mut Vec<String>,
    ) {
        let Some(id) = ids.get(t.entity.qualified_name.as_str()) else {
            return;
        };

        if t.members.is_empty() {
            lines.push(format!("{}class {}", indent, id));
            return;
        }

        lines.push(format!("{}class {} {{", indent, id));
        for member in &t.members {
            lines.push(format!("{}    {}", indent, member_line(member)));
        }
        lines.push(format!("{}}}", indent));
    }
}

/// `+helper(x)$`
fn member_line(member: &CallableMember) -> String {
    let classifier = match Classifier::of(member) {
        Some(Classifier::Static) => "$",
        Some(Classifier::Abstract) => "*",
        None => "",
    };
    format!(
        "{}{}{}",
        Visibility::of(member).to_char(),
        escape_label(&member_signature(member)),
        classifier
    )
}

/// Angle brackets are Mermaid's generic markers
fn escape_label(s: &str) -> String {
    s.replace(['<', '>'], "~").replace('"', "'")
}

impl DiagramRenderer for MermaidRenderer {
    fn format(&self) -> DiagramFormat {
        DiagramFormat::Mermaid
    }

    fn render(&self, view: &DiagramView<'_>, options: &RenderOptions) -> String {
        let ids = diagram_ids(view);
        let mut lines = vec!["```mermaid".to_string(), "classDiagram".to_string()];

        if options.group_by_module {
            for (module, types) in group_by_module(view) {
                let name = if module.is_empty() { "root" } else { module };
                lines.push(format!("    namespace {} {{", sanitize_id(name)));
                for t in types {
                    self.render_type(t, &ids, "        ", &mut lines);
                }
                lines.push("    }".to_string());
            }
        } else {
            for t in &view.types {
                self.render_type(t, &ids, "    ", &mut lines);
            }
        }

        for rel in &view.relationships {
            let (Some(source), Some(target)) = (
                ids.get(rel.source.as_str()),
                ids.get(rel.target.as_str()),
            ) else {
                continue;
            };
            let label = rel
                .label
                .as_deref()
                .map(|l| format!(" : {}", escape_label(l)))
                .unwrap_or_default();
            let line = match rel.kind {
                RelationshipKind::Inheritance => format!("    {} <|-- {}", target, source),
                RelationshipKind::Composition => format!("    {} *-- {}{}", source, target, label),
                RelationshipKind::Aggregation => format!("    {} o-- {}{}", source, target, label),
            };
            lines.push(line);
        }

        lines.push("```".to_string());
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}
