// Classification of attribute assignments into relationship candidates

use crate::parser::ast::Parameter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tree_sitter::Node;

/// Names that never become relationship targets
const IGNORED_TYPE_NAMES: &[&str] = &[
    "None", "int", "str", "float", "bool", "bytes", "complex", "dict", "list", "set", "tuple",
    "frozenset", "object", "type", "Any", "Optional", "Union", "List", "Dict", "Set", "Tuple",
    "FrozenSet", "Type", "Callable", "Iterable", "Iterator", "Sequence", "Mapping",
    "MutableMapping", "MutableSequence", "ClassVar", "Final", "Literal", "Annotated", "Self",
];

/// Kind of a model relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Inheritance,
    Composition,
    Aggregation,
}

impl RelationshipKind {
    /// Ownership strength; a stronger edge replaces a weaker one
    pub fn strength(&self) -> u8 {
        match self {
            RelationshipKind::Inheritance => 3,
            RelationshipKind::Composition => 2,
            RelationshipKind::Aggregation => 1,
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelationshipKind::Inheritance => "inheritance",
            RelationshipKind::Composition => "composition",
            RelationshipKind::Aggregation => "aggregation",
        };
        write!(f, "{}", s)
    }
}

/// How sure the heuristic is about an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    High,
}

/// What the right-hand side of an attribute assignment looked like
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeSource {
    /// `self.x = Engine(...)` or `self.x = parts.Engine()`
    ConstructorCall { callee: String },
    /// `self.x = engine` where `engine` is a parameter of the method
    ParameterReference {
        parameter: String,
        annotation: Option<String>,
    },
    /// `self.x = Engine` where `Engine` was imported (aliases mapped back)
    ImportedName { name: String },
    /// `self.x: Engine = ...` or a class-level `x: Engine`
    Annotation { annotation: String },
}

impl AttributeSource {
    pub fn kind(&self) -> RelationshipKind {
        match self {
            AttributeSource::ConstructorCall { .. } => RelationshipKind::Composition,
            _ => RelationshipKind::Aggregation,
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            AttributeSource::ConstructorCall { .. } => Confidence::High,
            _ => Confidence::Low,
        }
    }

    /// Type references the assembler should try to resolve, in order
    pub fn candidate_targets(&self) -> Vec<String> {
        match self {
            AttributeSource::ConstructorCall { callee } => vec![callee.clone()],
            AttributeSource::ParameterReference {
                annotation: Some(annotation),
                ..
            } => annotation_type_names(annotation),
            AttributeSource::ParameterReference { parameter, .. } => {
                let name = pascal_case(parameter);
                if name.is_empty() {
                    Vec::new()
                } else {
                    vec![name]
                }
            }
            AttributeSource::ImportedName { name } => vec![name.clone()],
            AttributeSource::Annotation { annotation } => annotation_type_names(annotation),
        }
    }
}

/// Names visible to the right-hand side of an assignment
pub struct Scope<'a> {
    /// Method parameters other than the receiver
    pub parameters: &'a [Parameter],
    /// Imported names as used in the unit, mapped to the imported name
    pub imported: &'a HashMap<String, String>,
    /// Whether bare names may be classified (false in a class body)
    pub allow_references: bool,
}

impl<'a> Scope<'a> {
    pub fn method(parameters: &'a [Parameter], imported: &'a HashMap<String, String>) -> Self {
        Self {
            parameters,
            imported,
            allow_references: true,
        }
    }

    pub fn class_body(imported: &'a HashMap<String, String>) -> Self {
        Self {
            parameters: &[],
            imported,
            allow_references: false,
        }
    }

    fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Map the first segment of a reference back through import aliases:
    /// `Motor` -> `Engine`, `p.Engine` -> `parts.Engine`
    fn unalias(&self, reference: &str) -> String {
        let (head, rest) = match reference.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (reference, None),
        };
        let head = self.imported.get(head).map(String::as_str).unwrap_or(head);
        match rest {
            Some(rest) => format!("{}.{}", head, rest),
            None => head.to_string(),
        }
    }
}

/// Classify the value assigned to an attribute
///
/// Returns `None` for shapes that carry no relationship (literals,
/// arithmetic, lowercase calls, subscripts).
pub fn classify_value(value: &Node, source: &[u8], scope: &Scope<'_>) -> Option<AttributeSource> {
    match value.kind() {
        "call" => {
            let function = value.child_by_field_name("function")?;
            if !matches!(function.kind(), "identifier" | "attribute") {
                return None;
            }
            let callee = scope.unalias(function.utf8_text(source).ok()?);
            if is_type_like(&callee) {
                Some(AttributeSource::ConstructorCall { callee })
            } else {
                None
            }
        }
        "identifier" if scope.allow_references => {
            let name = value.utf8_text(source).ok()?;
            if let Some(param) = scope.parameter(name) {
                return Some(AttributeSource::ParameterReference {
                    parameter: param.name.clone(),
                    annotation: param.type_hint.clone(),
                });
            }
            scope
                .imported
                .get(name)
                .map(|original| AttributeSource::ImportedName {
                    name: original.clone(),
                })
        }
        "parenthesized_expression" => {
            let mut cursor = value.walk();
            let inner = value.named_children(&mut cursor).find(|c| c.kind() != "comment")?;
            classify_value(&inner, source, scope)
        }
        _ => None,
    }
}

/// Whether a (possibly dotted) name follows the class naming convention
///
/// The last segment must start with an uppercase letter and must not be an
/// all-caps constant such as `DEFAULT_TIMEOUT`.
pub fn is_type_like(name: &str) -> bool {
    let last = name.rsplit('.').next().unwrap_or(name);
    let mut chars = last.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            last.len() == 1 || last.chars().any(|c| c.is_ascii_lowercase())
        }
        _ => false,
    }
}

/// Type names mentioned in an annotation, without builtins and typing wrappers
///
/// `Optional["Engine"]` gives `["Engine"]`, `Dict[str, parts.Wheel]` gives
/// `["parts.Wheel"]`.
pub fn annotation_type_names(annotation: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, names: &mut Vec<String>| {
        let token = current.trim_matches('.').to_string();
        current.clear();
        if token.is_empty() || token.starts_with(|c: char| c.is_ascii_digit()) {
            return;
        }
        let last = token.rsplit('.').next().unwrap_or(&token);
        if IGNORED_TYPE_NAMES.contains(&last) || !is_type_like(&token) {
            return;
        }
        if !names.contains(&token) {
            names.push(token);
        }
    };

    for c in annotation.chars() {
        if c.is_alphanumeric() || c == '_' || c == '.' {
            current.push(c);
        } else {
            flush(&mut current, &mut names);
        }
    }
    flush(&mut current, &mut names);

    names
}

/// `order_line` -> `OrderLine`
pub fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn classify(rhs: &str, params: &[Parameter], imported: &[(&str, &str)]) -> Option<AttributeSource> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::language()).unwrap();
        let text = format!("x = {}\n", rhs);
        let tree = parser.parse(&text, None).unwrap();
        let root = tree.root_node();
        let statement = root.named_child(0).unwrap();
        let assignment = statement.named_child(0).unwrap();
        let value = assignment.child_by_field_name("right").unwrap();

        let imported: HashMap<String, String> = imported
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let scope = Scope::method(params, &imported);
        classify_value(&value, text.as_bytes(), &scope)
    }

    #[test]
    fn test_constructor_call() {
        let source = classify("Engine(4)", &[], &[]).unwrap();
        assert_eq!(
            source,
            AttributeSource::ConstructorCall {
                callee: "Engine".to_string()
            }
        );
        assert_eq!(source.kind(), RelationshipKind::Composition);
        assert_eq!(source.confidence(), Confidence::High);
    }

    #[test]
    fn test_dotted_constructor_call() {
        let source = classify("parts.Engine()", &[], &[]).unwrap();
        assert_eq!(source.candidate_targets(), vec!["parts.Engine".to_string()]);
    }

    #[test]
    fn test_aliased_constructor_call() {
        let source = classify("Motor()", &[], &[("Motor", "Engine")]).unwrap();
        assert_eq!(
            source,
            AttributeSource::ConstructorCall {
                callee: "Engine".to_string()
            }
        );

        let dotted = classify("p.Engine()", &[], &[("p", "parts")]).unwrap();
        assert_eq!(dotted.candidate_targets(), vec!["parts.Engine".to_string()]);
    }

    #[test]
    fn test_lowercase_call_discarded() {
        assert!(classify("make_engine()", &[], &[]).is_none());
        assert!(classify("CONSTANT()", &[], &[]).is_none());
    }

    #[test]
    fn test_literals_discarded() {
        assert!(classify("0", &[], &[]).is_none());
        assert!(classify("[]", &[], &[]).is_none());
        assert!(classify("a + b", &[], &[]).is_none());
        assert!(classify("\"text\"", &[], &[]).is_none());
    }

    #[test]
    fn test_parameter_reference() {
        let params = vec![Parameter::new("order_line")];
        let source = classify("order_line", &params, &[]).unwrap();
        assert_eq!(source.kind(), RelationshipKind::Aggregation);
        assert_eq!(source.confidence(), Confidence::Low);
        assert_eq!(source.candidate_targets(), vec!["OrderLine".to_string()]);
    }

    #[test]
    fn test_annotated_parameter_reference() {
        let params = vec![Parameter::with_type("engine", "Optional[Motor]")];
        let source = classify("engine", &params, &[]).unwrap();
        assert_eq!(source.candidate_targets(), vec!["Motor".to_string()]);
    }

    #[test]
    fn test_imported_name_alias_mapped_back() {
        let source = classify("Eng", &[], &[("Eng", "Engine")]).unwrap();
        assert_eq!(
            source,
            AttributeSource::ImportedName {
                name: "Engine".to_string()
            }
        );
        assert_eq!(source.kind(), RelationshipKind::Aggregation);
    }

    #[test]
    fn test_unknown_identifier_discarded() {
        assert!(classify("something", &[], &[]).is_none());
    }

    #[test]
    fn test_parenthesized() {
        assert!(matches!(
            classify("(Engine())", &[], &[]),
            Some(AttributeSource::ConstructorCall { .. })
        ));
    }

    #[test]
    fn test_is_type_like() {
        assert!(is_type_like("Engine"));
        assert!(is_type_like("B"));
        assert!(is_type_like("pkg.mod.Engine"));
        assert!(!is_type_like("engine"));
        assert!(!is_type_like("MAX_SIZE"));
        assert!(!is_type_like("Engine.build"));
    }

    #[test]
    fn test_annotation_type_names() {
        assert_eq!(annotation_type_names("Optional[\"Engine\"]"), vec!["Engine"]);
        assert_eq!(
            annotation_type_names("Dict[str, parts.Wheel]"),
            vec!["parts.Wheel"]
        );
        assert_eq!(
            annotation_type_names("Union[Car, Truck, Car]"),
            vec!["Car", "Truck"]
        );
        assert!(annotation_type_names("List[int]").is_empty());
        assert!(annotation_type_names("typing.Optional[str]").is_empty());
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("engine"), "Engine");
        assert_eq!(pascal_case("order_line"), "OrderLine");
        assert_eq!(pascal_case("_db"), "Db");
        assert_eq!(pascal_case("_"), "");
    }

    #[test]
    fn test_kind_strength_order() {
        assert!(RelationshipKind::Composition.strength() > RelationshipKind::Aggregation.strength());
    }
}
