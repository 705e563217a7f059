// Raw declarations extracted from a single Python source unit
//
// Nothing here is resolved across units: base classes and attribute targets
// are kept as the text written in the source.

use crate::parser::classify::AttributeSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One source file handed to the extractor
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    /// Dotted module path, unique within a run
    pub module: String,
    /// File path as discovered
    pub path: PathBuf,
    /// Decoded source text
    pub text: String,
}

impl SourceUnit {
    pub fn new(module: impl Into<String>, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A position in a source file (both 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Everything the extractor found in one unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDeclarations {
    pub module: String,
    pub path: PathBuf,
    /// Module-level docstring
    pub docstring: Option<String>,
    pub imports: Vec<Import>,
    pub classes: Vec<Class>,
    /// Module-level functions (not methods, not nested)
    pub functions: Vec<Function>,
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitDeclarations {
    pub fn new(module: String, path: PathBuf) -> Self {
        Self {
            module,
            path,
            docstring: None,
            imports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// A unit that could not be parsed contributes only its diagnostic
    pub fn failed(unit: &SourceUnit, line: Option<usize>, message: impl Into<String>) -> Self {
        let mut decls = Self::new(unit.module.clone(), unit.path.clone());
        decls
            .diagnostics
            .push(Diagnostic::parse_failure(&unit.module, line, message));
        decls
    }

    pub fn has_parse_failure(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ParseFailure)
    }

    /// Check if the unit declares anything
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty() && self.imports.is_empty()
    }
}

/// An import statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Import {
    /// The module being imported
    pub module: String,
    /// Specific names imported (for `from x import y`)
    pub names: Vec<ImportedName>,
    /// Import kind
    pub kind: ImportKind,
    /// Line number
    pub line: usize,
}

impl Import {
    /// Create a simple `import x` style import
    pub fn simple(module: &str, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names: vec![ImportedName::new(module)],
            kind: ImportKind::Direct,
            line,
        }
    }

    /// Create a `from x import y` style import
    pub fn from_import(module: &str, names: Vec<ImportedName>, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::From,
            line,
        }
    }

    /// Create a relative import
    pub fn relative(module: &str, names: Vec<ImportedName>, level: usize, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::Relative { level },
            line,
        }
    }

    /// The import as it would be written in source
    pub fn statement(&self) -> String {
        let names = self
            .names
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        match &self.kind {
            ImportKind::Direct => format!("import {}", names),
            ImportKind::From => format!("from {} import {}", self.module, names),
            ImportKind::Relative { level } => {
                format!("from {}{} import {}", ".".repeat(*level), self.module, names)
            }
        }
    }
}

/// A single imported name with optional alias
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportedName {
    /// Original name
    pub name: String,
    /// Alias (from `as` clause)
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    /// Get the name as used in code (alias if present, otherwise original)
    pub fn used_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl std::fmt::Display for ImportedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", self.name, alias),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Kind of import statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import x` or `import x as y`
    Direct,
    /// `from x import y`
    From,
    /// `from . import y` or `from ..x import y`
    Relative { level: usize },
}

impl ImportKind {
    pub fn is_relative(&self) -> bool {
        matches!(self, ImportKind::Relative { .. })
    }
}

/// A class definition
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    /// Class name
    pub name: String,
    /// Class docstring
    pub docstring: Option<String>,
    /// Base classes (as written, not resolved)
    pub bases: Vec<String>,
    /// Decorators applied to the class, verbatim without `@`
    pub decorators: Vec<String>,
    /// Methods in source order
    pub methods: Vec<Function>,
    /// Class and instance attributes
    pub attributes: Vec<Attribute>,
    /// Relationship candidates seen in attribute assignments
    pub observations: Vec<AttributeObservation>,
    pub position: Position,
    pub line_end: usize,
}

impl Class {
    pub fn new(name: &str, position: Position) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            bases: Vec::new(),
            decorators: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            observations: Vec::new(),
            position,
            line_end: position.line,
        }
    }

    /// Record an attribute unless one with the same name and scope exists
    pub fn add_attribute(&mut self, attribute: Attribute) {
        let exists = self
            .attributes
            .iter()
            .any(|a| a.name == attribute.name && a.is_instance == attribute.is_instance);
        if !exists {
            self.attributes.push(attribute);
        }
    }

    /// Record an observation unless the same attribute already has the same shape
    pub fn add_observation(&mut self, observation: AttributeObservation) {
        let exists = self
            .observations
            .iter()
            .any(|o| o.attribute == observation.attribute && o.source == observation.source);
        if !exists {
            self.observations.push(observation);
        }
    }
}

/// A class or instance attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    /// Attribute name (`x` for `self.x`)
    pub name: String,
    /// Annotation, or the constructor called in the assignment
    pub type_hint: Option<String>,
    pub line: usize,
    /// `self.x` rather than a class-body assignment
    pub is_instance: bool,
    /// First seen inside `__init__`
    pub declared_in_init: bool,
}

impl Attribute {
    pub fn new(name: &str, line: usize, is_instance: bool) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            line,
            is_instance,
            declared_in_init: false,
        }
    }
}

/// A relationship candidate: `attribute` was assigned from `source`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeObservation {
    pub attribute: String,
    pub source: AttributeSource,
    pub line: usize,
}

/// A function or method definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Function docstring
    pub docstring: Option<String>,
    /// Parameters with types and defaults
    pub parameters: Vec<Parameter>,
    /// Return type annotation
    pub return_type: Option<String>,
    /// Decorators, verbatim without `@`
    pub decorators: Vec<String>,
    /// Whether this is an async function
    pub is_async: bool,
    pub position: Position,
    pub line_end: usize,
}

impl Function {
    pub fn new(name: &str, position: Position) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            parameters: Vec::new(),
            return_type: None,
            decorators: Vec::new(),
            is_async: false,
            position,
            line_end: position.line,
        }
    }

    fn has_decorator(&self, name: &str) -> bool {
        self.decorators.iter().any(|d| {
            let base = decorator_name(d);
            base == name || base.ends_with(&format!(".{}", name))
        })
    }

    /// Check if this is a property
    pub fn is_property(&self) -> bool {
        self.has_decorator("property") || self.decorators.iter().any(|d| d.ends_with(".getter"))
    }

    /// Check if this is a classmethod
    pub fn is_classmethod(&self) -> bool {
        self.has_decorator("classmethod")
    }

    /// Check if this is a staticmethod
    pub fn is_staticmethod(&self) -> bool {
        self.has_decorator("staticmethod")
    }

    /// Check if this is marked abstract
    pub fn is_abstract(&self) -> bool {
        self.has_decorator("abstractmethod")
    }

    /// First parameter when it is bound implicitly (`self` or `cls`)
    pub fn implicit_receiver(&self) -> Option<&Parameter> {
        if self.is_staticmethod() {
            return None;
        }
        self.parameters
            .first()
            .filter(|p| matches!(p.kind, ParameterKind::Regular | ParameterKind::PositionalOnly))
    }

    /// Receiver of an instance method
    pub fn instance_receiver(&self) -> Option<&str> {
        if self.is_classmethod() {
            return None;
        }
        self.implicit_receiver().map(|p| p.name.as_str())
    }

    /// Parameters a caller passes explicitly, for use on a method
    pub fn explicit_parameters(&self) -> &[Parameter] {
        match self.implicit_receiver() {
            Some(_) => &self.parameters[1..],
            None => &self.parameters,
        }
    }
}

/// Decorator text up to its argument list: `lru_cache(maxsize=2)` -> `lru_cache`
pub fn decorator_name(decorator: &str) -> &str {
    match decorator.find('(') {
        Some(idx) => decorator[..idx].trim(),
        None => decorator.trim(),
    }
}

/// A function parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Type annotation
    pub type_hint: Option<String>,
    /// Default value as string
    pub default: Option<String>,
    /// Parameter kind
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            default: None,
            kind: ParameterKind::Regular,
        }
    }

    pub fn with_type(name: &str, type_hint: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: Some(type_hint.to_string()),
            default: None,
            kind: ParameterKind::Regular,
        }
    }
}

/// Kind of function parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Regular positional or keyword parameter
    Regular,
    /// *args
    Args,
    /// **kwargs
    Kwargs,
    /// Positional-only (before /)
    PositionalOnly,
    /// Keyword-only (after *)
    KeywordOnly,
}

/// Kind of problem recorded during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The unit's text did not parse; it contributed nothing
    ParseFailure,
    /// A second declaration claimed an existing qualified name and was dropped
    NameCollision,
}

/// A recoverable problem; never aborts the run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub module: String,
    pub message: String,
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn parse_failure(module: &str, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::ParseFailure,
            module: module.to_string(),
            message: message.into(),
            line,
        }
    }

    pub fn name_collision(qualified_name: &str, module: &str, line: usize) -> Self {
        Self {
            kind: DiagnosticKind::NameCollision,
            module: module.to_string(),
            message: format!("duplicate declaration of {} ignored", qualified_name),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.module, line, self.message),
            None => write!(f, "{}: {}", self.module, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_statements() {
        assert_eq!(Import::simple("os", 1).statement(), "import os");

        let imp = Import::from_import(
            "pathlib",
            vec![ImportedName::new("Path"), ImportedName::with_alias("PurePath", "PP")],
            2,
        );
        assert_eq!(imp.statement(), "from pathlib import Path, PurePath as PP");

        let rel = Import::relative("", vec![ImportedName::new("local_mod")], 1, 3);
        assert_eq!(rel.statement(), "from . import local_mod");
        assert!(rel.kind.is_relative());
    }

    #[test]
    fn test_imported_name_used_name() {
        let name = ImportedName::new("foo");
        assert_eq!(name.used_name(), "foo");

        let aliased = ImportedName::with_alias("foo", "bar");
        assert_eq!(aliased.used_name(), "bar");
    }

    #[test]
    fn test_add_attribute_first_wins() {
        let mut class = Class::new("A", Position::new(1, 1));
        class.add_attribute(Attribute::new("x", 3, true));
        class.add_attribute(Attribute::new("x", 9, true));
        class.add_attribute(Attribute::new("x", 2, false));

        assert_eq!(class.attributes.len(), 2);
        assert_eq!(class.attributes[0].line, 3);
    }

    #[test]
    fn test_decorator_matching() {
        let mut func = Function::new("build", Position::new(1, 1));
        func.decorators.push("abc.abstractmethod".to_string());
        func.decorators.push("functools.lru_cache(maxsize=None)".to_string());
        assert!(func.is_abstract());
        assert!(!func.is_staticmethod());
        assert_eq!(decorator_name(&func.decorators[1]), "functools.lru_cache");
    }

    #[test]
    fn test_receivers() {
        let mut method = Function::new("run", Position::new(1, 1));
        method.parameters.push(Parameter::new("self"));
        method.parameters.push(Parameter::new("job"));
        assert_eq!(method.instance_receiver(), Some("self"));
        assert_eq!(method.explicit_parameters().len(), 1);

        let mut factory = method.clone();
        factory.decorators.push("classmethod".to_string());
        assert_eq!(factory.instance_receiver(), None);
        assert_eq!(factory.explicit_parameters().len(), 1);

        let mut helper = method.clone();
        helper.decorators.push("staticmethod".to_string());
        assert_eq!(helper.instance_receiver(), None);
        assert_eq!(helper.explicit_parameters().len(), 2);
    }

    #[test]
    fn test_failed_unit() {
        let unit = SourceUnit::new("pkg.broken", "pkg/broken.py", "def (");
        let decls = UnitDeclarations::failed(&unit, Some(1), "syntax error");
        assert!(decls.is_empty());
        assert!(decls.has_parse_failure());
        assert_eq!(decls.diagnostics[0].to_string(), "pkg.broken:1: syntax error");
    }
}
