// Project model: the assembled structure of an analyzed codebase

use crate::parser::{
    Attribute, Class, Confidence, Diagnostic, DiagnosticKind, Function, Import, Position,
    RelationshipKind,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// The project-wide model
///
/// Built once by the assembler and never mutated afterwards. Modules are
/// sorted by module path and relationships by (kind, source, target, label).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectModel {
    modules: Vec<ModuleModel>,
    relationships: Vec<Relationship>,
    diagnostics: Vec<Diagnostic>,
    /// Qualified name -> (module index, type index)
    #[serde(skip)]
    index: HashMap<String, (usize, usize)>,
}

impl ProjectModel {
    pub(crate) fn new(
        modules: Vec<ModuleModel>,
        relationships: Vec<Relationship>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let mut index = HashMap::new();
        for (m, module) in modules.iter().enumerate() {
            for (t, entity) in module.types.iter().enumerate() {
                index.insert(entity.qualified_name.clone(), (m, t));
            }
        }

        Self {
            modules,
            relationships,
            diagnostics,
            index,
        }
    }

    /// Modules sorted by module path
    pub fn modules(&self) -> &[ModuleModel] {
        &self.modules
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Look up a type by qualified name
    pub fn get(&self, qualified_name: &str) -> Option<&TypeEntity> {
        let &(m, t) = self.index.get(qualified_name)?;
        self.modules.get(m)?.types.get(t)
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.index.contains_key(qualified_name)
    }

    /// Find a module by its dotted path
    pub fn module(&self, name: &str) -> Option<&ModuleModel> {
        self.modules
            .binary_search_by(|m| m.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.modules[i])
    }

    /// Iterate over all types in module order
    pub fn types(&self) -> impl Iterator<Item = &TypeEntity> {
        self.modules.iter().flat_map(|m| m.types.iter())
    }

    pub fn parse_failures(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::ParseFailure)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.modules.iter().all(|m| m.functions.is_empty())
    }

    /// Get statistics about the model
    pub fn stats(&self) -> ModelStats {
        ModelStats {
            modules: self.modules.len(),
            types: self.index.len(),
            methods: self.types().map(|t| t.members.len()).sum(),
            functions: self.modules.iter().map(|m| m.functions.len()).sum(),
            imports: self.modules.iter().map(|m| m.imports.len()).sum(),
            relationships: self.relationships.len(),
            parse_failures: self.parse_failures().count(),
        }
    }
}

/// One module of the project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleModel {
    /// Dotted module path
    pub name: String,
    /// File the module was read from
    pub path: PathBuf,
    pub docstring: Option<String>,
    pub imports: Vec<Import>,
    /// Free functions in source order
    pub functions: Vec<CallableMember>,
    /// Types in source order
    pub types: Vec<TypeEntity>,
}

impl ModuleModel {
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
            docstring: None,
            imports: Vec::new(),
            functions: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Import statements as written
    pub fn import_statements(&self) -> Vec<String> {
        self.imports.iter().map(|i| i.statement()).collect()
    }
}

/// A class in the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeEntity {
    /// `module.Local`, unique in the model
    pub qualified_name: String,
    /// Name as declared
    pub name: String,
    /// Owning module
    pub module: String,
    pub docstring: Option<String>,
    /// Base classes as written, resolved or not
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    /// Methods in source order
    pub members: Vec<CallableMember>,
    pub attributes: Vec<Attribute>,
    pub position: Position,
    pub line_end: usize,
}

impl TypeEntity {
    /// Create from an extracted class
    pub fn from_class(class: &Class, module: &str, qualified_name: &str) -> Self {
        let mut members: Vec<CallableMember> = Vec::with_capacity(class.methods.len());
        for method in &class.methods {
            let member = CallableMember::from_function(method, Some(qualified_name));
            if !members.iter().any(|m| m.name == member.name && m.position == member.position) {
                members.push(member);
            }
        }
        members.sort_by_key(|m| m.position);

        Self {
            qualified_name: qualified_name.to_string(),
            name: class.name.clone(),
            module: module.to_string(),
            docstring: class.docstring.clone(),
            bases: class.bases.clone(),
            decorators: class.decorators.clone(),
            members,
            attributes: class.attributes.clone(),
            position: class.position,
            line_end: class.line_end,
        }
    }

    /// Members visible under the given filter
    pub fn visible_members(&self, public_only: bool) -> impl Iterator<Item = &CallableMember> {
        self.members
            .iter()
            .filter(move |m| !public_only || m.is_public())
    }
}

/// A method or free function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallableMember {
    pub name: String,
    /// Qualified name of the enclosing type, `None` for free functions
    pub owner: Option<String>,
    /// Parameters a caller passes (the implicit receiver is left out)
    pub parameters: Vec<String>,
    pub arity: usize,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub is_static: bool,
    pub is_classmethod: bool,
    pub is_abstract: bool,
    pub is_property: bool,
    /// Decorators verbatim, arguments included
    pub decorators: Vec<String>,
    pub position: Position,
}

impl CallableMember {
    /// Create from an extracted function
    pub fn from_function(func: &Function, owner: Option<&str>) -> Self {
        let params = match owner {
            Some(_) => func.explicit_parameters(),
            None => &func.parameters[..],
        };
        let parameters: Vec<String> = params.iter().map(|p| p.name.clone()).collect();

        Self {
            name: func.name.clone(),
            owner: owner.map(str::to_string),
            arity: parameters.len(),
            parameters,
            return_type: func.return_type.clone(),
            is_async: func.is_async,
            is_static: func.is_staticmethod(),
            is_classmethod: func.is_classmethod(),
            is_abstract: func.is_abstract(),
            is_property: func.is_property(),
            decorators: func.decorators.clone(),
            position: func.position,
        }
    }

    /// Public unless the name starts with `_` (dunder names included)
    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }

    pub fn is_method(&self) -> bool {
        self.owner.is_some()
    }
}

/// A resolved edge between two types of the model
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub source: String,
    pub target: String,
    /// Attribute through which the reference is held
    pub label: Option<String>,
    pub confidence: Confidence,
}

impl Relationship {
    pub fn inheritance(source: &str, target: &str) -> Self {
        Self {
            kind: RelationshipKind::Inheritance,
            source: source.to_string(),
            target: target.to_string(),
            label: None,
            confidence: Confidence::High,
        }
    }

    pub fn new(
        kind: RelationshipKind,
        source: &str,
        target: &str,
        label: Option<&str>,
        confidence: Confidence,
    ) -> Self {
        Self {
            kind,
            source: source.to_string(),
            target: target.to_string(),
            label: label.map(str::to_string),
            confidence,
        }
    }

    /// Whether this edge should replace `other` on the same key
    pub fn is_stronger_than(&self, other: &Relationship) -> bool {
        (self.kind.strength(), self.confidence) > (other.kind.strength(), other.confidence)
    }
}

/// Run statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub modules: usize,
    pub types: usize,
    pub methods: usize,
    pub functions: usize,
    pub imports: usize,
    pub relationships: usize,
    pub parse_failures: usize,
}
