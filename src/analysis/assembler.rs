// Merges per-unit declarations into one project model

use crate::analysis::model::{CallableMember, ModuleModel, ProjectModel, Relationship, TypeEntity};
use crate::parser::{AttributeObservation, Diagnostic, RelationshipKind, UnitDeclarations};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Builds a [`ProjectModel`] from the declarations of every unit
///
/// Output depends only on the set of units, never on the order they are
/// handed in.
#[derive(Debug, Default)]
pub struct ModelAssembler;

/// A registered type still waiting for its references to be resolved
struct PendingType {
    qualified_name: String,
    module: String,
    bases: Vec<String>,
    observations: Vec<AttributeObservation>,
}

impl ModelAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the model
    pub fn assemble(&self, mut units: Vec<UnitDeclarations>) -> ProjectModel {
        units.sort_by(|a, b| a.module.cmp(&b.module).then_with(|| a.path.cmp(&b.path)));

        let mut modules: Vec<ModuleModel> = Vec::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut registered: HashSet<String> = HashSet::new();
        let mut pending: Vec<PendingType> = Vec::new();

        // Pass 1: register every type under its qualified name
        for unit in units {
            let failed = unit.has_parse_failure();
            diagnostics.extend(unit.diagnostics);
            if failed {
                continue;
            }

            // units sharing a module path (pkg.py and pkg/__init__.py) merge
            if modules.last().map_or(true, |m| m.name != unit.module) {
                modules.push(ModuleModel::new(&unit.module, unit.path.clone()));
            }
            let Some(module) = modules.last_mut() else {
                continue;
            };
            if module.docstring.is_none() {
                module.docstring = unit.docstring;
            }
            module.imports.extend(unit.imports);

            for func in &unit.functions {
                let member = CallableMember::from_function(func, None);
                let duplicate = module
                    .functions
                    .iter()
                    .any(|f| f.name == member.name && f.position == member.position);
                if !duplicate {
                    module.functions.push(member);
                }
            }

            for class in unit.classes {
                let qualified_name = qualify(&unit.module, &class.name);
                if !registered.insert(qualified_name.clone()) {
                    warn!(name = %qualified_name, module = %unit.module, "duplicate type ignored");
                    diagnostics.push(Diagnostic::name_collision(
                        &qualified_name,
                        &unit.module,
                        class.position.line,
                    ));
                    continue;
                }

                module
                    .types
                    .push(TypeEntity::from_class(&class, &unit.module, &qualified_name));
                pending.push(PendingType {
                    qualified_name,
                    module: unit.module.clone(),
                    bases: class.bases,
                    observations: class.observations,
                });
            }
        }

        // Pass 2: resolve bases and attribute observations
        let resolver = NameResolver::new(&registered);
        let mut edges: BTreeMap<(RelationshipKind, String, String, Option<String>), Relationship> =
            BTreeMap::new();
        let mut keep = |rel: Relationship| {
            let key_kind = match rel.kind {
                RelationshipKind::Inheritance => RelationshipKind::Inheritance,
                // composition and aggregation compete for the same key
                _ => RelationshipKind::Composition,
            };
            let key = (key_kind, rel.source.clone(), rel.target.clone(), rel.label.clone());
            let replace = edges
                .get(&key)
                .map_or(true, |existing| rel.is_stronger_than(existing));
            if replace {
                edges.insert(key, rel);
            }
        };

        for ty in &pending {
            for base in &ty.bases {
                match resolver.resolve(&ty.module, base) {
                    Some(target) if target != ty.qualified_name => {
                        keep(Relationship::inheritance(&ty.qualified_name, target));
                    }
                    Some(_) => {}
                    None => debug!(source = %ty.qualified_name, base = %base, "base not resolved"),
                }
            }

            for obs in &ty.observations {
                for candidate in obs.source.candidate_targets() {
                    if let Some(target) = resolver.resolve(&ty.module, &candidate) {
                        keep(Relationship::new(
                            obs.source.kind(),
                            &ty.qualified_name,
                            target,
                            Some(&obs.attribute),
                            obs.source.confidence(),
                        ));
                    }
                }
            }
        }

        let mut relationships: Vec<Relationship> = edges.into_values().collect();
        relationships.sort();
        diagnostics.sort();

        info!(
            modules = modules.len(),
            types = registered.len(),
            relationships = relationships.len(),
            diagnostics = diagnostics.len(),
            "model assembled"
        );

        ProjectModel::new(modules, relationships, diagnostics)
    }
}

/// `module.Name`, or just `Name` for a root-level module
fn qualify(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", module, name)
    }
}

/// Drop subscripts, call arguments and quotes: `Generic[T]` -> `Generic`
fn strip_reference(reference: &str) -> Option<&str> {
    let end = reference.find(['[', '(']).unwrap_or(reference.len());
    let stripped = reference[..end].trim().trim_matches(|c| c == '"' || c == '\'');
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Resolves raw references against the registered qualified names
struct NameResolver<'a> {
    names: &'a HashSet<String>,
    /// Last name segment -> qualified names ending with it
    by_local: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> NameResolver<'a> {
    fn new(names: &'a HashSet<String>) -> Self {
        let mut by_local: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        for name in names {
            let local = name.rsplit('.').next().unwrap_or(name);
            by_local.entry(local).or_default().push(name.as_str());
        }
        Self { names, by_local }
    }

    /// Same module, then exact qualified name, then a unique suffix match
    fn resolve(&self, module: &str, reference: &str) -> Option<&'a str> {
        let reference = strip_reference(reference)?;

        let local = qualify(module, reference);
        if let Some(found) = self.names.get(&local) {
            return Some(found.as_str());
        }
        if let Some(found) = self.names.get(reference) {
            return Some(found.as_str());
        }

        let last = reference.rsplit('.').next().unwrap_or(reference);
        let suffix = format!(".{}", reference);
        let mut candidates = self
            .by_local
            .get(last)?
            .iter()
            .filter(|qn| qn.ends_with(&suffix));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(*only),
            _ => None,
        }
    }
}
