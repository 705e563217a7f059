// Significance ranking and top-N selection

use crate::analysis::model::{CallableMember, ProjectModel, Relationship, TypeEntity};
use crate::parser::RelationshipKind;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Added to the score of a type that some other type inherits from
pub const BASE_BONUS: usize = 3;

/// Selection options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankOptions {
    /// Maximum number of types, 0 for all
    pub max_types: usize,
    /// Hide members whose name starts with `_`
    pub public_only: bool,
    /// Passed through to rendering; never affects selection
    pub group_by_module: bool,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            max_types: 40,
            public_only: false,
            group_by_module: true,
        }
    }
}

/// A selected type with the members the diagram should show
#[derive(Debug, Clone, PartialEq)]
pub struct TypeView<'m> {
    pub entity: &'m TypeEntity,
    pub members: Vec<&'m CallableMember>,
    pub score: usize,
}

/// The bounded subset of a model that goes into a diagram
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramView<'m> {
    /// Selected types, most significant first
    pub types: Vec<TypeView<'m>>,
    /// Relationships whose both endpoints are selected, in model order
    pub relationships: Vec<&'m Relationship>,
    pub group_by_module: bool,
}

impl<'m> DiagramView<'m> {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.types
            .iter()
            .any(|t| t.entity.qualified_name == qualified_name)
    }
}

/// Scores types and picks the most significant ones
pub struct SignificanceRanker {
    options: RankOptions,
}

impl SignificanceRanker {
    pub fn new(options: RankOptions) -> Self {
        Self { options }
    }

    /// Score every type of the model
    ///
    /// score = visible members + inbound edges + outbound edges, plus
    /// [`BASE_BONUS`] when another type inherits from it. Edge counts cover
    /// the whole model, not just the selection.
    pub fn scores(&self, model: &ProjectModel) -> HashMap<String, usize> {
        let mut graph: DiGraph<&str, RelationshipKind> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for entity in model.types() {
            let idx = graph.add_node(entity.qualified_name.as_str());
            nodes.insert(entity.qualified_name.as_str(), idx);
        }
        for rel in model.relationships() {
            if let (Some(&from), Some(&to)) = (nodes.get(rel.source.as_str()), nodes.get(rel.target.as_str())) {
                graph.add_edge(from, to, rel.kind);
            }
        }

        model
            .types()
            .map(|entity| {
                let idx = nodes[entity.qualified_name.as_str()];
                let inbound = graph.edges_directed(idx, Direction::Incoming).count();
                let outbound = graph.edges_directed(idx, Direction::Outgoing).count();
                let is_base = graph
                    .edges_directed(idx, Direction::Incoming)
                    .any(|e| *e.weight() == RelationshipKind::Inheritance && e.source() != idx);
                let members = entity.visible_members(self.options.public_only).count();

                let score = members + inbound + outbound + if is_base { BASE_BONUS } else { 0 };
                (entity.qualified_name.clone(), score)
            })
            .collect()
    }

    /// Select the top types and close the relationships over them
    pub fn select<'m>(&self, model: &'m ProjectModel) -> DiagramView<'m> {
        let scores = self.scores(model);

        let mut ranked: Vec<(&'m TypeEntity, usize)> = model
            .types()
            .map(|t| (t, scores.get(&t.qualified_name).copied().unwrap_or(0)))
            .collect();
        ranked.sort_by(|(a, sa), (b, sb)| {
            Reverse(*sa)
                .cmp(&Reverse(*sb))
                .then_with(|| a.qualified_name.cmp(&b.qualified_name))
        });
        if self.options.max_types > 0 {
            ranked.truncate(self.options.max_types);
        }

        let selected: HashSet<&str> = ranked
            .iter()
            .map(|(t, _)| t.qualified_name.as_str())
            .collect();

        let relationships: Vec<&'m Relationship> = model
            .relationships()
            .iter()
            .filter(|r| selected.contains(r.source.as_str()) && selected.contains(r.target.as_str()))
            .collect();

        let types: Vec<TypeView<'m>> = ranked
            .into_iter()
            .map(|(entity, score)| TypeView {
                entity,
                members: entity.visible_members(self.options.public_only).collect(),
                score,
            })
            .collect();

        debug!(
            available = model.stats().types,
            selected = types.len(),
            relationships = relationships.len(),
            "types selected"
        );

        DiagramView {
            types,
            relationships,
            group_by_module: self.options.group_by_module,
        }
    }
}
