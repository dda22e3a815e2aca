//! Field dependency graph
//!
//! One graph per node type and mutation kind. Fields are the writable
//! components, the reverse edges and the virtual fields of that kind; edges of
//! the graph come from [`FieldConfig::depends_on`](crate::services::FieldConfig).

use crate::models::{Component, DefinitionError, NodeType};
use crate::services::hooks::{FieldConfig, FieldResolver};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Creation or update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Creation,
    Update,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Creation => "creation",
            MutationKind::Update => "update",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Leaf,
    Edge,
    ReverseEdge,
    Virtual,
}

impl FieldKind {
    /// Persisted by the connector
    pub(crate) fn is_component(self) -> bool {
        matches!(self, FieldKind::Leaf | FieldKind::Edge)
    }
}

pub(crate) struct FieldNode {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    /// Indexes into the graph's fields
    pub(crate) dependencies: Vec<usize>,
    pub(crate) needs_current: bool,
    pub(crate) resolver: Option<Arc<dyn FieldResolver>>,
}

pub(crate) struct FieldGraph {
    kind: MutationKind,
    fields: Vec<FieldNode>,
    index: HashMap<String, usize>,
    order: Vec<usize>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl FieldGraph {
    /// Build and topologically sort the graph
    ///
    /// # Errors
    ///
    /// - unknown configured field or dependency
    /// - configuration on a reverse edge, or a dependency on one
    /// - a dependency cycle, reported at the field where it was entered
    pub(crate) fn build(
        node_type: &NodeType,
        kind: MutationKind,
        configs: &HashMap<String, FieldConfig>,
    ) -> Result<Self, DefinitionError> {
        let path = format!("{}.{}", node_type.name(), kind);
        let mut fields = Vec::new();

        // An immutable node type has nothing to update
        if !(kind == MutationKind::Update && node_type.is_immutable()) {
            for component in node_type.components() {
                if kind == MutationKind::Update && component.is_immutable() {
                    continue;
                }
                let field_kind = match component {
                    Component::Leaf(_) => FieldKind::Leaf,
                    Component::Edge(_) => FieldKind::Edge,
                };
                fields.push(FieldNode::new(component.name(), field_kind));
            }
            for reverse_edge in node_type.reverse_edges() {
                fields.push(FieldNode::new(reverse_edge.name(), FieldKind::ReverseEdge));
            }
            for virtual_field in node_type.virtual_fields() {
                let included = match kind {
                    MutationKind::Creation => virtual_field.in_creation(),
                    MutationKind::Update => virtual_field.in_update(),
                };
                if included {
                    fields.push(FieldNode::new(virtual_field.name(), FieldKind::Virtual));
                }
            }
        }

        let index: HashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name.clone(), i))
            .collect();

        for (name, config) in configs {
            let &position = index
                .get(name)
                .ok_or_else(|| DefinitionError::unknown(path.clone(), "field", name.as_str()))?;
            if fields[position].kind == FieldKind::ReverseEdge {
                return Err(DefinitionError::invalid(
                    format!("{}.{}", path, name),
                    "reverse edges cannot be configured",
                ));
            }

            let mut dependencies = Vec::with_capacity(config.depends_on.len());
            for dependency in &config.depends_on {
                let &target = index.get(dependency).ok_or_else(|| {
                    DefinitionError::unknown(format!("{}.{}", path, name), "field", dependency.as_str())
                })?;
                if fields[target].kind == FieldKind::ReverseEdge {
                    return Err(DefinitionError::invalid(
                        format!("{}.{}", path, name),
                        format!("cannot depend on the reverse edge \"{}\"", dependency),
                    ));
                }
                if !dependencies.contains(&target) {
                    dependencies.push(target);
                }
            }

            let field = &mut fields[position];
            field.dependencies = dependencies;
            field.needs_current = config.needs_current && kind == MutationKind::Update;
            field.resolver = config.resolver.clone();
        }

        let order = topological_order(&fields).map_err(|cycle| {
            let names: Vec<String> = cycle.iter().map(|&i| fields[i].name.clone()).collect();
            DefinitionError::circular_dependency(format!("{}.{}", path, names[0]), &names)
        })?;

        Ok(Self {
            kind,
            fields,
            index,
            order,
        })
    }

    pub(crate) fn kind(&self) -> MutationKind {
        self.kind
    }

    pub(crate) fn fields(&self) -> &[FieldNode] {
        &self.fields
    }

    pub(crate) fn field(&self, name: &str) -> Option<&FieldNode> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Field indexes, every field after its dependencies
    pub(crate) fn order(&self) -> &[usize] {
        &self.order
    }

    /// Whether some field reads the current node value
    pub(crate) fn needs_current(&self) -> bool {
        self.fields.iter().any(|field| field.needs_current)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldNode {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            dependencies: Vec::new(),
            needs_current: false,
            resolver: None,
        }
    }
}

impl fmt::Debug for FieldGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order: Vec<&str> = self
            .order
            .iter()
            .map(|&i| self.fields[i].name.as_str())
            .collect();
        f.debug_struct("FieldGraph")
            .field("kind", &self.kind)
            .field("order", &order)
            .finish()
    }
}

/// Depth-first sort in declaration order; `Err` carries the closed cycle
fn topological_order(fields: &[FieldNode]) -> Result<Vec<usize>, Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; fields.len()];
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(fields.len());

    for start in 0..fields.len() {
        if marks[start] == Mark::Unvisited {
            visit(fields, start, &mut marks, &mut stack, &mut order)?;
        }
    }
    Ok(order)
}

fn visit(
    fields: &[FieldNode],
    current: usize,
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), Vec<usize>> {
    marks[current] = Mark::Visiting;
    stack.push(current);

    for &dependency in &fields[current].dependencies {
        match marks[dependency] {
            Mark::Done => {}
            Mark::Visiting => {
                let start = stack.iter().position(|&i| i == dependency).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(dependency);
                return Err(cycle);
            }
            Mark::Unvisited => visit(fields, dependency, marks, stack, order)?,
        }
    }

    stack.pop();
    marks[current] = Mark::Done;
    order.push(current);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Schema;
    use crate::test_support::{blog_definition, blog_schema};

    fn names(graph: &FieldGraph) -> Vec<&str> {
        graph
            .order()
            .iter()
            .map(|&i| graph.fields()[i].name.as_str())
            .collect()
    }

    #[test]
    fn test_creation_and_update_fields() {
        let schema = blog_schema();
        let category = schema.node_type_by_name("Category").unwrap();

        let creation = FieldGraph::build(category, MutationKind::Creation, &HashMap::new()).unwrap();
        assert_eq!(
            names(&creation),
            vec!["_id", "id", "parent", "title", "slug", "order", "children", "articles"]
        );

        // `_id` and `id` are immutable
        let update = FieldGraph::build(category, MutationKind::Update, &HashMap::new()).unwrap();
        assert!(!update.contains("_id"));
        assert!(update.contains("slug"));
        assert!(update.contains("children"));
        assert_eq!(update.kind(), MutationKind::Update);
    }

    #[test]
    fn test_dependencies_come_first() {
        let schema = blog_schema();
        let category = schema.node_type_by_name("Category").unwrap();
        let configs = HashMap::from([
            ("_id".to_string(), FieldConfig::new().depends_on(["slug"])),
            ("slug".to_string(), FieldConfig::new().depends_on(["title"])),
        ]);

        let graph = FieldGraph::build(category, MutationKind::Creation, &configs).unwrap();
        let order = names(&graph);
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(position("title") < position("slug"));
        assert!(position("slug") < position("_id"));
    }

    #[test]
    fn test_cycle_is_reported_at_entry_field() {
        let schema = blog_schema();
        let category = schema.node_type_by_name("Category").unwrap();
        let configs = HashMap::from([
            ("title".to_string(), FieldConfig::new().depends_on(["slug"])),
            ("slug".to_string(), FieldConfig::new().depends_on(["title"])),
        ]);

        let err = FieldGraph::build(category, MutationKind::Creation, &configs).unwrap_err();
        assert_eq!(err.path(), "Category.creation.title");
        assert!(err.to_string().contains("title -> slug -> title"));
    }

    #[test]
    fn test_invalid_configs() {
        let schema = blog_schema();
        let category = schema.node_type_by_name("Category").unwrap();

        let unknown = HashMap::from([("missing".to_string(), FieldConfig::new())]);
        assert!(FieldGraph::build(category, MutationKind::Creation, &unknown).is_err());

        // `id` is immutable, so not an update field
        let immutable = HashMap::from([("id".to_string(), FieldConfig::new())]);
        assert!(FieldGraph::build(category, MutationKind::Update, &immutable).is_err());

        let on_reverse_edge = HashMap::from([(
            "slug".to_string(),
            FieldConfig::new().depends_on(["children"]),
        )]);
        assert!(FieldGraph::build(category, MutationKind::Creation, &on_reverse_edge).is_err());
    }

    #[test]
    fn test_immutable_node_type_has_no_update_fields() {
        let mut definition = blog_definition();
        definition["node_types"][4]["immutable"] = serde_json::json!(true);
        let schema = Schema::new(serde_json::from_value(definition).unwrap()).unwrap();
        let extension = schema.node_type_by_name("ArticleExtension").unwrap();
        let graph = FieldGraph::build(extension, MutationKind::Update, &HashMap::new()).unwrap();
        assert!(graph.is_empty());
        assert!(!graph.needs_current());
    }
}
