//! Node entities: an arena of named, parentable nodes and the operations on them.

use generational_arena::{Arena, Index};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::model::{InitArgs, Member, ModelType, Value};
use crate::util::naming::{fqualname_of, quote_name};

/// Identity of a node inside its [`Hierarchy`].
///
/// Equality is identity: two nodes with the same name are still different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "#{}.{}", index, generation)
    }
}

/// Rendering options for names and parent chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatting {
    /// Name of entities whose initializer never set one
    pub unknown_name: String,
    /// Joins the quoted names of a node and its parent chain
    pub chain_separator: String,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            unknown_name: "UNKNOWN".to_string(),
            chain_separator: " in ".to_string(),
        }
    }
}

/// An entity instance stored in the arena.
#[derive(Debug)]
pub struct Node {
    name: String,
    model: Rc<ModelType>,
    /// Non-owning back-reference, None for roots
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Per-instance nodes of the declared fields, in declaration order
    slots: Vec<(String, NodeId)>,
    data: BTreeMap<String, Value>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Rc<ModelType> {
        &self.model
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.slots.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Arena holding every entity instance and its parent links.
///
/// Instantiating a model allocates a fresh node per declared field (so two
/// instances never share children), then resolves each field's accessor to
/// wire parents, then runs the model's initializer.
#[derive(Debug)]
pub struct Hierarchy {
    arena: Arena<Node>,
    formatting: Formatting,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::with_formatting(Formatting::default())
    }

    pub fn with_formatting(formatting: Formatting) -> Self {
        Self {
            arena: Arena::new(),
            formatting,
        }
    }

    pub fn formatting(&self) -> &Formatting {
        &self.formatting
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id.0)
    }

    fn get(&self, id: NodeId) -> DomainResult<&Node> {
        self.arena.get(id.0).ok_or(DomainError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> DomainResult<&mut Node> {
        self.arena.get_mut(id.0).ok_or(DomainError::NodeNotFound(id))
    }

    /// Instantiates `model` with a name and no explicit parent.
    pub fn instantiate(&mut self, model: &Rc<ModelType>, name: &str) -> DomainResult<NodeId> {
        self.create(model, InitArgs::named(name))
    }

    /// Instantiates `model`, wiring all declared fields, then runs its initializer.
    #[instrument(level = "debug", skip(self, model), fields(model = %model.name()))]
    pub fn create(&mut self, model: &Rc<ModelType>, args: InitArgs) -> DomainResult<NodeId> {
        let id = self.allocate(model)?;
        self.initialize(model, id, &args)?;
        debug!(%id, name = %self.get(id)?.name, "created");
        Ok(id)
    }

    fn allocate(&mut self, model: &Rc<ModelType>) -> DomainResult<NodeId> {
        let id = NodeId(self.arena.insert(Node {
            name: self.formatting.unknown_name.clone(),
            model: Rc::clone(model),
            parent: None,
            children: Vec::new(),
            slots: Vec::new(),
            data: BTreeMap::new(),
        }));

        // Phase 1: a fresh, unparented node per declared field
        for accessor in model.fields() {
            let template = accessor.template();
            let child = self.allocate(template.model())?;
            let args = InitArgs {
                name: template.label().map(str::to_string),
                parent: None,
            };
            self.initialize(template.model(), child, &args)?;
            self.get_mut(id)?
                .slots
                .push((accessor.field().to_string(), child));
        }

        // Phase 2: wire parents, explicit overrides cascade through their accessors
        for accessor in model.fields() {
            accessor.resolve(self, id)?;
        }

        Ok(id)
    }

    fn initialize(
        &mut self,
        model: &Rc<ModelType>,
        id: NodeId,
        args: &InitArgs,
    ) -> DomainResult<()> {
        match model.initializer() {
            Some(init) => {
                let init = Rc::clone(init);
                trace!(%id, model = %model.name(), "running custom initializer");
                init(self, id, args)
            }
            None => self.base_init(id, args),
        }
    }

    /// Frees `id` together with the nodes it owns through declared fields.
    ///
    /// Other children are detached and kept. Returns the number of freed nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, id: NodeId) -> DomainResult<usize> {
        let mut owned = vec![id];
        let mut next = 0;
        while next < owned.len() {
            let node = self.get(owned[next])?;
            owned.extend(node.slots.iter().map(|(_, slot)| *slot));
            next += 1;
        }

        let doomed: HashSet<NodeId> = owned.iter().copied().collect();
        for &node in &owned {
            let (parent, children) = {
                let n = self.get(node)?;
                (n.parent, n.children.clone())
            };
            if parent.is_some_and(|p| !doomed.contains(&p)) {
                self.set_parent(node, None)?;
            }
            for child in children.into_iter().filter(|c| !doomed.contains(c)) {
                trace!(%child, "detaching survivor");
                self.set_parent(child, None)?;
            }
        }
        for node in &owned {
            self.arena.remove(node.0);
        }
        debug!(%id, freed = owned.len(), "removed");
        Ok(owned.len())
    }

    /// The base entity initializer: assigns name and explicit parent.
    ///
    /// Custom initializers may skip it; declared fields are wired regardless.
    pub fn base_init(&mut self, id: NodeId, args: &InitArgs) -> DomainResult<()> {
        if let Some(name) = &args.name {
            self.get_mut(id)?.name = name.clone();
        }
        if let Some(parent) = args.parent {
            self.set_parent(id, Some(parent))?;
        }
        Ok(())
    }

    pub fn name(&self, id: NodeId) -> DomainResult<&str> {
        Ok(&self.get(id)?.name)
    }

    pub fn parent(&self, id: NodeId) -> DomainResult<Option<NodeId>> {
        Ok(self.get(id)?.parent)
    }

    pub fn model(&self, id: NodeId) -> DomainResult<&Rc<ModelType>> {
        Ok(&self.get(id)?.model)
    }

    /// Parents in order of increasing distance, recomputed on every call.
    pub fn parent_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent).and_then(|n| n.parent);
        }
        chain
    }

    /// Reassigns `child`'s parent, keeping children lists in sync.
    ///
    /// Fails if `child` would become its own ancestor.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> DomainResult<()> {
        let old = self.get(child)?.parent;
        if old == parent {
            return Ok(());
        }
        if let Some(p) = parent {
            self.get(p)?;
            if p == child || self.parent_chain(p).contains(&child) {
                return Err(DomainError::CycleDetected {
                    node: child,
                    parent: p,
                });
            }
        }

        if let Some(o) = old {
            if let Some(old_parent) = self.arena.get_mut(o.0) {
                old_parent.children.retain(|c| *c != child);
            }
        }
        if let Some(p) = parent {
            self.get_mut(p)?.children.push(child);
        }
        self.get_mut(child)?.parent = parent;
        Ok(())
    }

    /// Node stored for `field` on `owner`, without touching its parent.
    pub(crate) fn slot(&self, owner: NodeId, field: &str) -> DomainResult<NodeId> {
        let node = self.get(owner)?;
        node.slots
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, id)| *id)
            .ok_or_else(|| DomainError::AttributeNotFound {
                model: node.model.name().to_string(),
                attribute: field.to_string(),
            })
    }

    /// Reads a declared field, (re)assigning its parent through its accessor.
    pub fn field(&mut self, owner: NodeId, field: &str) -> DomainResult<NodeId> {
        let model = Rc::clone(&self.get(owner)?.model);
        // The type's own field list carries inherited overrides recomposed for it
        match model.accessor(field) {
            Some(accessor) => accessor.resolve(self, owner),
            None => Err(DomainError::AttributeNotFound {
                model: model.name().to_string(),
                attribute: field.to_string(),
            }),
        }
    }

    /// Follows a dotted field path such as `sub.leaf` from `owner`.
    pub fn resolve_path(&mut self, owner: NodeId, path: &str) -> DomainResult<NodeId> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(owner, |current, segment| self.field(current, segment))
    }

    /// Reads any readable attribute: field, property, instance data or class data.
    pub fn get_attr(&mut self, owner: NodeId, attribute: &str) -> DomainResult<Value> {
        let model = Rc::clone(&self.get(owner)?.model);
        match model.member(attribute) {
            Some(Member::Field(_)) => self.field(owner, attribute).map(Value::Node),
            Some(Member::Property(getter)) => {
                let getter = Rc::clone(getter);
                getter(self, owner)
            }
            Some(Member::Data(class_value)) => Ok(self
                .get(owner)?
                .data
                .get(attribute)
                .cloned()
                .unwrap_or_else(|| class_value.clone())),
            Some(Member::Method { .. } | Member::ClassMethod(_) | Member::StaticMethod(_)) => {
                Err(DomainError::NotReadable {
                    model: model.name().to_string(),
                    attribute: attribute.to_string(),
                })
            }
            None => self
                .get(owner)?
                .data
                .get(attribute)
                .cloned()
                .ok_or_else(|| DomainError::AttributeNotFound {
                    model: model.name().to_string(),
                    attribute: attribute.to_string(),
                }),
        }
    }

    /// Stores per-instance user data.
    pub fn set_data(
        &mut self,
        owner: NodeId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> DomainResult<()> {
        self.get_mut(owner)?.data.insert(key.into(), value.into());
        Ok(())
    }

    /// Calls a method through an instance.
    ///
    /// Plain instance methods were wrapped at type construction, so a node they
    /// return ends up parented to `caller`. Class and static methods are not.
    #[instrument(level = "debug", skip(self, args))]
    pub fn call(&mut self, caller: NodeId, method: &str, args: &[Value]) -> DomainResult<Value> {
        let model = Rc::clone(&self.get(caller)?.model);
        match model.member(method) {
            Some(Member::Method { body, .. }) => {
                let body = Rc::clone(body);
                body(self, caller, args)
            }
            Some(Member::ClassMethod(body)) => {
                let body = Rc::clone(body);
                body(self, &model, args)
            }
            Some(Member::StaticMethod(body)) => {
                let body = Rc::clone(body);
                body(self, args)
            }
            Some(_) => Err(DomainError::NotCallable {
                model: model.name().to_string(),
                attribute: method.to_string(),
            }),
            None => Err(DomainError::AttributeNotFound {
                model: model.name().to_string(),
                attribute: method.to_string(),
            }),
        }
    }

    /// Calls a class or static method through the type itself.
    #[instrument(level = "debug", skip(self, model, args), fields(model = %model.name()))]
    pub fn call_class(
        &mut self,
        model: &Rc<ModelType>,
        method: &str,
        args: &[Value],
    ) -> DomainResult<Value> {
        match model.member(method) {
            Some(Member::ClassMethod(body)) => {
                let body = Rc::clone(body);
                body(self, model, args)
            }
            Some(Member::StaticMethod(body)) => {
                let body = Rc::clone(body);
                body(self, args)
            }
            Some(_) => Err(DomainError::NotCallable {
                model: model.name().to_string(),
                attribute: method.to_string(),
            }),
            None => Err(DomainError::AttributeNotFound {
                model: model.name().to_string(),
                attribute: method.to_string(),
            }),
        }
    }

    /// `module.Qualname(name=...)`
    pub fn repr(&self, id: NodeId) -> DomainResult<String> {
        let node = self.get(id)?;
        Ok(format!("{}(name={})", fqualname_of(&node.model), node.name))
    }

    /// Renders `'leaf' in 'middle' in 'root'`.
    pub fn display(&self, id: NodeId) -> ChainDisplay<'_> {
        ChainDisplay {
            hierarchy: self,
            id,
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants::new(self, root)
    }

    /// Nodes under `root` (inclusive) that have no children.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .filter(|(_, node)| node.children.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self, root: NodeId) -> usize {
        if let Some(node) = self.node(root) {
            1 + node
                .children
                .iter()
                .map(|&child| self.depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }
}

pub struct ChainDisplay<'a> {
    hierarchy: &'a Hierarchy,
    id: NodeId,
}

impl fmt::Display for ChainDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = std::iter::once(self.id).chain(self.hierarchy.parent_chain(self.id));
        let names = ids
            .filter_map(|id| self.hierarchy.node(id))
            .map(|node| quote_name(&node.name));
        let separator = &self.hierarchy.formatting.chain_separator;
        write!(f, "{}", itertools::join(names, separator))
    }
}

/// Pre-order walk below a node, children left to right.
pub struct Descendants<'a> {
    hierarchy: &'a Hierarchy,
    stack: Vec<NodeId>,
}

impl<'a> Descendants<'a> {
    fn new(hierarchy: &'a Hierarchy, root: NodeId) -> Self {
        let mut stack = Vec::new();
        if hierarchy.node(root).is_some() {
            stack.push(root);
        }
        Self { hierarchy, stack }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.hierarchy.node(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_chain_of_root_is_empty() {
        let mut h = Hierarchy::new();
        let root = h.instantiate(&ModelType::entity(), "Root").unwrap();
        assert!(h.parent_chain(root).is_empty());
        assert_eq!(h.display(root).to_string(), "'Root'");
    }

    #[test]
    fn test_remove_detaches_foreign_children_and_frees_owned() {
        let mut h = Hierarchy::new();
        let entity = ModelType::entity();
        let root = h.instantiate(&entity, "Root").unwrap();
        let doomed = h
            .create(&entity, InitArgs::named("Doomed").with_parent(root))
            .unwrap();
        let survivor = h
            .create(&entity, InitArgs::named("Survivor").with_parent(doomed))
            .unwrap();

        assert_eq!(h.remove(doomed).unwrap(), 1);
        assert!(h.node(doomed).is_none());
        assert!(h.node(root).unwrap().children().is_empty());
        assert_eq!(h.parent(survivor).unwrap(), None);
        assert_eq!(h.len(), 2);
        assert!(matches!(h.remove(doomed), Err(DomainError::NodeNotFound(_))));
    }

    #[test]
    fn test_set_parent_keeps_children_in_sync() {
        let mut h = Hierarchy::new();
        let entity = ModelType::entity();
        let a = h.instantiate(&entity, "A").unwrap();
        let b = h.instantiate(&entity, "B").unwrap();
        let leaf = h.instantiate(&entity, "Leaf").unwrap();

        h.set_parent(leaf, Some(a)).unwrap();
        assert_eq!(h.node(a).unwrap().children(), &[leaf]);

        h.set_parent(leaf, Some(b)).unwrap();
        assert!(h.node(a).unwrap().children().is_empty());
        assert_eq!(h.node(b).unwrap().children(), &[leaf]);
        assert_eq!(h.parent(leaf).unwrap(), Some(b));
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut h = Hierarchy::new();
        let entity = ModelType::entity();
        let root = h.instantiate(&entity, "Root").unwrap();
        let leaf = h
            .create(&entity, InitArgs::named("Leaf").with_parent(root))
            .unwrap();

        assert!(matches!(
            h.set_parent(root, Some(leaf)),
            Err(DomainError::CycleDetected { .. })
        ));
        assert!(matches!(
            h.set_parent(root, Some(root)),
            Err(DomainError::CycleDetected { .. })
        ));
        assert_eq!(h.parent(root).unwrap(), None);
    }

    #[test]
    fn test_unnamed_entity_uses_unknown_name() {
        let mut h = Hierarchy::with_formatting(Formatting {
            unknown_name: "?".to_string(),
            chain_separator: " < ".to_string(),
        });
        let entity = ModelType::entity();
        let root = h.create(&entity, InitArgs::default()).unwrap();
        let leaf = h
            .create(&entity, InitArgs::named("Leaf").with_parent(root))
            .unwrap();
        assert_eq!(h.name(root).unwrap(), "?");
        assert_eq!(h.display(leaf).to_string(), "'Leaf' < '?'");
    }

    #[test]
    fn test_repr_uses_qualified_type_name() {
        let mut h = Hierarchy::new();
        let root = h.instantiate(&ModelType::entity(), "Root").unwrap();
        assert_eq!(h.repr(root).unwrap(), "parentage.Entity(name=Root)");
    }

    #[test]
    fn test_depth_and_leaves() {
        let mut h = Hierarchy::new();
        let entity = ModelType::entity();
        let root = h.instantiate(&entity, "Root").unwrap();
        let a = h.create(&entity, InitArgs::named("A").with_parent(root)).unwrap();
        let b = h.create(&entity, InitArgs::named("B").with_parent(root)).unwrap();
        let aa = h.create(&entity, InitArgs::named("AA").with_parent(a)).unwrap();

        assert_eq!(h.depth(root), 3);
        assert_eq!(h.leaves(root), vec![aa, b]);
        let order: Vec<_> = h.descendants(root).map(|(id, _)| id).collect();
        assert_eq!(order, vec![root, a, aa, b]);
    }
}
