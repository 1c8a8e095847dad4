//! Declared model types: attributes, values and the method stitching combinator.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::domain::accessor::Accessor;
use crate::domain::error::DomainResult;
use crate::domain::hierarchy::{Hierarchy, NodeId};

/// Module recorded on types that never set one.
pub const DEFAULT_MODULE: &str = "parentage";

/// Name of the root type every model derives from.
pub const ENTITY: &str = "Entity";

/// Plain instance method. The result is stitched onto the caller.
pub type InstanceFn = Rc<dyn Fn(&mut Hierarchy, NodeId, &[Value]) -> DomainResult<Value>>;
/// Class method: receives the type of the instance it was called through.
pub type ClassFn = Rc<dyn Fn(&mut Hierarchy, &Rc<ModelType>, &[Value]) -> DomainResult<Value>>;
/// Static method: no receiver at all.
pub type StaticFn = Rc<dyn Fn(&mut Hierarchy, &[Value]) -> DomainResult<Value>>;
/// Author-defined property getter.
pub type GetterFn = Rc<dyn Fn(&mut Hierarchy, NodeId) -> DomainResult<Value>>;
/// Instance initializer. Replaces [`Hierarchy::base_init`] when set.
pub type InitFn = Rc<dyn Fn(&mut Hierarchy, NodeId, &InitArgs) -> DomainResult<()>>;

/// Values flowing through attributes and method calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Text(String),
    Node(NodeId),
}

impl Value {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
            Value::Node(id) => write!(f, "node {}", id),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

/// Constructor arguments of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitArgs {
    pub name: Option<String>,
    /// Explicit parent override
    pub parent: Option<NodeId>,
}

impl InitArgs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// A declared child entity: which type to build, its label, and an optional
/// explicit parent naming another declared child.
#[derive(Clone)]
pub struct Child {
    model: Rc<ModelType>,
    label: Option<String>,
    parent: Option<String>,
}

impl Child {
    pub fn new(model: &Rc<ModelType>, label: impl Into<String>) -> Self {
        Self {
            model: Rc::clone(model),
            label: Some(label.into()),
            parent: None,
        }
    }

    /// Child constructed without a name, e.g. for types with their own initializer.
    pub fn unlabelled(model: &Rc<ModelType>) -> Self {
        Self {
            model: Rc::clone(model),
            label: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, field: impl Into<String>) -> Self {
        self.parent = Some(field.into());
        self
    }

    pub fn model(&self) -> &Rc<ModelType> {
        &self.model
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Child")
            .field("model", &self.model.name())
            .field("label", &self.label)
            .field("parent", &self.parent)
            .finish()
    }
}

/// Attribute as written by the author, before the construction passes.
#[derive(Clone)]
pub enum Attribute {
    Child(Child),
    Method(InstanceFn),
    ClassMethod(ClassFn),
    StaticMethod(StaticFn),
    Property(GetterFn),
    Data(Value),
}

impl Attribute {
    pub fn method<F>(body: F) -> Self
    where
        F: Fn(&mut Hierarchy, NodeId, &[Value]) -> DomainResult<Value> + 'static,
    {
        Attribute::Method(Rc::new(body))
    }

    pub fn class_method<F>(body: F) -> Self
    where
        F: Fn(&mut Hierarchy, &Rc<ModelType>, &[Value]) -> DomainResult<Value> + 'static,
    {
        Attribute::ClassMethod(Rc::new(body))
    }

    pub fn static_method<F>(body: F) -> Self
    where
        F: Fn(&mut Hierarchy, &[Value]) -> DomainResult<Value> + 'static,
    {
        Attribute::StaticMethod(Rc::new(body))
    }

    pub fn property<F>(getter: F) -> Self
    where
        F: Fn(&mut Hierarchy, NodeId) -> DomainResult<Value> + 'static,
    {
        Attribute::Property(Rc::new(getter))
    }
}

/// Attribute of a finished type.
#[derive(Clone)]
pub enum Member {
    Field(Rc<Accessor>),
    Method { body: InstanceFn, stitched: bool },
    ClassMethod(ClassFn),
    StaticMethod(StaticFn),
    Property(GetterFn),
    Data(Value),
}

impl Member {
    pub fn kind(&self) -> &'static str {
        match self {
            Member::Field(_) => "field",
            Member::Method { .. } => "method",
            Member::ClassMethod(_) => "classmethod",
            Member::StaticMethod(_) => "staticmethod",
            Member::Property(_) => "property",
            Member::Data(_) => "data",
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Field(accessor) => f.debug_tuple("Field").field(accessor).finish(),
            Member::Method { stitched, .. } => f
                .debug_struct("Method")
                .field("stitched", stitched)
                .finish_non_exhaustive(),
            Member::Data(value) => f.debug_tuple("Data").field(value).finish(),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Names like `__init__` are structural and never wrapped.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with("__") && name.ends_with("__")
}

/// Wraps an instance method so a node it returns is parented to the caller.
///
/// Returning the caller itself, or anything that is not a node, leaves the
/// hierarchy untouched.
pub fn stitch_parent(body: InstanceFn) -> InstanceFn {
    Rc::new(move |hierarchy, caller, args| {
        let ret = body(hierarchy, caller, args)?;
        if let Value::Node(returned) = &ret {
            if *returned != caller {
                trace!(%caller, returned = %returned, "stitching returned node onto caller");
                hierarchy.set_parent(*returned, Some(caller))?;
            }
        }
        Ok(ret)
    })
}

/// A finished, immutable model type.
///
/// Produced once by [`crate::domain::ModelTypeBuilder::build`]; its fields carry
/// the accessors that wire parents on every instance.
pub struct ModelType {
    pub(crate) name: String,
    pub(crate) module: String,
    pub(crate) qualname: String,
    pub(crate) base: Option<Rc<ModelType>>,
    pub(crate) members: Vec<(String, Member)>,
    pub(crate) fields: Vec<Rc<Accessor>>,
    pub(crate) initializer: Option<InitFn>,
}

thread_local! {
    static ROOT: Rc<ModelType> = Rc::new(ModelType {
        name: ENTITY.to_string(),
        module: DEFAULT_MODULE.to_string(),
        qualname: ENTITY.to_string(),
        base: None,
        members: Vec::new(),
        fields: Vec::new(),
        initializer: None,
    });
}

impl ModelType {
    /// The root type: a named, parentable entity with no declared children.
    pub fn entity() -> Rc<ModelType> {
        ROOT.with(Rc::clone)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub fn base(&self) -> Option<&Rc<ModelType>> {
        self.base.as_ref()
    }

    /// True if `other` is this type or one of its bases.
    pub fn is_subtype_of(&self, other: &ModelType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if std::ptr::eq(ty, other) {
                return true;
            }
            current = ty.base.as_deref();
        }
        false
    }

    /// Own members in declaration order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, m)| (name.as_str(), m))
    }

    /// Looks up a member on this type, then along the base chain.
    pub fn member(&self, name: &str) -> Option<&Member> {
        let mut current = Some(self);
        while let Some(ty) = current {
            if let Some((_, member)) = ty.members.iter().find(|(n, _)| n == name) {
                return Some(member);
            }
            current = ty.base.as_deref();
        }
        None
    }

    /// All declared fields, inherited ones first.
    pub fn fields(&self) -> &[Rc<Accessor>] {
        &self.fields
    }

    pub fn accessor(&self, field: &str) -> Option<&Rc<Accessor>> {
        self.fields.iter().find(|a| a.field() == field)
    }

    pub fn class_data(&self, name: &str) -> Option<&Value> {
        match self.member(name) {
            Some(Member::Data(value)) => Some(value),
            _ => None,
        }
    }

    /// Initializer of this type or the nearest base that defines one.
    pub fn initializer(&self) -> Option<&InitFn> {
        let mut current = Some(self);
        while let Some(ty) = current {
            if let Some(init) = &ty.initializer {
                return Some(init);
            }
            current = ty.base.as_deref();
        }
        None
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("base", &self.base.as_ref().map(|b| b.name()))
            .field("members", &self.members)
            .finish()
    }
}
