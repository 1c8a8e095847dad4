//! Construction processor: turns a declared namespace into a finished model type.
//!
//! `build()` runs once per type, over the attributes in declaration order:
//!
//! 1. discovery: every declared child becomes a known field with a direct accessor
//! 2. override remap: children with an explicit parent get a via-parent accessor
//!    composed from the parent's final accessor
//! 3. method wrap: plain instance methods are wrapped with [`stitch_parent`]

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, instrument, trace};

use crate::domain::accessor::{Accessor, Source};
use crate::domain::error::{ConfigurationError, DomainResult};
use crate::domain::hierarchy::{Hierarchy, NodeId};
use crate::domain::model::{
    is_reserved, stitch_parent, Attribute, Child, InitArgs, InitFn, Member, ModelType, Value,
    DEFAULT_MODULE,
};

/// Collects a model's attributes; see the module docs for what `build()` does.
pub struct ModelTypeBuilder {
    name: String,
    module: String,
    qualname: Option<String>,
    base: Rc<ModelType>,
    namespace: Vec<(String, Attribute)>,
    initializer: Option<InitFn>,
}

impl ModelTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: DEFAULT_MODULE.to_string(),
            qualname: None,
            base: ModelType::entity(),
            namespace: Vec::new(),
            initializer: None,
        }
    }

    /// Derive from another model type instead of the root entity.
    pub fn extends(mut self, base: &Rc<ModelType>) -> Self {
        self.base = Rc::clone(base);
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = Some(qualname.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.namespace.push((name.into(), attribute));
        self
    }

    pub fn child(self, name: impl Into<String>, child: Child) -> Self {
        self.attribute(name, Attribute::Child(child))
    }

    pub fn method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Hierarchy, NodeId, &[Value]) -> DomainResult<Value> + 'static,
    {
        self.attribute(name, Attribute::method(body))
    }

    pub fn class_method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Hierarchy, &Rc<ModelType>, &[Value]) -> DomainResult<Value> + 'static,
    {
        self.attribute(name, Attribute::class_method(body))
    }

    pub fn static_method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Hierarchy, &[Value]) -> DomainResult<Value> + 'static,
    {
        self.attribute(name, Attribute::static_method(body))
    }

    pub fn property<F>(self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&mut Hierarchy, NodeId) -> DomainResult<Value> + 'static,
    {
        self.attribute(name, Attribute::property(getter))
    }

    pub fn data(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attribute(name, Attribute::Data(value.into()))
    }

    /// Replaces the base initializer for instances of this type.
    pub fn initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut Hierarchy, NodeId, &InitArgs) -> DomainResult<()> + 'static,
    {
        self.initializer = Some(Rc::new(init));
        self
    }

    #[instrument(level = "debug", skip(self), fields(model = %self.name))]
    pub fn build(self) -> Result<Rc<ModelType>, ConfigurationError> {
        self.check_unique()?;

        let own: HashSet<&str> = self.namespace.iter().map(|(n, _)| n.as_str()).collect();
        let inherited: Vec<&str> = self
            .base
            .fields()
            .iter()
            .map(|a| a.field())
            .filter(|name| !own.contains(name))
            .collect();

        let discovered = self.discover();
        let accessors = self.remap(&discovered, &inherited)?;
        let members = self.wrap(&accessors);

        // Inherited overrides are recomposed onto this type's final accessors
        let fields: Vec<Rc<Accessor>> = inherited
            .iter()
            .copied()
            .chain(discovered.iter().map(|(name, _)| name.as_str()))
            .filter_map(|name| accessors.get(name).cloned())
            .collect();
        debug!(fields = fields.len(), members = members.len(), "model type built");

        Ok(Rc::new(ModelType {
            qualname: self.qualname.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            module: self.module,
            base: Some(self.base),
            members,
            fields,
            initializer: self.initializer,
        }))
    }

    fn check_unique(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for (name, _) in &self.namespace {
            if !seen.insert(name.as_str()) {
                return Err(ConfigurationError::DuplicateAttribute {
                    model: self.name.clone(),
                    attribute: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Pass 1: record known children and their direct accessors.
    #[instrument(level = "trace", skip(self))]
    fn discover(&self) -> Vec<(String, Rc<Accessor>)> {
        self.namespace
            .iter()
            .filter_map(|(name, attribute)| match attribute {
                Attribute::Child(child) => {
                    trace!(field = %name, model = %child.model().name(), "discovered child");
                    Some((name.clone(), Rc::new(Accessor::direct(name, child.clone()))))
                }
                _ => None,
            })
            .collect()
    }

    /// Pass 2: swap in via-parent accessors for explicit-parent overrides.
    #[instrument(level = "trace", skip(self, discovered))]
    fn remap(
        &self,
        discovered: &[(String, Rc<Accessor>)],
        inherited: &[&str],
    ) -> Result<HashMap<String, Rc<Accessor>>, ConfigurationError> {
        let mut remap = Remap {
            model: &self.name,
            discovered,
            shadowed: self
                .namespace
                .iter()
                .filter(|(_, attribute)| !matches!(attribute, Attribute::Child(_)))
                .map(|(name, _)| name.as_str())
                .collect(),
            base: &self.base,
            done: HashMap::new(),
            visiting: HashSet::new(),
        };
        let own = discovered.iter().map(|(name, _)| name.as_str());
        for name in own.chain(inherited.iter().copied()) {
            remap.accessor_for(name)?;
        }
        Ok(remap.done)
    }

    /// Pass 3: assemble members, wrapping plain instance methods.
    #[instrument(level = "trace", skip(self, accessors))]
    fn wrap(&self, accessors: &HashMap<String, Rc<Accessor>>) -> Vec<(String, Member)> {
        self.namespace
            .iter()
            .filter_map(|(name, attribute)| {
                let member = match attribute {
                    Attribute::Child(_) => Member::Field(Rc::clone(accessors.get(name)?)),
                    Attribute::Method(body) if is_reserved(name) => Member::Method {
                        body: Rc::clone(body),
                        stitched: false,
                    },
                    Attribute::Method(body) => {
                        trace!(method = %name, "wrapping instance method");
                        Member::Method {
                            body: stitch_parent(Rc::clone(body)),
                            stitched: true,
                        }
                    }
                    Attribute::ClassMethod(body) => Member::ClassMethod(Rc::clone(body)),
                    Attribute::StaticMethod(body) => Member::StaticMethod(Rc::clone(body)),
                    Attribute::Property(getter) => Member::Property(Rc::clone(getter)),
                    Attribute::Data(value) => Member::Data(value.clone()),
                };
                Some((name.clone(), member))
            })
            .collect()
    }
}

/// Resolves final accessors depth-first so an override always composes with the
/// final accessor of the field it names, whatever the declaration order.
///
/// Inherited overrides go through the same resolution, so a field redeclared
/// here is also the parent its inherited dependents wire to.
struct Remap<'a> {
    model: &'a str,
    discovered: &'a [(String, Rc<Accessor>)],
    /// Own attributes that are not children
    shadowed: HashSet<&'a str>,
    base: &'a ModelType,
    done: HashMap<String, Rc<Accessor>>,
    visiting: HashSet<String>,
}

impl Remap<'_> {
    fn accessor_for(&mut self, field: &str) -> Result<Rc<Accessor>, ConfigurationError> {
        if let Some(done) = self.done.get(field) {
            return Ok(Rc::clone(done));
        }
        let discovered = self.discovered;
        let accessor = match discovered.iter().find(|(name, _)| name == field) {
            Some((_, direct)) => self.own_accessor(field, direct)?,
            None => self.inherited_accessor(field)?,
        };

        self.done.insert(field.to_string(), Rc::clone(&accessor));
        Ok(accessor)
    }

    fn own_accessor(
        &mut self,
        field: &str,
        direct: &Rc<Accessor>,
    ) -> Result<Rc<Accessor>, ConfigurationError> {
        let template = direct.template().clone();
        let Some(parent) = template.parent().map(str::to_string) else {
            return Ok(Rc::clone(direct));
        };
        if !self.is_known(&parent) {
            return Err(ConfigurationError::UnknownParent {
                model: self.model.to_string(),
                field: field.to_string(),
                parent,
            });
        }
        let via = self.parent_accessor(field, &parent)?;
        trace!(%field, %parent, "remapped onto explicit parent");
        Ok(Rc::new(Accessor::via(field, template, via)))
    }

    fn inherited_accessor(&mut self, field: &str) -> Result<Rc<Accessor>, ConfigurationError> {
        let inherited = self.base.accessor(field).cloned().ok_or_else(|| {
            ConfigurationError::UnknownParent {
                model: self.model.to_string(),
                field: field.to_string(),
                parent: field.to_string(),
            }
        })?;
        let base_via = match inherited.source() {
            Source::Owner => return Ok(inherited),
            Source::Via(via) => Rc::clone(via),
        };

        let via = self.parent_accessor(field, base_via.field())?;
        if Rc::ptr_eq(&via, &base_via) {
            return Ok(inherited);
        }
        trace!(%field, parent = %base_via.field(), "recomposed inherited override");
        Ok(Rc::new(Accessor::via(field, inherited.template().clone(), via)))
    }

    /// Final accessor of `parent`, the explicit parent named by `field`.
    fn parent_accessor(
        &mut self,
        field: &str,
        parent: &str,
    ) -> Result<Rc<Accessor>, ConfigurationError> {
        if self.shadowed.contains(parent) {
            return Err(ConfigurationError::ShadowedParent {
                model: self.model.to_string(),
                field: field.to_string(),
                parent: parent.to_string(),
            });
        }
        if !self.visiting.insert(field.to_string()) {
            return Err(ConfigurationError::CyclicParent {
                model: self.model.to_string(),
                field: field.to_string(),
            });
        }
        let via = self.accessor_for(parent)?;
        self.visiting.remove(field);
        Ok(via)
    }

    fn is_known(&self, field: &str) -> bool {
        self.discovered.iter().any(|(name, _)| name == field)
            || self.base.accessor(field).is_some()
    }
}
