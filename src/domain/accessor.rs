//! Parent-assigning field accessors.
//!
//! Every declared child gets one accessor. Reading the field through an owning
//! instance resolves the accessor: it assigns the child's parent and returns the
//! child. A direct accessor parents the child to the owner. A via-parent
//! accessor first resolves the accessor of the referenced sibling and parents
//! the child to whatever that yields, so override chains of any depth resolve
//! as a cascade of accessor calls.

use std::fmt;
use std::rc::Rc;

use tracing::{instrument, trace};

use crate::domain::error::DomainResult;
use crate::domain::hierarchy::{Hierarchy, NodeId};
use crate::domain::model::Child;

/// Where a field's parent comes from.
pub enum Source {
    /// The owning instance
    Owner,
    /// The resolved value of another field's accessor
    Via(Rc<Accessor>),
}

pub struct Accessor {
    field: String,
    template: Child,
    source: Source,
}

impl Accessor {
    pub fn direct(field: impl Into<String>, template: Child) -> Self {
        Self {
            field: field.into(),
            template,
            source: Source::Owner,
        }
    }

    pub fn via(field: impl Into<String>, template: Child, parent: Rc<Accessor>) -> Self {
        Self {
            field: field.into(),
            template,
            source: Source::Via(parent),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn template(&self) -> &Child {
        &self.template
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Number of explicit-parent hops between this field and the owner.
    pub fn override_depth(&self) -> usize {
        match &self.source {
            Source::Owner => 0,
            Source::Via(parent) => 1 + parent.override_depth(),
        }
    }

    /// Assigns the field's parent on `owner` and returns the field's node.
    ///
    /// Idempotent: resolving again re-assigns the same parent.
    #[instrument(level = "trace", skip(self, hierarchy), fields(field = %self.field))]
    pub fn resolve(&self, hierarchy: &mut Hierarchy, owner: NodeId) -> DomainResult<NodeId> {
        let parent = match &self.source {
            Source::Owner => owner,
            Source::Via(via) => via.resolve(hierarchy, owner)?,
        };
        let node = hierarchy.slot(owner, &self.field)?;
        trace!(%node, %parent, "assigning parent");
        hierarchy.set_parent(node, Some(parent))?;
        Ok(node)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Accessor");
        s.field("field", &self.field);
        match &self.source {
            Source::Owner => s.field("parent", &"<owner>"),
            Source::Via(parent) => s.field("parent", &parent.field),
        };
        s.finish()
    }
}
