//! Domain layer: model types, the construction passes and the node hierarchy
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod accessor;
pub mod builder;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod registry;
pub mod tree_view;

pub use accessor::{Accessor, Source};
pub use builder::ModelTypeBuilder;
pub use error::{ConfigurationError, DomainError, DomainResult};
pub use hierarchy::{ChainDisplay, Formatting, Hierarchy, Node, NodeId};
pub use model::{
    is_reserved, stitch_parent, Attribute, Child, InitArgs, Member, ModelType, Value,
    DEFAULT_MODULE, ENTITY,
};
pub use registry::TypeRegistry;
pub use tree_view::TreeNodeConvert;
