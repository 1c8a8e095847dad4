//! Declaration files: model types described in TOML.
//!
//! ```toml
//! [[model]]
//! name = "SubModel"
//!
//! [[model.child]]
//! field = "leaf"
//! label = "Leaf"
//!
//! [[model]]
//! name = "Model"
//! module = "pages"
//! data = { class_data = "some class data" }
//!
//! [[model.child]]
//! field = "_hidden"
//! label = "Hidden"
//!
//! [[model.child]]
//! field = "sub"
//! type = "SubModel"
//! label = "TestSubModel"
//! parent = "_hidden"
//! ```
//!
//! Types may only reference the built-in `Entity` or models declared earlier in
//! the file. Methods cannot be declared here.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{Child, ModelType, ModelTypeBuilder, TypeRegistry, Value, ENTITY};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationFile {
    #[serde(default, rename = "model")]
    pub models: Vec<ModelDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDecl {
    pub name: String,
    pub module: Option<String>,
    pub qualname: Option<String>,
    /// Base type, `Entity` when omitted
    pub extends: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, toml::Value>,
    #[serde(default, rename = "child")]
    pub children: Vec<ChildDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChildDecl {
    pub field: String,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub model: Option<String>,
    /// Field name of another child acting as explicit parent
    pub parent: Option<String>,
}

/// Read and build all model types declared in `path`.
#[instrument(level = "debug", skip(settings))]
pub fn load_declarations(path: &Path, settings: &Settings) -> ApplicationResult<TypeRegistry> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ApplicationError::io(format!("read {}", path.display()), e))?;
    parse_declarations(&content, path, settings)
}

/// Build all model types declared in `content`; `source` is used in errors only.
pub fn parse_declarations(
    content: &str,
    source: &Path,
    settings: &Settings,
) -> ApplicationResult<TypeRegistry> {
    let file: DeclarationFile = toml::from_str(content).map_err(|e| decl_err(source, e))?;

    let mut registry = TypeRegistry::new();
    for decl in &file.models {
        let model = build_model(decl, &registry, source, settings)?;
        debug!(model = %model.name(), fields = model.fields().len(), "declared");
        registry.register(model)?;
    }
    Ok(registry)
}

fn build_model(
    decl: &ModelDecl,
    registry: &TypeRegistry,
    source: &Path,
    settings: &Settings,
) -> ApplicationResult<Rc<ModelType>> {
    let lookup = |name: &str| {
        registry.get(name).ok_or_else(|| {
            decl_err(
                source,
                format!("{}: unknown type '{}' (declare it before use)", decl.name, name),
            )
        })
    };

    let base = lookup(decl.extends.as_deref().unwrap_or(ENTITY))?;
    let mut builder = ModelTypeBuilder::new(&decl.name)
        .extends(base)
        .module(decl.module.as_deref().unwrap_or(&settings.default_module));
    if let Some(qualname) = &decl.qualname {
        builder = builder.qualname(qualname);
    }

    for (key, value) in &decl.data {
        let value = data_value(value).ok_or_else(|| {
            decl_err(
                source,
                format!(
                    "{}.{}: only strings, integers and booleans are supported",
                    decl.name, key
                ),
            )
        })?;
        builder = builder.data(key, value);
    }

    for child in &decl.children {
        let model = lookup(child.model.as_deref().unwrap_or(ENTITY))?;
        let mut template = match &child.label {
            Some(label) => Child::new(model, label),
            None => Child::unlabelled(model),
        };
        if let Some(parent) = &child.parent {
            template = template.with_parent(parent);
        }
        builder = builder.child(&child.field, template);
    }

    Ok(builder.build()?)
}

fn data_value(value: &toml::Value) -> Option<Value> {
    match value {
        toml::Value::String(s) => Some(Value::Text(s.clone())),
        toml::Value::Integer(i) => Some(Value::Int(*i)),
        toml::Value::Boolean(b) => Some(Value::Bool(*b)),
        _ => None,
    }
}

fn decl_err(source: &Path, message: impl ToString) -> ApplicationError {
    ApplicationError::Declaration {
        path: source.to_path_buf(),
        message: message.to_string(),
    }
}
